// SPDX-License-Identifier: Apache-2.0

//! CPU brand-string classification: recognizes Intel Core/Xeon and AMD
//! Ryzen/EPYC model numbers well enough to cross-check the advertised
//! thread count against the part's known specification (see
//! [`crate::data::intel_threads`], [`crate::data::amd_threads`]).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INTEL_CORE: Regex =
        Regex::new(r"(?i)\bi([3579])-(\d{4,5})([A-Z]{0,3})\b").expect("static pattern is valid");
    static ref INTEL_XEON: Regex =
        Regex::new(r"(?i)\bXeon\(R\)\s+(?:CPU\s+)?([EWD]?-?\d{4,5}[A-Z]{0,3})\b")
            .expect("static pattern is valid");
    static ref AMD_RYZEN: Regex =
        Regex::new(r"(?i)\bRyzen\s+(?:\d\s+)?(\d{4})([A-Z]{0,2})\b").expect("static pattern is valid");
    static ref AMD_EPYC: Regex = Regex::new(r"(?i)\bEPYC\s+(\d{4})([A-Z]{0,2})\b").expect("static pattern is valid");
}

/// The vendor family a brand string was classified into, with the part
/// number extracted for a thread-count database lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuModel {
    IntelCore { tier: u8, number: String },
    IntelXeon { number: String },
    AmdRyzen { number: String },
    AmdEpyc { number: String },
    Unrecognized,
}

/// Classifies a CPUID brand string (e.g. `"Intel(R) Core(TM) i7-9700K CPU @
/// 3.60GHz"`) into a [`CpuModel`]. Returns [`CpuModel::Unrecognized`] for
/// brand strings that don't match a known Intel/AMD consumer or server
/// naming scheme — including every non-Intel/AMD vendor, and blanked or
/// placeholder brand strings some hypervisors substitute.
#[must_use]
pub fn classify(brand: &str) -> CpuModel {
    if let Some(caps) = INTEL_CORE.captures(brand) {
        let tier = caps[1].parse().unwrap_or(0);
        return CpuModel::IntelCore {
            tier,
            number: format!("{}{}", &caps[2], &caps[3]),
        };
    }
    if let Some(caps) = INTEL_XEON.captures(brand) {
        return CpuModel::IntelXeon {
            number: caps[1].to_uppercase(),
        };
    }
    if let Some(caps) = AMD_RYZEN.captures(brand) {
        return CpuModel::AmdRyzen {
            number: format!("{}{}", &caps[1], &caps[2]),
        };
    }
    if let Some(caps) = AMD_EPYC.captures(brand) {
        return CpuModel::AmdEpyc {
            number: format!("{}{}", &caps[1], &caps[2]),
        };
    }
    CpuModel::Unrecognized
}

/// True if `brand` matches a known pre-2006 or Celeron/Atom low-end part,
/// which the thread-count mismatch probes exclude since those chips
/// predate or fall outside reliable per-model thread databases.
#[must_use]
pub fn is_ancient_or_excluded(brand: &str) -> bool {
    crate::data::ancient_cpus::ANCIENT_MARKERS
        .iter()
        .any(|marker| brand.to_lowercase().contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_intel_core_i7() {
        let model = classify("Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz");
        assert_eq!(
            model,
            CpuModel::IntelCore {
                tier: 7,
                number: "9700K".to_string()
            }
        );
    }

    #[test]
    fn classifies_intel_xeon() {
        let model = classify("Intel(R) Xeon(R) CPU E5-2690 v4 @ 2.60GHz");
        assert!(matches!(model, CpuModel::IntelXeon { .. }));
    }

    #[test]
    fn classifies_amd_ryzen() {
        let model = classify("AMD Ryzen 9 5950X 16-Core Processor");
        assert_eq!(
            model,
            CpuModel::AmdRyzen {
                number: "5950X".to_string()
            }
        );
    }

    #[test]
    fn unrecognized_for_generic_qemu_brand() {
        assert_eq!(classify("QEMU Virtual CPU version 2.5+"), CpuModel::Unrecognized);
    }

    #[test]
    fn ancient_marker_matches_celeron() {
        assert!(is_ancient_or_excluded("Intel(R) Celeron(R) CPU 440 @ 2.00GHz"));
    }
}
