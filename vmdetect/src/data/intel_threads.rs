// SPDX-License-Identifier: Apache-2.0

//! Intel part number → published logical thread count.
//!
//! A representative subset of Intel's ARK specification database, keyed by
//! the model number [`crate::cpu::model::classify`] extracts (e.g.
//! `"9700K"`, `"E5-2690"`). A real deployment would transcribe the full
//! multi-thousand-entry ARK export; this table covers the generations most
//! likely to appear in a VM host/guest comparison and is extended the same
//! way (model number → thread count) when a gap is found.
pub static INTEL_THREAD_COUNTS: phf::Map<&'static str, u8> = phf::phf_map! {
    // Core i3/i5/i7/i9, 8th-13th gen
    "8100" => 4,
    "8350K" => 4,
    "9700K" => 8,
    "9900K" => 16,
    "10400" => 12,
    "10700K" => 16,
    "10900K" => 20,
    "11700K" => 16,
    "12700K" => 20,
    "12900K" => 24,
    "13700K" => 24,
    "13900K" => 32,
    // Xeon Scalable / E5 v3-v4
    "E5-2690" => 28,
    "E5-2680" => 28,
    "E5-2699" => 44,
    "E5-2620" => 12,
    "6130" => 32,
    "6230" => 40,
    "8280" => 56,
    "W-2295" => 36,
};

/// Looks up the published thread count for an Intel part number, or `None`
/// if the model is outside this table's coverage (treated as "no mismatch
/// signal available", not as a VM indicator either way).
#[must_use]
pub fn expected_threads(model_number: &str) -> Option<u8> {
    INTEL_THREAD_COUNTS.get(model_number).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_part_resolves() {
        assert_eq!(expected_threads("9900K"), Some(16));
    }

    #[test]
    fn unknown_part_is_none() {
        assert_eq!(expected_threads("0000Z"), None);
    }
}
