// SPDX-License-Identifier: Apache-2.0

//! AMD part number → published logical thread count.
//!
//! Same role and coverage caveat as [`crate::data::intel_threads`], keyed
//! by the Ryzen/EPYC model numbers [`crate::cpu::model::classify`]
//! extracts.
pub static AMD_THREAD_COUNTS: phf::Map<&'static str, u8> = phf::phf_map! {
    "1600" => 12,
    "1700X" => 16,
    "2700X" => 16,
    "3600" => 12,
    "3700X" => 16,
    "3900X" => 24,
    "5600X" => 12,
    "5800X" => 16,
    "5900X" => 24,
    "5950X" => 32,
    "7700X" => 16,
    "7950X" => 32,
    "7402" => 48,
    "7542" => 64,
    "7763" => 128,
    "9554" => 128,
};

/// Looks up the published thread count for an AMD part number, or `None` if
/// the model is outside this table's coverage.
#[must_use]
pub fn expected_threads(model_number: &str) -> Option<u8> {
    AMD_THREAD_COUNTS.get(model_number).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_part_resolves() {
        assert_eq!(expected_threads("5950X"), Some(32));
    }

    #[test]
    fn unknown_part_is_none() {
        assert_eq!(expected_threads("0000Z"), None);
    }
}
