//! Cross-cutting invariants that must hold for every query configuration,
//! exercised against synthetic CPUID tables rather than the real host.

use vmdetect::{BrandId, Engine, Options, ProbeId};
use vmdetect::platform::cpuid::{FixedCpuidSource, Leaves};

fn bare_metal() -> Engine {
    Engine::with_cpuid_source(Box::new(FixedCpuidSource::unsupported()))
}

fn vmware_guest() -> Engine {
    let source = FixedCpuidSource::new()
        .with_leaf(0x1, 0, Leaves { eax: 0, ebx: 0, ecx: 1 << 31, edx: 0 })
        .with_leaf(
            0x4000_0000,
            0,
            Leaves {
                eax: 0x4000_0000,
                ebx: u32::from_le_bytes(*b"VMwa"),
                ecx: u32::from_le_bytes(*b"reVM"),
                edx: u32::from_le_bytes(*b"ware"),
            },
        );
    Engine::with_cpuid_source(Box::new(source))
}

fn virtualbox_guest() -> Engine {
    let source = FixedCpuidSource::new()
        .with_leaf(0x1, 0, Leaves { eax: 0, ebx: 0, ecx: 1 << 31, edx: 0 })
        .with_leaf(
            0x4000_0000,
            0,
            Leaves {
                eax: 0x4000_0000,
                ebx: u32::from_le_bytes(*b"VBox"),
                ecx: u32::from_le_bytes(*b"VBox"),
                edx: u32::from_le_bytes(*b"VBox"),
            },
        );
    Engine::with_cpuid_source(Box::new(source))
}

// percentage() is clamped to 0..=100, so only the low/high fixed-points of
// the threshold comparison are checked here; the raw-score comparison lives
// in engine.rs's own unit tests, which can see the private score() method.
#[test]
fn percentage_is_always_in_range() {
    for mut engine in [bare_metal(), vmware_guest(), virtualbox_guest()] {
        for options in [
            Options::default(),
            Options::builder().dynamic(true).build(),
            Options::builder().high_threshold(true).build(),
        ] {
            let p = engine.percentage(&options);
            assert!(p <= 100);
        }
    }
}

#[test]
fn bare_metal_never_detects_regardless_of_settings() {
    for options in [
        Options::default(),
        Options::builder().dynamic(true).build(),
        Options::builder().multiple(true).build(),
        Options::builder().no_memo(true).build(),
    ] {
        let mut engine = bare_metal();
        assert!(!engine.detect(&options));
        assert_eq!(engine.brand(&options), "Unknown");
        assert_eq!(engine.percentage(&options), 0);
    }
}

#[test]
fn brand_string_never_contains_the_join_separator_unless_multiple_is_set() {
    let mut engine = vmware_guest();
    let brand = engine.brand(&Options::default());
    assert!(!brand.contains(" or "));
}

#[test]
fn high_threshold_never_detects_when_default_threshold_does_not() {
    // Raising the bar can only turn a positive into a negative, never the
    // reverse, for the same underlying evidence.
    for mut engine in [bare_metal(), vmware_guest(), virtualbox_guest()] {
        let default_detect = engine.detect(&Options::default());
        let high_detect = engine.detect(&Options::builder().high_threshold(true).build());
        if high_detect {
            assert!(default_detect);
        }
    }
}

#[test]
fn disabling_every_technique_that_contributes_suppresses_detection() {
    let mut engine = vmware_guest();
    let options = Options::builder()
        .with_none_enabled()
        .enable(ProbeId::Sgdt)
        .build();
    assert!(!engine.detect(&options));
    assert_eq!(engine.percentage(&options), 0);
}

#[test]
fn modify_score_is_visible_on_the_next_query() {
    let mut engine = vmware_guest();
    let before = engine.percentage(&Options::builder().dynamic(true).build());
    engine.modify_score(ProbeId::Vmid, 0).unwrap();
    engine.modify_score(ProbeId::HypervisorBit, 0).unwrap();
    engine.modify_score(ProbeId::HypervisorStr, 0).unwrap();
    engine.modify_score(ProbeId::CpuidSignature, 0).unwrap();
    let after = engine.percentage(&Options::builder().dynamic(true).build());
    assert!(after <= before);
}

#[test]
fn check_single_probe_agrees_with_full_run_for_that_probe() {
    let mut engine = vmware_guest();
    let solo = engine.check(ProbeId::HypervisorBit, None).unwrap();
    let detected = engine.detected_enums(&Options::default());
    assert_eq!(solo, detected.contains(&ProbeId::HypervisorBit));
}

#[test]
fn detected_count_matches_detected_enums_length() {
    let mut engine = vmware_guest();
    let options = Options::default();
    let enums = engine.detected_enums(&options);
    let count = engine.detected_count(&options);
    assert_eq!(usize::from(count), enums.len());
}

#[test]
fn virtualbox_and_vmware_signatures_never_cross_vote_brands() {
    let mut vbox = virtualbox_guest();
    let mut vmware = vmware_guest();
    assert_eq!(vbox.brand(&Options::default()), BrandId::VirtualBox.display_name());
    assert_eq!(vmware.brand(&Options::default()), BrandId::Vmware.display_name());
}

#[test]
fn conclusion_is_baremetal_phrase_exactly_when_percentage_is_zero() {
    for mut engine in [bare_metal(), vmware_guest()] {
        let options = Options::builder().dynamic(true).build();
        let percentage = engine.percentage(&options);
        let conclusion = engine.conclusion(&options);
        assert_eq!(conclusion == "Running on baremetal", percentage == 0);
    }
}

#[test]
fn add_custom_probe_never_decreases_the_score() {
    let mut with_custom = bare_metal();
    with_custom.add_custom(50, Box::new(|| true)).unwrap();
    let mut without_custom = bare_metal();
    let options = Options::builder().dynamic(true).build();
    assert!(with_custom.percentage(&options) >= without_custom.percentage(&options));
}
