// SPDX-License-Identifier: Apache-2.0

//! The aggregator: runs the probe registry, merges correlated signals, and
//! turns the result into the four public queries.

use std::collections::HashMap;

use log::{debug, trace};

use crate::brand::{BrandId, Scoreboard};
use crate::cache::Cache;
use crate::error::{CustomProbeError, OptionsError};
use crate::options::Options;
use crate::platform::cpuid::{CpuidSource, HostCpuidSource};
use crate::probe::{builtin_registry, default_weight, Probe, ProbeContext, ProbeId};

const DEFAULT_THRESHOLD: u32 = 150;
const HIGH_THRESHOLD: u32 = 300;

type CustomThunk = Box<dyn Fn() -> bool + Send + Sync + std::panic::RefUnwindSafe>;

struct CustomProbe {
    weight: u8,
    thunk: CustomThunk,
}

/// Result of a full [`Engine::run_all`] pass: the raw score, which
/// technique ids fired, and the finalized brand candidates.
#[derive(Debug, Clone)]
struct RunResult {
    score: u32,
    detected: Vec<ProbeId>,
    candidates: Vec<(BrandId, u32)>,
}

/// Owns the probe registry, the memoization cache, and per-probe weight
/// overrides for one logical caller. Not `Sync`; callers wanting concurrent
/// independent queries should each own an `Engine`.
pub struct Engine {
    cpuid: Box<dyn CpuidSource>,
    probes: Vec<Probe>,
    custom: Vec<CustomProbe>,
    cache: Cache,
    weight_overrides: HashMap<ProbeId, u8>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpuid: Box::new(HostCpuidSource),
            probes: builtin_registry(),
            custom: Vec::new(),
            cache: Cache::new(),
            weight_overrides: HashMap::new(),
        }
    }

    /// Test-only constructor that swaps the real CPUID primitive for a
    /// synthetic one, so host-observation scenarios are reproducible
    /// without real virtualized hardware.
    #[must_use]
    pub fn with_cpuid_source(cpuid: Box<dyn CpuidSource>) -> Self {
        Self {
            cpuid,
            probes: builtin_registry(),
            custom: Vec::new(),
            cache: Cache::new(),
            weight_overrides: HashMap::new(),
        }
    }

    fn effective_weight(&self, id: ProbeId) -> u8 {
        self.weight_overrides.get(&id).copied().unwrap_or_else(|| default_weight(id))
    }

    fn threshold(settings: &crate::options::Settings) -> u32 {
        if settings.high_threshold {
            HIGH_THRESHOLD
        } else {
            DEFAULT_THRESHOLD
        }
    }

    /// Single-probe query. Honors memoization unless `memo_override` is
    /// `Some(false)`, which forces a fresh invocation regardless of the
    /// engine's cached value (but still stores the fresh result).
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::SettingsFlagNotAllowed`] or
    /// [`OptionsError::AggregateFlagNotAllowed`] if `id` does not name a
    /// concrete technique.
    pub fn check(&mut self, id: ProbeId, memo_override: Option<bool>) -> Result<bool, OptionsError> {
        if id.is_setting() {
            return Err(OptionsError::SettingsFlagNotAllowed(id));
        }
        if id.is_aggregate() {
            return Err(OptionsError::AggregateFlagNotAllowed(id));
        }
        let use_memo = memo_override.unwrap_or(true);
        if use_memo {
            if let Some(cached) = self.cache.probe_result(id) {
                trace!("check({id:?}) served from cache");
                return Ok(cached);
            }
        }
        let ctx = ProbeContext::gather(self.cpuid.as_ref());
        let result = self
            .probes
            .iter()
            .find(|p| p.id == id)
            .map(|p| {
                let mut board = Scoreboard::new();
                (p.thunk)(&ctx, &mut board)
            })
            .unwrap_or(false);
        if use_memo {
            self.cache.store_probe_result(id, result);
        }
        Ok(result)
    }

    /// Registers a user-supplied probe, appended after the built-in
    /// registry and run every time [`Engine::run_all`] executes.
    ///
    /// # Errors
    ///
    /// Returns [`CustomProbeError::WeightTooLarge`] if `weight` exceeds 100.
    pub fn add_custom(
        &mut self,
        weight: u8,
        thunk: Box<dyn Fn() -> bool + Send + Sync + std::panic::RefUnwindSafe>,
    ) -> Result<(), CustomProbeError> {
        if weight > 100 {
            return Err(CustomProbeError::WeightTooLarge(weight));
        }
        self.custom.push(CustomProbe { weight, thunk });
        Ok(())
    }

    /// Adjusts a built-in probe's weight for every subsequent query.
    /// Invalidates the probe's cached outcome and every downstream
    /// aggregate, since a cached score computed under the old weight is no
    /// longer valid.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::SettingsFlagNotAllowed`] or
    /// [`OptionsError::AggregateFlagNotAllowed`] if `id` does not name a
    /// concrete technique.
    pub fn modify_score(&mut self, id: ProbeId, new_weight: u8) -> Result<(), OptionsError> {
        if id.is_setting() {
            return Err(OptionsError::SettingsFlagNotAllowed(id));
        }
        if id.is_aggregate() {
            return Err(OptionsError::AggregateFlagNotAllowed(id));
        }
        self.weight_overrides.insert(id, new_weight);
        self.cache.invalidate(id);
        Ok(())
    }

    fn run_all(&mut self, options: &Options) -> RunResult {
        if options.settings.no_memo {
            self.cache.clear();
        }
        let ctx = ProbeContext::gather(self.cpuid.as_ref());
        let mut board = Scoreboard::new();
        let mut score: u32 = 0;
        let mut detected = Vec::new();
        let threshold = Self::threshold(&options.settings);
        let use_memo = !options.settings.no_memo;

        let gpu_ids = [ProbeId::GpuVmStrings, ProbeId::GpuCapabilities];

        for probe in &self.probes {
            if !options.enabled.is_set(probe.id) {
                continue;
            }
            if gpu_ids.contains(&probe.id) {
                continue;
            }
            let fired = if use_memo {
                if let Some(cached) = self.cache.probe_result(probe.id) {
                    cached
                } else {
                    let result = (probe.thunk)(&ctx, &mut board);
                    self.cache.store_probe_result(probe.id, result);
                    result
                }
            } else {
                (probe.thunk)(&ctx, &mut board)
            };
            if fired {
                score += u32::from(self.effective_weight(probe.id));
                detected.push(probe.id);
            }
            if options.settings.shortcut && score >= threshold {
                debug!("run_all short-circuiting at {score} points");
                break;
            }
        }

        // GPU merge step: two correlated 100-weight probes that must never
        // contribute more than 100 combined, and whose per-brand votes are
        // already deduplicated by the "gpu" vote group inside each thunk.
        if options.enabled.is_set(ProbeId::GpuVmStrings) || options.enabled.is_set(ProbeId::GpuCapabilities) {
            let strings_fired = options.enabled.is_set(ProbeId::GpuVmStrings)
                && Self::run_memoized(&mut self.cache, use_memo, ProbeId::GpuVmStrings, &self.probes, &ctx, &mut board);
            let caps_fired = options.enabled.is_set(ProbeId::GpuCapabilities)
                && Self::run_memoized(&mut self.cache, use_memo, ProbeId::GpuCapabilities, &self.probes, &ctx, &mut board);
            let contribution = match (strings_fired, caps_fired) {
                (true, true) => 100,
                (true, false) => u32::from(self.effective_weight(ProbeId::GpuVmStrings)),
                (false, true) => u32::from(self.effective_weight(ProbeId::GpuCapabilities)),
                (false, false) => 0,
            };
            score += contribution;
            if strings_fired {
                detected.push(ProbeId::GpuVmStrings);
            }
            if caps_fired {
                detected.push(ProbeId::GpuCapabilities);
            }
        }

        for custom in &self.custom {
            let fired = std::panic::catch_unwind(|| (custom.thunk)()).unwrap_or(false);
            if fired {
                score += u32::from(custom.weight);
            }
        }

        let candidates = Self::finalize_brand(&board, score);
        // A shortcut run's score/brand reflect only a prefix of the probe
        // registry, so they must never be cached where a later full run
        // (shortcut off) would read them back as if they were complete.
        if !options.settings.shortcut {
            self.cache.store_score(score);
            self.cache
                .store_brand(candidates.iter().map(|(b, _)| *b).collect());
        }
        RunResult { score, detected, candidates }
    }

    fn run_memoized(
        cache: &mut Cache,
        use_memo: bool,
        id: ProbeId,
        probes: &[Probe],
        ctx: &ProbeContext<'_>,
        board: &mut Scoreboard,
    ) -> bool {
        if use_memo {
            if let Some(cached) = cache.probe_result(id) {
                return cached;
            }
        }
        let result = probes
            .iter()
            .find(|p| p.id == id)
            .map(|p| (p.thunk)(ctx, board))
            .unwrap_or(false);
        if use_memo {
            cache.store_probe_result(id, result);
        }
        result
    }

    /// Applies the brand merge/drop rules to the raw scoreboard and returns
    /// sorted `(brand, points)` candidates, highest first. When `multiple`
    /// is false only the single winner (or none) need be consulted by the
    /// caller, but every candidate is still returned so `detected_enums`-
    /// adjacent introspection stays possible.
    fn finalize_brand(board: &Scoreboard, score: u32) -> Vec<(BrandId, u32)> {
        let mut candidates: Vec<(BrandId, u32)> = crate::brand::ALL_BRANDS
            .iter()
            .map(|&b| (b, board.points_for(b)))
            .filter(|&(_, points)| points >= 1)
            .collect();

        // HYPERV_ARTIFACT is a marker for "enlightenment signature present
        // but not a real guest", never a competing product name: it is
        // dropped whenever it ties with another candidate, and also once the
        // overall score (the same accumulator detect()/percentage() read)
        // goes positive, since a positive verdict reached through other
        // evidence cannot coexist with "not actually a VM". The probes that
        // vote it never report `true` to the aggregator themselves (see
        // cpuid_probes.rs), so only some other probe's independent evidence
        // can make that happen.
        if candidates.len() > 1 || score > 0 {
            candidates.retain(|&(b, _)| b != BrandId::HyperVArtifact);
        }

        // Hyper-V strictly outscoring Virtual PC means the enlightenment
        // signature is genuine Hyper-V, not legacy Virtual PC's compatible
        // subset; drop the weaker candidate. A tie is left to the generic
        // leader/MULTIPLE mechanism below rather than synthesized into a
        // combined brand id (no such id exists in this crate — see
        // DESIGN.md on the brand-merge table's scope).
        let hyperv_points = candidates.iter().find(|&&(b, _)| b == BrandId::HyperV).map(|&(_, p)| p);
        let vpc_points = candidates.iter().find(|&&(b, _)| b == BrandId::MicrosoftVirtualPc).map(|&(_, p)| p);
        if let (Some(hv), Some(vpc)) = (hyperv_points, vpc_points) {
            if hv > vpc {
                candidates.retain(|&(b, _)| b != BrandId::MicrosoftVirtualPc);
            }
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates
    }

    /// Runs (or reuses the memoized) full query and returns the raw score.
    fn score(&mut self, options: &Options) -> u32 {
        if !options.settings.no_memo {
            if let Some(score) = self.cache.score() {
                return score;
            }
        }
        self.run_all(options).score
    }

    /// Copies `options` with `shortcut` forced to `value`, overriding
    /// whatever the caller set. Each public query below decides `shortcut`
    /// for itself rather than trusting it from the caller: `detect` is the
    /// only one that can safely stop early, since a partial score that has
    /// already crossed the threshold can only grow, never shrink, once the
    /// remaining probes run.
    fn with_shortcut(options: &Options, value: bool) -> Options {
        let mut options = *options;
        options.settings.shortcut = value;
        options
    }

    #[must_use]
    pub fn detect(&mut self, options: &Options) -> bool {
        let options = Self::with_shortcut(options, true);
        self.score(&options) >= Self::threshold(&options.settings)
    }

    #[must_use]
    pub fn percentage(&mut self, options: &Options) -> u8 {
        let options = &Self::with_shortcut(options, false);
        let score = self.score(options);
        let threshold = Self::threshold(&options.settings);
        if options.settings.dynamic {
            if score >= threshold {
                100
            } else if score >= 100 {
                99
            } else {
                u8::try_from(score.min(99)).unwrap_or(99)
            }
        } else if score >= threshold {
            100
        } else {
            0
        }
    }

    #[must_use]
    pub fn brand(&mut self, options: &Options) -> String {
        let options = &Self::with_shortcut(options, false);
        let run = self.run_all(options);
        if run.candidates.is_empty() {
            return BrandId::Unknown.display_name().to_string();
        }
        if options.settings.multiple {
            let top = run.candidates[0].1;
            run.candidates
                .iter()
                .filter(|&&(_, points)| points == top)
                .map(|&(b, _)| b.display_name())
                .collect::<Vec<_>>()
                .join(" or ")
        } else {
            run.candidates[0].0.display_name().to_string()
        }
    }

    #[must_use]
    pub fn type_of(&mut self, options: &Options) -> String {
        let brand = self.brand(options);
        if brand.contains(" or ") {
            return "Unknown".to_string();
        }
        let Some(&id) = crate::brand::ALL_BRANDS.iter().find(|b| b.display_name() == brand) else {
            return "Unknown".to_string();
        };
        category_label(id).to_string()
    }

    #[must_use]
    pub fn conclusion(&mut self, options: &Options) -> String {
        let brand = self.brand(options);
        let percentage = self.percentage(options);
        if !options.settings.dynamic {
            return if percentage >= 100 {
                format!("Running inside a{} {brand} VM", article_suffix(&brand))
            } else {
                "Running on baremetal".to_string()
            };
        }
        if percentage == 0 {
            return "Running on baremetal".to_string();
        }
        let article = if starts_with_vowel_sound(&brand) { "an" } else { "a" };
        match percentage {
            1..=24 => "Very unlikely a VM".to_string(),
            25..=49 => "Unlikely a VM".to_string(),
            50..=64 => format!("Potentially {article} {brand} VM"),
            65..=79 => format!("Might be {article} {brand} VM"),
            80..=94 => format!("Likely {article} {brand} VM"),
            95..=99 => format!("Very likely {article} {brand} VM"),
            _ => format!("Running inside {article} {brand} VM"),
        }
    }

    #[must_use]
    pub fn detected_enums(&mut self, options: &Options) -> Vec<ProbeId> {
        let options = &Self::with_shortcut(options, false);
        self.run_all(options).detected
    }

    #[must_use]
    pub fn detected_count(&mut self, options: &Options) -> u8 {
        u8::try_from(self.detected_enums(options).len().min(255)).unwrap_or(255)
    }
}

fn article_suffix(brand: &str) -> &'static str {
    if starts_with_vowel_sound(brand) {
        "n"
    } else {
        ""
    }
}

fn starts_with_vowel_sound(word: &str) -> bool {
    matches!(
        word.chars().next().map(|c| c.to_ascii_lowercase()),
        Some('a' | 'e' | 'i' | 'o' | 'u')
    )
}

fn category_label(id: BrandId) -> &'static str {
    match id.category() {
        "VM" => match id {
            BrandId::Xen | BrandId::Jailhouse | BrandId::Acrn | BrandId::IntelKgt => "Partitioning Hypervisor",
            BrandId::Bochs => "Emulator",
            BrandId::HyperPlatform => "Hypervisor (research)",
            _ => "Hypervisor (type 2)",
        },
        "Hypervisor" => "Hypervisor (unknown type)",
        "Container" => "Container",
        "Emulator" => "Emulator",
        "Sandbox" => "Sandbox",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::cpuid::{FixedCpuidSource, Leaves};

    fn vmware_engine() -> Engine {
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

    fn bare_metal_engine() -> Engine {
        Engine::with_cpuid_source(Box::new(FixedCpuidSource::unsupported()))
    }

    #[test]
    fn bare_metal_has_zero_score_and_no_detection() {
        let mut engine = bare_metal_engine();
        let options = Options::default();
        assert_eq!(engine.percentage(&options), 0);
        assert!(!engine.detect(&options));
        assert_eq!(engine.brand(&options), "Unknown");
    }

    #[test]
    fn vmware_signature_crosses_default_threshold() {
        let mut engine = vmware_engine();
        let options = Options::default();
        assert!(engine.detect(&options));
        assert_eq!(engine.brand(&options), "VMware");
        assert_eq!(engine.percentage(&options), 100);
    }

    #[test]
    fn detect_matches_raw_score_against_threshold() {
        // percentage() is clamped to 0..=100 while the threshold can be
        // 150/300, so the invariant is checked against the internal score
        // register rather than the percentage projection.
        let mut engine = vmware_engine();
        let options = Options::default();
        let score = engine.score(&options);
        assert_eq!(engine.detect(&options), score >= DEFAULT_THRESHOLD);
    }

    #[test]
    fn high_threshold_can_suppress_detection_on_thin_evidence() {
        let mut engine = vmware_engine();
        let options = Options::builder().high_threshold(true).build();
        let percentage = engine.percentage(&options);
        assert_eq!(engine.detect(&options), percentage >= 100);
    }

    #[test]
    fn modify_score_to_zero_never_increases_total() {
        let mut baseline_engine = vmware_engine();
        let baseline = baseline_engine.percentage(&Options::default());

        let mut modified_engine = vmware_engine();
        modified_engine.modify_score(ProbeId::Vmid, 0).unwrap();
        modified_engine.modify_score(ProbeId::HypervisorBit, 0).unwrap();
        modified_engine.modify_score(ProbeId::HypervisorStr, 0).unwrap();
        modified_engine.modify_score(ProbeId::CpuidSignature, 0).unwrap();
        let modified = modified_engine.percentage(&Options::default());

        assert!(modified <= baseline);
    }

    #[test]
    fn check_rejects_settings_and_aggregate_flags() {
        let mut engine = bare_metal_engine();
        assert!(matches!(
            engine.check(ProbeId::NoMemo, None),
            Err(OptionsError::SettingsFlagNotAllowed(ProbeId::NoMemo))
        ));
        assert!(matches!(
            engine.check(ProbeId::All, None),
            Err(OptionsError::AggregateFlagNotAllowed(ProbeId::All))
        ));
    }

    #[test]
    fn add_custom_rejects_oversized_weight() {
        let mut engine = bare_metal_engine();
        let err = engine.add_custom(101, Box::new(|| true)).unwrap_err();
        assert_eq!(err, CustomProbeError::WeightTooLarge(101));
    }

    #[test]
    fn add_custom_contributes_to_score() {
        let mut engine = bare_metal_engine();
        engine.add_custom(80, Box::new(|| true)).unwrap();
        assert!(engine.percentage(&Options::builder().dynamic(true).build()) > 0);
    }

    #[test]
    fn custom_probe_panic_is_treated_as_false() {
        let mut engine = bare_metal_engine();
        engine.add_custom(90, Box::new(|| panic!("boom"))).unwrap();
        let options = Options::builder().dynamic(true).build();
        assert_eq!(engine.percentage(&options), 0);
    }

    #[test]
    fn brand_never_contains_or_without_multiple() {
        let mut engine = vmware_engine();
        let brand = engine.brand(&Options::default());
        assert!(!brand.contains(" or "));
    }

    #[test]
    fn gpu_merge_never_double_counts() {
        // GPU probes are Windows-only in this crate (no DXGI/EnumDisplayDevices
        // access off Windows), so on this host neither fires; the merge
        // arithmetic itself is exercised directly instead.
        let mut board = Scoreboard::new();
        assert!(board.vote_once_per_group("gpu", BrandId::Vmware, 100));
        assert!(!board.vote_once_per_group("gpu", BrandId::Vmware, 100));
        assert_eq!(board.points_for(BrandId::Vmware), 100);
    }

    #[test]
    fn repeated_query_does_not_rerun_probes_with_memoization() {
        let mut engine = vmware_engine();
        let options = Options::default();
        let first = engine.percentage(&options);
        let second = engine.percentage(&options);
        assert_eq!(first, second);
        assert!(engine.cache.probe_result(ProbeId::Vmid).is_some());
    }

    #[test]
    fn conclusion_reports_baremetal_when_nothing_fires() {
        let mut engine = bare_metal_engine();
        let options = Options::builder().dynamic(true).build();
        assert_eq!(engine.conclusion(&options), "Running on baremetal");
    }

    #[test]
    fn conclusion_selects_an_article_for_vowel_brands() {
        assert!(starts_with_vowel_sound("Acrn"));
        assert!(!starts_with_vowel_sound("VMware"));
    }
}
