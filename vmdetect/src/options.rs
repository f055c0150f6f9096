// SPDX-License-Identifier: Apache-2.0

//! The flag handler: [`EnabledSet`] and the [`Options`] builder that
//! replace a flat variadic-argument-list API with a Rust-idiomatic builder.

use crate::error::OptionsError;
use crate::probe::ProbeId;

/// Number of `u64` words backing [`EnabledSet`]. `ProbeId::TECHNIQUES` is
/// comfortably under 128 entries; this is sized with headroom for future
/// probes without reshaping the type.
const WORDS: usize = 2;

/// A fixed-size bitset over every [`ProbeId::is_technique`] id.
///
/// Indexing uses each id's `#[repr(u16)]` discriminant directly; settings
/// and aggregate flags are never set in an `EnabledSet` (callers only ever
/// reach this type through [`Options`], which resolves aggregates and
/// applies settings separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledSet {
    words: [u64; WORDS],
}

impl EnabledSet {
    /// An empty set: every technique disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self { words: [0; WORDS] }
    }

    /// The full set: every built-in technique enabled.
    #[must_use]
    pub fn all() -> Self {
        let mut set = Self::none();
        for &id in ProbeId::TECHNIQUES {
            set.set(id, true);
        }
        set
    }

    /// The default set: every built-in technique except the opt-in
    /// `VMWARE_DMESG` probe, which shells out to `dmesg` and can be slow or
    /// require elevated privileges.
    #[must_use]
    pub fn default_set() -> Self {
        let mut set = Self::all();
        set.set(ProbeId::Dmesg, false);
        set
    }

    fn word_and_bit(id: ProbeId) -> (usize, u32) {
        let index = id as u16 as usize;
        (index / 64, (index % 64) as u32)
    }

    /// Enables or disables a single technique. No-op for settings/aggregate
    /// ids (they are never members of this set).
    pub fn set(&mut self, id: ProbeId, enabled: bool) {
        if !id.is_technique() {
            return;
        }
        let (word, bit) = Self::word_and_bit(id);
        if enabled {
            self.words[word] |= 1 << bit;
        } else {
            self.words[word] &= !(1 << bit);
        }
    }

    #[must_use]
    pub fn is_set(&self, id: ProbeId) -> bool {
        if !id.is_technique() {
            return false;
        }
        let (word, bit) = Self::word_and_bit(id);
        self.words[word] & (1 << bit) != 0
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut words = [0u64; WORDS];
        for i in 0..WORDS {
            words[i] = self.words[i] | other.words[i];
        }
        Self { words }
    }

    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let mut words = [0u64; WORDS];
        for i in 0..WORDS {
            words[i] = self.words[i] & other.words[i];
        }
        Self { words }
    }

    /// Every technique id currently enabled, in [`ProbeId::TECHNIQUES`]
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = ProbeId> + '_ {
        ProbeId::TECHNIQUES.iter().copied().filter(|&id| self.is_set(id))
    }
}

impl Default for EnabledSet {
    fn default() -> Self {
        Self::default_set()
    }
}

/// Settings that change *how* a query runs rather than *which* probes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub no_memo: bool,
    pub high_threshold: bool,
    pub dynamic: bool,
    pub multiple: bool,
    /// Stop the probe loop as soon as the running score crosses the
    /// threshold instead of evaluating every enabled probe. `Engine::detect`
    /// forces this on (a partial score that already crossed the threshold
    /// can only go up); every other query forces it off, since they need
    /// every probe's vote to disambiguate a brand or report a complete
    /// `detected_enums`/`detected_count`.
    pub shortcut: bool,
}

/// The full configuration for one query: which techniques to run, and which
/// settings modify the run. Built from a flat [`ProbeId`] flag list via
/// [`Options::from_flags`], or assembled directly with
/// [`Options::builder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub enabled: EnabledSet,
    pub settings: Settings,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enabled: EnabledSet::default_set(),
            settings: Settings::default(),
        }
    }
}

impl Options {
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    /// Resolves a flat flag list into an [`Options`] value:
    /// `DEFAULT`/`ALL`/`NULL_ARG` expand the technique
    /// set, settings flags set their corresponding [`Settings`] field,
    /// individual technique ids are enabled one at a time, and a settings or
    /// aggregate flag used where a single technique is expected up the
    /// call stack is rejected by the caller before reaching here.
    ///
    /// # Errors
    ///
    /// Never actually fails today (every [`ProbeId`] variant is handled),
    /// but returns `Result` to match [`crate::options::disable`]'s contract
    /// and leave room for future validation without a breaking signature
    /// change.
    pub fn from_flags(flags: &[ProbeId]) -> Result<Self, OptionsError> {
        let mut builder = OptionsBuilder::new().with_none_enabled();
        for &flag in flags {
            match flag {
                ProbeId::Default => builder.enabled = EnabledSet::default_set(),
                ProbeId::All => builder.enabled = EnabledSet::all(),
                ProbeId::NullArg => {}
                ProbeId::NoMemo => builder.settings.no_memo = true,
                ProbeId::HighThreshold => builder.settings.high_threshold = true,
                ProbeId::Dynamic => builder.settings.dynamic = true,
                ProbeId::Multiple => builder.settings.multiple = true,
                technique => builder.enabled.set(technique, true),
            }
        }
        Ok(builder.build())
    }
}

/// Builder for [`Options`], defaulting to [`EnabledSet::default_set`] and no
/// settings enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionsBuilder {
    enabled: EnabledSet,
    settings: Settings,
}

impl OptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: EnabledSet::default_set(),
            settings: Settings::default(),
        }
    }

    /// Starts from an empty technique set instead of the default one.
    #[must_use]
    pub fn with_none_enabled(mut self) -> Self {
        self.enabled = EnabledSet::none();
        self
    }

    #[must_use]
    pub fn enable(mut self, id: ProbeId) -> Self {
        self.enabled.set(id, true);
        self
    }

    #[must_use]
    pub fn disable(mut self, id: ProbeId) -> Self {
        self.enabled.set(id, false);
        self
    }

    #[must_use]
    pub fn no_memo(mut self, value: bool) -> Self {
        self.settings.no_memo = value;
        self
    }

    #[must_use]
    pub fn high_threshold(mut self, value: bool) -> Self {
        self.settings.high_threshold = value;
        self
    }

    #[must_use]
    pub fn dynamic(mut self, value: bool) -> Self {
        self.settings.dynamic = value;
        self
    }

    #[must_use]
    pub fn multiple(mut self, value: bool) -> Self {
        self.settings.multiple = value;
        self
    }

    #[must_use]
    pub fn shortcut(mut self, value: bool) -> Self {
        self.settings.shortcut = value;
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        Options {
            enabled: self.enabled,
            settings: self.settings,
        }
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an [`EnabledSet`] containing every technique except those named
/// in `ids`, rejecting settings and aggregate flags since they have no
/// membership in the set.
///
/// # Errors
///
/// Returns [`OptionsError::SettingsFlagNotAllowed`] or
/// [`OptionsError::AggregateFlagNotAllowed`] if `ids` contains anything
/// other than a concrete technique.
pub fn disable(ids: &[ProbeId]) -> Result<EnabledSet, OptionsError> {
    let mut set = EnabledSet::default_set();
    for &id in ids {
        if id.is_setting() {
            return Err(OptionsError::SettingsFlagNotAllowed(id));
        }
        if id.is_aggregate() {
            return Err(OptionsError::AggregateFlagNotAllowed(id));
        }
        set.set(id, false);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_excludes_only_dmesg() {
        let set = EnabledSet::default_set();
        assert!(!set.is_set(ProbeId::Dmesg));
        assert!(set.is_set(ProbeId::Vmid));
        assert!(set.is_set(ProbeId::Sidt));
    }

    #[test]
    fn all_set_includes_dmesg() {
        let set = EnabledSet::all();
        assert!(set.is_set(ProbeId::Dmesg));
    }

    #[test]
    fn union_and_intersect_behave() {
        let mut a = EnabledSet::none();
        a.set(ProbeId::Vmid, true);
        let mut b = EnabledSet::none();
        b.set(ProbeId::Sidt, true);
        let union = a.union(&b);
        assert!(union.is_set(ProbeId::Vmid));
        assert!(union.is_set(ProbeId::Sidt));
        let intersect = a.intersect(&b);
        assert!(!intersect.is_set(ProbeId::Vmid));
        assert!(!intersect.is_set(ProbeId::Sidt));
    }

    #[test]
    fn from_flags_resolves_default_aggregate() {
        let opts = Options::from_flags(&[ProbeId::Default]).unwrap();
        assert!(!opts.enabled.is_set(ProbeId::Dmesg));
        assert!(opts.enabled.is_set(ProbeId::Vmid));
    }

    #[test]
    fn from_flags_resolves_settings() {
        let opts = Options::from_flags(&[ProbeId::Default, ProbeId::HighThreshold]).unwrap();
        assert!(opts.settings.high_threshold);
        assert!(!opts.settings.dynamic);
    }

    #[test]
    fn disable_rejects_setting_flags() {
        let err = disable(&[ProbeId::NoMemo]).unwrap_err();
        assert_eq!(err, OptionsError::SettingsFlagNotAllowed(ProbeId::NoMemo));
    }

    #[test]
    fn disable_rejects_aggregate_flags() {
        let err = disable(&[ProbeId::All]).unwrap_err();
        assert_eq!(err, OptionsError::AggregateFlagNotAllowed(ProbeId::All));
    }

    #[test]
    fn disable_turns_off_named_techniques() {
        let set = disable(&[ProbeId::Sidt, ProbeId::Sgdt]).unwrap();
        assert!(!set.is_set(ProbeId::Sidt));
        assert!(!set.is_set(ProbeId::Sgdt));
        assert!(set.is_set(ProbeId::Vmid));
    }
}
