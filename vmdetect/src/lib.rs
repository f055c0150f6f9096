// SPDX-License-Identifier: Apache-2.0

//! Host-introspection library: is the current process running inside a
//! virtualized, emulated, sandboxed, or containerized environment, and
//! which product is responsible?
//!
//! The crate exposes two surfaces. [`Engine`] owns a probe registry and a
//! memoization cache for callers who want an isolated, explicitly-driven
//! instance (tests, concurrent callers, anyone who wants to register
//! [`Engine::add_custom`] probes without touching global state). The free
//! functions at the crate root (`detect`, `percentage`, `brand`, …) operate
//! on a process-wide default engine behind a [`std::sync::Mutex`], mirroring
//! the ergonomic call-without-setup surface most callers want; see
//! [`default_engine`] for the convenience/scalability tradeoff this implies.
//!
//! Every probe collapses its outcome to a boolean: "did not detect" and
//! "could not detect" are indistinguishable by policy (see [`error`]'s
//! module documentation). The only user-visible failures are at the
//! [`Options`]/[`Engine`] API boundary.

pub mod brand;
pub mod cache;
pub mod cpu;
pub mod data;
mod engine;
pub mod error;
pub mod hyperx;
pub mod options;
pub mod platform;
pub mod probe;

pub use brand::BrandId;
pub use engine::Engine;
pub use error::{CustomProbeError, OptionsError};
pub use options::{disable, EnabledSet, Options, OptionsBuilder, Settings};
pub use probe::ProbeId;

use std::sync::Mutex;

use lazy_static::lazy_static;

lazy_static! {
    /// Process-wide [`Engine`] backing the free functions below. Guarded by
    /// a plain mutex; this is a convenience for callers who don't need
    /// isolated state, not a scalability mechanism — a caller issuing
    /// queries from many threads will serialize on it, and should construct
    /// its own `Engine` per thread if that matters.
    static ref DEFAULT_ENGINE: Mutex<Engine> = Mutex::new(Engine::new());
}

/// Runs `f` against the process-wide default engine, holding the lock only
/// for the duration of the call.
fn default_engine<T>(f: impl FnOnce(&mut Engine) -> T) -> T {
    let mut engine = DEFAULT_ENGINE.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    f(&mut engine)
}

/// Returns `true` if the accumulated score meets or exceeds the active
/// threshold (150 by default, 300 under [`Settings::high_threshold`]).
#[must_use]
pub fn detect(options: &Options) -> bool {
    default_engine(|engine| engine.detect(options))
}

/// Returns a 0-100 confidence value. Under [`Settings::dynamic`] this is
/// graded (99 once the raw score reaches 100, 100 once it reaches the
/// threshold, otherwise the raw score itself); otherwise it is a flat 100
/// or 0 relative to the threshold.
#[must_use]
pub fn percentage(options: &Options) -> u8 {
    default_engine(|engine| engine.percentage(options))
}

/// Returns the name of the highest-scoring brand, `"Unknown"` if nothing
/// scored, or (under [`Settings::multiple`]) every tied top brand joined by
/// `" or "`.
#[must_use]
pub fn brand(options: &Options) -> String {
    default_engine(|engine| engine.brand(options))
}

/// Returns the finalized brand's category (`"Hypervisor (type 2)"`,
/// `"Container"`, `"Sandbox"`, …), or `"Unknown"` for a multi-brand string
/// or an unrecognized brand.
#[must_use]
pub fn type_of(options: &Options) -> String {
    default_engine(|engine| engine.type_of(options))
}

/// Returns a human-readable phrase keyed on `percentage`/`brand`.
#[must_use]
pub fn conclusion(options: &Options) -> String {
    default_engine(|engine| engine.conclusion(options))
}

/// Single-probe query against the default engine.
///
/// # Errors
///
/// See [`Engine::check`].
pub fn check(id: ProbeId, memo_override: Option<bool>) -> Result<bool, OptionsError> {
    default_engine(|engine| engine.check(id, memo_override))
}

/// Every technique id that fired in the given configuration.
#[must_use]
pub fn detected_enums(options: &Options) -> Vec<ProbeId> {
    default_engine(|engine| engine.detected_enums(options))
}

/// How many techniques fired; `detected_enums(options).len()` as a `u8`.
#[must_use]
pub fn detected_count(options: &Options) -> u8 {
    default_engine(|engine| engine.detected_count(options))
}

/// Registers a user probe on the default engine.
///
/// # Errors
///
/// See [`Engine::add_custom`].
pub fn add_custom(
    weight: u8,
    thunk: Box<dyn Fn() -> bool + Send + Sync + std::panic::RefUnwindSafe>,
) -> Result<(), CustomProbeError> {
    default_engine(|engine| engine.add_custom(weight, thunk))
}

/// Adjusts a built-in probe's weight on the default engine.
///
/// # Errors
///
/// See [`Engine::modify_score`].
pub fn modify_score(id: ProbeId, new_weight: u8) -> Result<(), OptionsError> {
    default_engine(|engine| engine.modify_score(id, new_weight))
}

/// Stable identifier name for a probe id, round-tripped by
/// [`ProbeId::from_flag_string`].
#[must_use]
pub fn flag_to_string(id: ProbeId) -> &'static str {
    id.flag_to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_is_reachable_and_consistent() {
        let options = Options::default();
        let first = percentage(&options);
        let second = percentage(&options);
        assert_eq!(first, second);
        assert!(first <= 100);
    }

    #[test]
    fn check_rejects_settings_flag() {
        assert!(matches!(check(ProbeId::NoMemo, None), Err(OptionsError::SettingsFlagNotAllowed(_))));
    }

    #[test]
    fn flag_to_string_is_stable() {
        assert_eq!(flag_to_string(ProbeId::Vmid), "VMID");
    }

    #[test]
    fn disable_then_check_default_still_resolves() {
        let set = disable(&[ProbeId::Dmidecode]).unwrap();
        assert!(!set.is_set(ProbeId::Dmidecode));
        assert!(set.is_set(ProbeId::Vmid));
    }
}
