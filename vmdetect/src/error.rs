// SPDX-License-Identifier: Apache-2.0

//! Errors raised at the public API boundary.
//!
//! Probe-internal failures never reach here: a probe that cannot run on the
//! current platform, or whose backing file/binary/API is unavailable, simply
//! returns `false` (see the crate-level documentation for the rationale).
//! These errors are reserved for callers misusing the [`crate::Options`] or
//! [`crate::Engine`] surface.

use crate::probe::ProbeId;

/// Error type for [`crate::Engine::check`], [`crate::Engine::modify_score`]
/// and [`crate::options::disable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// A settings flag (`NO_MEMO`, `HIGH_THRESHOLD`, `DYNAMIC`, `MULTIPLE`)
    /// was passed somewhere only a technique [`ProbeId`] is accepted.
    #[error("{0:?} is a settings flag, not a technique, and cannot be used here")]
    SettingsFlagNotAllowed(ProbeId),
    /// An aggregate flag (`DEFAULT`, `ALL`, `NULL_ARG`) was passed somewhere
    /// only a single concrete technique is accepted.
    #[error("{0:?} is an aggregate flag, not a single technique, and cannot be used here")]
    AggregateFlagNotAllowed(ProbeId),
}

/// Error type for [`crate::Engine::add_custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CustomProbeError {
    /// A probe's weight is the number of points it contributes on a positive
    /// signal and must not exceed 100.
    #[error("custom probe weight {0} exceeds the maximum of 100")]
    WeightTooLarge(u8),
}
