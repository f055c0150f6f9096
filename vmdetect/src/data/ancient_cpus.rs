// SPDX-License-Identifier: Apache-2.0

//! Brand-string substrings identifying parts the thread-count mismatch
//! probes exclude: low-end/throttled SKUs (Celeron, Atom, Pentium) whose
//! thread counts vary too much by stepping to be a reliable database key,
//! and pre-2006 single-core-only parts that predate hyperthreading
//! entirely.

/// Lowercase substrings checked against a lowercased brand string.
pub static ANCIENT_MARKERS: &[&str] = &[
    "celeron",
    "pentium",
    "atom",
    "pentium iii",
    "pentium 4",
    "pentium m",
    "core duo",
    "core solo",
];
