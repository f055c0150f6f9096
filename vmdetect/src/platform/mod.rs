// SPDX-License-Identifier: Apache-2.0

//! Thin, per-OS primitives every probe is built on. Nothing above this
//! module reaches `std::process`, `std::fs`, or `core::arch` directly; a
//! probe that needs the host asks `platform` for a fact and interprets it.

pub mod admin;
pub mod cpuid;
pub mod fs;
pub mod process;
pub mod timing;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;
