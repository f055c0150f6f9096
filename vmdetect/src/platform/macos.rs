// SPDX-License-Identifier: Apache-2.0

//! macOS-specific primitives, all subprocess-backed: Apple doesn't expose
//! the DMI/registry-style introspection Linux and Windows do to userspace,
//! so `sysctl`/`ioreg`/`csrutil` stand in.

use crate::platform::process;

/// `sysctl -n hw.model`, e.g. `MacBookPro18,3` on real hardware and
/// `VMware7,1`/`Parallels19,1`/absent-or-generic on a VM.
#[must_use]
pub fn hw_model() -> Option<String> {
    process::run("sysctl", &["-n", "hw.model"])
}

/// `sysctl -n hw.memsize`, in bytes. VMs are frequently configured with
/// suspiciously round memory sizes.
#[must_use]
pub fn hw_memsize() -> Option<u64> {
    process::run("sysctl", &["-n", "hw.memsize"]).and_then(|s| s.parse().ok())
}

/// `csrutil status`'s text, used to cross-check System Integrity Protection
/// state (several VM images ship with SIP disabled by default).
#[must_use]
pub fn csrutil_status() -> Option<String> {
    process::run("csrutil", &["status"])
}

/// `ioreg -l` output, grepped by [`crate::probe::command_probes`] for
/// VM-vendor device strings (`VMware`, `VirtualBox`, `Parallels`).
#[must_use]
pub fn ioreg_dump() -> Option<String> {
    process::run("ioreg", &["-l"])
}
