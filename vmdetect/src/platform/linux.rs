// SPDX-License-Identifier: Apache-2.0

//! Linux-specific primitives: privileged-but-unprivileged-to-read
//! descriptor-table instructions, and the handful of `/proc`/`/sys` paths
//! the filesystem probes read.

use crate::platform::fs;

/// Result of `sidt`: a 10-byte `IDTR` pseudo-descriptor (2-byte limit,
/// 8-byte base on x86_64).
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn sidt() -> [u8; 10] {
    let mut idtr = [0u8; 10];
    // SAFETY: `sidt` is an unprivileged instruction that only reads the
    // IDTR into the provided 10-byte buffer; it never faults.
    unsafe {
        std::arch::asm!("sidt [{0}]", in(reg) idtr.as_mut_ptr(), options(nostack, preserves_flags));
    }
    idtr
}

/// Result of `sgdt`: a 10-byte `GDTR` pseudo-descriptor, same shape as
/// [`sidt`].
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn sgdt() -> [u8; 10] {
    let mut gdtr = [0u8; 10];
    // SAFETY: `sgdt` is unprivileged and only reads into the buffer.
    unsafe {
        std::arch::asm!("sgdt [{0}]", in(reg) gdtr.as_mut_ptr(), options(nostack, preserves_flags));
    }
    gdtr
}

/// Result of `sldt`: the current Local Descriptor Table selector.
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn sldt() -> u16 {
    let mut ldtr: u16 = 0;
    // SAFETY: `sldt` is unprivileged and only writes a 16-bit selector.
    unsafe {
        std::arch::asm!("sldt {0:x}", out(reg) ldtr, options(nostack, preserves_flags));
    }
    ldtr
}

/// Result of `smsw`: the low 16 bits of CR0, readable from ring 3.
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn smsw() -> u16 {
    let mut msw: u16 = 0;
    // SAFETY: `smsw` is unprivileged and only writes a 16-bit value.
    unsafe {
        std::arch::asm!("smsw {0:x}", out(reg) msw, options(nostack, preserves_flags));
    }
    msw
}

#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub fn sidt() -> [u8; 10] {
    [0; 10]
}

#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub fn sgdt() -> [u8; 10] {
    [0; 10]
}

#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub fn sldt() -> u16 {
    0
}

#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub fn smsw() -> u16 {
    0
}

/// `systemd-detect-virt`'s own verdict, read straight from `/run/systemd`
/// when present rather than shelling out, since the daemon caches the same
/// answer there.
#[must_use]
pub fn systemd_virt_env() -> Option<String> {
    fs::read_file_text("/run/systemd/container")
}

/// `/sys/class/dmi/id/*` fields relevant to VM fingerprinting: `sys_vendor`,
/// `product_name`, `bios_vendor`, `board_vendor`.
#[must_use]
pub fn dmi_field(field: &str) -> Option<String> {
    fs::read_file_text(format!("/sys/class/dmi/id/{field}"))
}

/// `/proc/modules` entries, for the `vboxguest`/`vboxsf`/`vmw_balloon`-style
/// loaded-kernel-module check.
#[must_use]
pub fn loaded_kernel_modules() -> Vec<String> {
    fs::read_file_text("/proc/modules")
        .map(|text| {
            text.lines()
                .filter_map(|line| line.split_whitespace().next())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Devicetree `/proc/device-tree/hypervisor/compatible` content, the ARM
/// analogue of the x86 CPUID hypervisor leaves.
#[must_use]
pub fn device_tree_hypervisor_compatible() -> Option<String> {
    fs::read_file_text("/proc/device-tree/hypervisor/compatible")
}
