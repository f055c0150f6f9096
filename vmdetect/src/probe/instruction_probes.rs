// SPDX-License-Identifier: Apache-2.0

//! Probes that execute unprivileged-but-revealing instructions: descriptor
//! table reads (`sidt`/`sgdt`/`sldt`/`smsw`) and the VMware hypervisor
//! backdoor I/O port.

use crate::brand::BrandId;
use crate::probe::{default_weight, Probe, ProbeId};

/// VMware's backdoor magic value, `"VMXh"` read as a little-endian u32.
const VMWARE_MAGIC: u32 = 0x564D_5868;
/// The I/O port the backdoor listens on.
const VMWARE_PORT: u16 = 0x5658;

// The port answers without a fault only when VMware's monitor has
// configured an I/O-bitmap intercept for exactly this port; under bare
// metal, or under any hypervisor that doesn't implement the backdoor
// protocol, `in` from ring 3 without IOPL raises #GP regardless of whether
// a hypervisor is present at all. Run the instruction in a forked child so
// that fault kills only the child, not the caller's process.
#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
fn raw_backdoor_probe() -> bool {
    let ebx_out: u32;
    // SAFETY: reads a single result register after a single `in`; the
    // instruction itself may fault, which is why this only ever runs
    // inside the forked child in `vmware_backdoor_present`.
    unsafe {
        std::arch::asm!(
            "push rbx",
            "in eax, dx",
            "mov {ebx_out:e}, ebx",
            "pop rbx",
            ebx_out = out(reg) ebx_out,
            inout("eax") VMWARE_MAGIC => _,
            inout("ecx") 10u32 => _,
            in("edx") u32::from(VMWARE_PORT),
            options(nomem),
        );
    }
    ebx_out == VMWARE_MAGIC
}

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
fn vmware_backdoor_present() -> bool {
    // SAFETY: `fork` duplicates the calling process; the child only ever
    // calls `raw_backdoor_probe` and `_exit`, never returns across the
    // `fork` boundary, and touches no parent-owned resources.
    unsafe {
        let pid = libc::fork();
        if pid < 0 {
            return false;
        }
        if pid == 0 {
            let result = raw_backdoor_probe();
            libc::_exit(i32::from(result));
        }
        let mut status: libc::c_int = 0;
        if libc::waitpid(pid, &mut status, 0) < 0 {
            return false;
        }
        libc::WIFEXITED(status) && libc::WEXITSTATUS(status) == 1
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
fn vmware_backdoor_present() -> bool {
    false
}

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::Sidt,
        weight: default_weight(ProbeId::Sidt),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                let idtr = crate::platform::linux::sidt();
                // A bare-metal IDT base sits well below the 4GB mark on
                // every mainstream kernel; several hypervisors relocate it
                // above that boundary.
                let base = u64::from_le_bytes(idtr[2..10].try_into().unwrap());
                if base >> 32 != 0 {
                    board.vote(BrandId::Unknown, default_weight(ProbeId::Sidt));
                    return true;
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Sgdt,
        weight: default_weight(ProbeId::Sgdt),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "linux")]
            {
                let gdtr = crate::platform::linux::sgdt();
                let limit = u16::from_le_bytes([gdtr[0], gdtr[1]]);
                // A handful of hypervisors configure an unusually small
                // GDT limit for the guest's default descriptor table.
                return limit != 0 && limit < 0x40;
            }
            #[cfg(not(target_os = "linux"))]
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Sldt,
        weight: default_weight(ProbeId::Sldt),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "linux")]
            {
                return crate::platform::linux::sldt() != 0;
            }
            #[cfg(not(target_os = "linux"))]
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Smsw,
        weight: default_weight(ProbeId::Smsw),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "linux")]
            {
                // Bit 3 (TS) toggling unusually alongside bit 0 (PE) is a
                // weak signal some hypervisors leave from lazy FPU-context
                // switching; checked only as a last-resort corroborator.
                let msw = crate::platform::linux::smsw();
                return msw & 0b1000 != 0 && msw & 0b0001 != 0;
            }
            #[cfg(not(target_os = "linux"))]
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VpcInvalid,
        weight: default_weight(ProbeId::VpcInvalid),
        thunk: Box::new(|_ctx, board| {
            // Virtual PC's invalid-opcode red pill (`0F 3F 07 0B`) cannot be
            // executed from safe Rust without risking SIGILL on a host that
            // isn't Virtual PC; this is gated off entirely since catching
            // the resulting signal is out of scope for a userspace probe.
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmwareBackdoor,
        weight: default_weight(ProbeId::VmwareBackdoor),
        thunk: Box::new(|ctx, board| {
            if !ctx.hypervisor_bit {
                return false;
            }
            if vmware_backdoor_present() {
                board.vote(BrandId::Vmware, default_weight(ProbeId::VmwareBackdoor));
                true
            } else {
                false
            }
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmwarePortMemory,
        weight: default_weight(ProbeId::VmwarePortMemory),
        thunk: Box::new(|ctx, board| {
            if ctx.hypervisor_bit && vmware_backdoor_present() {
                board.vote(BrandId::Vmware, default_weight(ProbeId::VmwarePortMemory));
                true
            } else {
                false
            }
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmwareStr,
        weight: default_weight(ProbeId::VmwareStr),
        thunk: Box::new(|ctx, board| {
            if ctx.brand_string.to_lowercase().contains("vmware") {
                board.vote(BrandId::Vmware, default_weight(ProbeId::VmwareStr));
                true
            } else {
                false
            }
        }),
    });

    probes.push(Probe {
        id: ProbeId::Osxsave,
        weight: default_weight(ProbeId::Osxsave),
        thunk: Box::new(|ctx, _board| {
            let leaf1 = ctx.cpuid.read(0x1, 0);
            let osxsave = leaf1.ecx & (1 << crate::cpu::leaves::leaf_0x1::ecx::OSXSAVE_BITINDEX) != 0;
            let vmx = leaf1.ecx & (1 << crate::cpu::leaves::leaf_0x1::ecx::VMX_BITINDEX) != 0;
            // VMX exposed to a guest alongside OSXSAVE unset is a nested
            // virtualization artifact some thin hypervisors leave.
            vmx && !osxsave
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::Scoreboard;
    use crate::platform::cpuid::{FixedCpuidSource, Leaves};
    use crate::probe::ProbeContext;

    #[test]
    fn vmware_str_probe_votes_on_brand_string_match() {
        let source = FixedCpuidSource::new()
            .with_leaf(0x8000_0000, 0, Leaves { eax: 0x8000_0004, ..Default::default() })
            .with_leaf(
                0x8000_0002,
                0,
                Leaves {
                    eax: u32::from_le_bytes(*b"VMwa"),
                    ebx: u32::from_le_bytes(*b"re V"),
                    ecx: u32::from_le_bytes(*b"irtu"),
                    edx: u32::from_le_bytes(*b"al  "),
                },
            );
        let ctx = ProbeContext::gather(&source);
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::VmwareStr).unwrap();
        assert!((probe.thunk)(&ctx, &mut board));
    }

    #[test]
    fn osxsave_probe_requires_vmx_without_osxsave() {
        let source = FixedCpuidSource::new().with_leaf(
            0x1,
            0,
            Leaves {
                eax: 0,
                ebx: 0,
                ecx: 1 << crate::cpu::leaves::leaf_0x1::ecx::VMX_BITINDEX,
                edx: 0,
            },
        );
        let ctx = ProbeContext::gather(&source);
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::Osxsave).unwrap();
        assert!((probe.thunk)(&ctx, &mut board));
    }
}
