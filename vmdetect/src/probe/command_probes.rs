// SPDX-License-Identifier: Apache-2.0

//! Probes that shell out to a diagnostic utility and pattern-match its
//! output. Each checks for the binary's presence before running it, and
//! every probe here tolerates a missing binary as "no evidence" rather than
//! an error, per [`crate::platform::process`]'s contract.

use crate::brand::BrandId;
use crate::platform::{fs, process};
use crate::probe::{default_weight, Probe, ProbeId};

pub(crate) const VM_KEYWORDS: &[(&str, BrandId)] = &[
    ("vmware", BrandId::Vmware),
    ("virtualbox", BrandId::VirtualBox),
    ("oracle", BrandId::VirtualBox),
    ("qemu", BrandId::Qemu),
    ("kvm", BrandId::Kvm),
    ("microsoft", BrandId::HyperV),
    ("xen", BrandId::Xen),
    ("parallels", BrandId::ParallelsDesktop),
    ("bochs", BrandId::Bochs),
];

fn vote_on_first_keyword_match(text: &str, id: ProbeId, board: &mut crate::brand::Scoreboard) -> bool {
    let lower = text.to_lowercase();
    for (needle, brand) in VM_KEYWORDS {
        if lower.contains(needle) {
            board.vote(*brand, default_weight(id));
            return true;
        }
    }
    false
}

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::SystemdVirt,
        weight: default_weight(ProbeId::SystemdVirt),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(out) = process::run("systemd-detect-virt", &[]) {
                    if out != "none" {
                        return vote_on_first_keyword_match(&out, ProbeId::SystemdVirt, board);
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Dmidecode,
        weight: default_weight(ProbeId::Dmidecode),
        thunk: Box::new(|ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if !ctx.is_admin {
                    return false;
                }
                if !(fs::exists("/bin/dmidecode") || fs::exists("/usr/bin/dmidecode")) {
                    return false;
                }
                if let Some(out) = process::run("dmidecode", &["-t", "system"]) {
                    return vote_on_first_keyword_match(&out, ProbeId::Dmidecode, board);
                }
            }
            let _ = (ctx, board);
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Dmesg,
        weight: default_weight(ProbeId::Dmesg),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(out) = process::run("dmesg", &[]) {
                    return vote_on_first_keyword_match(&out, ProbeId::Dmesg, board);
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::LshwQemu,
        weight: default_weight(ProbeId::LshwQemu),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(out) = process::run("lshw", &["-short"]) {
                    if out.to_lowercase().contains("qemu") {
                        board.vote(BrandId::Qemu, default_weight(ProbeId::LshwQemu));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::IoregGrep,
        weight: default_weight(ProbeId::IoregGrep),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "macos")]
            {
                if let Some(out) = crate::platform::macos::ioreg_dump() {
                    return vote_on_first_keyword_match(&out, ProbeId::IoregGrep, board);
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::MacSip,
        weight: default_weight(ProbeId::MacSip),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "macos")]
            {
                if let Some(out) = crate::platform::macos::csrutil_status() {
                    return out.to_lowercase().contains("disabled");
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Hwmodel,
        weight: default_weight(ProbeId::Hwmodel),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "macos")]
            {
                if let Some(model) = crate::platform::macos::hw_model() {
                    return vote_on_first_keyword_match(&model, ProbeId::Hwmodel, board);
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::HwMemsize,
        weight: default_weight(ProbeId::HwMemsize),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "macos")]
            {
                if let Some(bytes) = crate::platform::macos::hw_memsize() {
                    // A suspiciously round memory size (exact power-of-two
                    // gigabytes) correlates with hand-configured VM
                    // allocations more than real hardware SKUs, which ship
                    // with module-dependent odd totals.
                    let gib = bytes / (1024 * 1024 * 1024);
                    return gib > 0 && bytes % (1024 * 1024 * 1024) == 0 && gib.is_power_of_two();
                }
            }
            false
        }),
    });
}
