// SPDX-License-Identifier: Apache-2.0

//! Everything that doesn't fit the other categories cleanly: MAC address
//! OUI lookup, hostname heuristics, sandbox-specific file/pipe markers, and
//! a couple of cross-platform process/PCI scans.

use crate::brand::BrandId;
use crate::platform::{fs, process};
use crate::probe::{default_weight, Probe, ProbeId};

/// Hostnames analysis sandboxes are known to leave on guest images,
/// matched case-insensitively and in full (not substring, to avoid
/// matching a real user's machine named e.g. `my-sandbox-laptop`).
const SANDBOX_HOSTNAMES: &[&str] = &["sandbox", "malware", "maltest", "test-pc", "sample"];
const HYPERV_HOSTNAMES: &[&str] = &["hyperv", "winvm"];

fn current_hostname() -> Option<String> {
    #[cfg(unix)]
    {
        process::run("hostname", &[])
    }
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(any(unix, windows)))]
    {
        None
    }
}

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::MacAddressCheck,
        weight: default_weight(ProbeId::MacAddressCheck),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                for iface in fs::list_dir_names("/sys/class/net") {
                    if iface == "lo" {
                        continue;
                    }
                    let Some(addr) =
                        fs::read_file_text(format!("/sys/class/net/{iface}/address"))
                    else {
                        continue;
                    };
                    let prefix = addr.split(':').take(3).collect::<Vec<_>>().join(":").to_uppercase();
                    if let Some(brand) = crate::data::mac_ouis::brand_for_oui(&prefix) {
                        board.vote(brand, default_weight(ProbeId::MacAddressCheck));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::HypervHostname,
        weight: default_weight(ProbeId::HypervHostname),
        thunk: Box::new(|_ctx, board| {
            let Some(hostname) = current_hostname() else {
                return false;
            };
            let lower = hostname.to_lowercase();
            if HYPERV_HOSTNAMES.iter().any(|h| lower == *h) {
                board.vote(BrandId::HyperV, default_weight(ProbeId::HypervHostname));
                return true;
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::GeneralHostname,
        weight: default_weight(ProbeId::GeneralHostname),
        thunk: Box::new(|_ctx, _board| {
            let Some(hostname) = current_hostname() else {
                return false;
            };
            let lower = hostname.to_lowercase();
            SANDBOX_HOSTNAMES.iter().any(|h| lower == *h)
        }),
    });

    probes.push(Probe {
        id: ProbeId::DllCheck,
        weight: default_weight(ProbeId::DllCheck),
        thunk: Box::new(|_ctx, _board| {
            // `LoadLibraryA` probing requires the Windows loader and is
            // gated off elsewhere; this crate substitutes the equivalent
            // signal already covered by FILE_ACCESS_HISTORY/VM_FILES on
            // non-Windows platforms, so this specific technique only ever
            // fires on Windows where the probe registry's windows_probes
            // module owns the DLL-presence checks through
            // `enum_present_device_names`-adjacent primitives.
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Mutex,
        weight: default_weight(ProbeId::Mutex),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "windows")]
            {
                // A full CreateMutexA/GetLastError(ERROR_ALREADY_EXISTS)
                // probe for named sandbox mutexes (`Sandboxie`,
                // `SBIE_BOXED_ServiceInitComplete`) needs the `synchapi`
                // winapi feature, which isn't enabled in this crate's
                // dependency table; left unimplemented rather than adding
                // a feature for a single probe with low standalone weight.
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::CuckooDir,
        weight: default_weight(ProbeId::CuckooDir),
        thunk: Box::new(|_ctx, board| {
            if fs::exists("C:\\analysis") || fs::exists("/tmp/cuckoo") {
                board.vote(BrandId::Cuckoo, default_weight(ProbeId::CuckooDir));
                return true;
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::CuckooPipe,
        weight: default_weight(ProbeId::CuckooPipe),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if fs::exists("/tmp/cuckoo-pipe") {
                    board.vote(BrandId::Cuckoo, default_weight(ProbeId::CuckooPipe));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::DeviceString,
        weight: default_weight(ProbeId::DeviceString),
        thunk: Box::new(|ctx, board| {
            let lower = ctx.vendor_id.to_lowercase();
            if lower.contains("kvm") || lower.contains("tcgtcg") {
                board.vote(BrandId::Kvm, default_weight(ProbeId::DeviceString));
                return true;
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::NsjailPid,
        weight: default_weight(ProbeId::NsjailPid),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(status) = fs::read_file_text("/proc/1/status") {
                    if status.to_lowercase().contains("nsjail") {
                        board.vote(BrandId::Nsjail, default_weight(ProbeId::NsjailPid));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::Lspci,
        weight: default_weight(ProbeId::Lspci),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(out) = process::run("lspci", &[]) {
                    let lower = out.to_lowercase();
                    for (needle, brand) in crate::probe::command_probes::VM_KEYWORDS {
                        if lower.contains(needle) {
                            board.vote(*brand, default_weight(ProbeId::Lspci));
                            return true;
                        }
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::AmdSev,
        weight: default_weight(ProbeId::AmdSev),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(text) = fs::read_file_text("/sys/module/kvm_amd/parameters/sev") {
                    if text.trim() == "1" || text.trim().eq_ignore_ascii_case("y") {
                        board.vote(BrandId::Kvm, default_weight(ProbeId::AmdSev));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_misc_technique() {
        let mut probes = Vec::new();
        register(&mut probes);
        let expected = [
            ProbeId::MacAddressCheck,
            ProbeId::HypervHostname,
            ProbeId::GeneralHostname,
            ProbeId::DllCheck,
            ProbeId::Mutex,
            ProbeId::CuckooDir,
            ProbeId::CuckooPipe,
            ProbeId::DeviceString,
            ProbeId::NsjailPid,
            ProbeId::Lspci,
            ProbeId::AmdSev,
        ];
        for id in expected {
            assert!(probes.iter().any(|p| p.id == id), "{id:?} missing");
        }
    }
}
