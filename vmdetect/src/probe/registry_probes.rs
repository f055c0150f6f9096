// SPDX-License-Identifier: Apache-2.0

//! Registry-presence probes distinct from the combined
//! [`crate::probe::fs_probes::VmFiles`]/[`crate::probe::windows_probes`]
//! sweeps: a single named key and a full-table scan, kept separate so
//! callers can disable the expensive full scan independently.

use crate::data::vm_files::WINDOWS_VM_REGISTRY_KEYS;
use crate::probe::{default_weight, Probe, ProbeId};

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::RegistryKey,
        weight: default_weight(ProbeId::RegistryKey),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                if crate::platform::windows::hklm_key_exists(r"SOFTWARE\Classes\Folder\shell\sandbox") {
                    board.vote(crate::brand::BrandId::Sandboxie, default_weight(ProbeId::RegistryKey));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::HklmRegistries,
        weight: default_weight(ProbeId::HklmRegistries),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                let mut any = false;
                for (key, brand) in WINDOWS_VM_REGISTRY_KEYS {
                    if crate::platform::windows::hklm_key_exists(key) {
                        board.vote(*brand, default_weight(ProbeId::HklmRegistries));
                        any = true;
                    }
                }
                return any;
            }
            #[allow(unreachable_code)]
            {
                let _ = board;
                false
            }
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_both_registry_techniques() {
        let mut probes = Vec::new();
        register(&mut probes);
        assert!(probes.iter().any(|p| p.id == ProbeId::RegistryKey));
        assert!(probes.iter().any(|p| p.id == ProbeId::HklmRegistries));
    }
}
