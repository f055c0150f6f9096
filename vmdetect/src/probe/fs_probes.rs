// SPDX-License-Identifier: Apache-2.0

//! Probes keyed on filesystem state: marker files, `/proc`/`/sys` content,
//! and loaded kernel modules. Linux-only by construction — every thunk
//! here returns `false` off Linux since the paths it reads don't exist
//! elsewhere.

use crate::data::vm_files::{DMI_VM_MARKERS, LINUX_MARKER_FILES, LINUX_VM_MODULES};
use crate::platform::fs;
use crate::probe::{default_weight, Probe, ProbeId};

#[cfg(target_os = "linux")]
fn brand_from_marker_file(id: ProbeId, board: &mut crate::brand::Scoreboard) -> bool {
    for (path, brand) in LINUX_MARKER_FILES {
        if fs::exists(path) {
            board.vote(*brand, default_weight(id));
            return true;
        }
    }
    false
}

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::Dockerenv,
        weight: default_weight(ProbeId::Dockerenv),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if fs::exists("/.dockerenv") || fs::exists("/.dockerinit") {
                    board.vote(crate::brand::BrandId::Docker, default_weight(ProbeId::Dockerenv));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::PodmanFile,
        weight: default_weight(ProbeId::PodmanFile),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if fs::exists("/run/.containerenv") {
                    board.vote(crate::brand::BrandId::Podman, default_weight(ProbeId::PodmanFile));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::HypervisorDir,
        weight: default_weight(ProbeId::HypervisorDir),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                return brand_from_marker_file(ProbeId::HypervisorDir, board);
            }
            #[cfg(not(target_os = "linux"))]
            {
                let _ = board;
                false
            }
        }),
    });

    probes.push(Probe {
        id: ProbeId::VboxModule,
        weight: default_weight(ProbeId::VboxModule),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                let modules = crate::platform::linux::loaded_kernel_modules();
                for (name, brand) in LINUX_VM_MODULES {
                    if name.starts_with("vbox") && modules.iter().any(|m| m == name) {
                        board.vote(*brand, default_weight(ProbeId::VboxModule));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::DeviceTree,
        weight: default_weight(ProbeId::DeviceTree),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(compat) = crate::platform::linux::device_tree_hypervisor_compatible() {
                    if !compat.is_empty() {
                        board.vote(crate::brand::BrandId::Kvm, default_weight(ProbeId::DeviceTree));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::QemuVirtualDmi,
        weight: default_weight(ProbeId::QemuVirtualDmi),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(vendor) = crate::platform::linux::dmi_field("sys_vendor") {
                    if vendor.to_lowercase().contains("qemu") {
                        board.vote(crate::brand::BrandId::Qemu, default_weight(ProbeId::QemuVirtualDmi));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::QemuUsb,
        weight: default_weight(ProbeId::QemuUsb),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                let names = fs::list_dir_names("/sys/bus/usb/devices");
                if names.iter().any(|n| n.to_lowercase().contains("qemu")) {
                    board.vote(crate::brand::BrandId::Qemu, default_weight(ProbeId::QemuUsb));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::SysQemuDir,
        weight: default_weight(ProbeId::SysQemuDir),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if fs::is_directory("/sys/devices/virtual/misc/qemu_fw_cfg") {
                    board.vote(crate::brand::BrandId::Qemu, default_weight(ProbeId::SysQemuDir));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmwareIomem,
        weight: default_weight(ProbeId::VmwareIomem),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(text) = fs::read_file_text("/proc/iomem") {
                    if text.to_lowercase().contains("vmware") {
                        board.vote(crate::brand::BrandId::Vmware, default_weight(ProbeId::VmwareIomem));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmwareIoports,
        weight: default_weight(ProbeId::VmwareIoports),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(text) = fs::read_file_text("/proc/ioports") {
                    if text.to_lowercase().contains("vmware") {
                        board.vote(crate::brand::BrandId::Vmware, default_weight(ProbeId::VmwareIoports));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmwareScsi,
        weight: default_weight(ProbeId::VmwareScsi),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(text) = fs::read_file_text("/proc/scsi/scsi") {
                    if text.to_lowercase().contains("vmware") {
                        board.vote(crate::brand::BrandId::Vmware, default_weight(ProbeId::VmwareScsi));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::SysinfoProc,
        weight: default_weight(ProbeId::SysinfoProc),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(value) = crate::platform::linux::dmi_field("product_name") {
                    let lower = value.to_lowercase();
                    for (field, brand) in DMI_VM_MARKERS {
                        if lower.contains(field) {
                            board.vote(*brand, default_weight(ProbeId::SysinfoProc));
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
        id: ProbeId::WslProc,
        weight: default_weight(ProbeId::WslProc),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                if let Some(release) = fs::read_file_text("/proc/sys/kernel/osrelease") {
                    if release.to_lowercase().contains("microsoft") {
                        board.vote(crate::brand::BrandId::Wsl, default_weight(ProbeId::WslProc));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::FileAccessHistory,
        weight: default_weight(ProbeId::FileAccessHistory),
        thunk: Box::new(|_ctx, board| {
            // A fresh snapshot VM frequently has an empty or tiny recent
            // files list compared to a machine that's seen real use; this
            // is the weakest built-in signal by design (see its low
            // weight) and is never sufficient on its own.
            #[cfg(target_os = "linux")]
            {
                if let Some(home) = std::env::var_os("HOME") {
                    let recent = std::path::Path::new(&home).join(".local/share/recently-used.xbel");
                    if !fs::exists(&recent) {
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmFiles,
        weight: default_weight(ProbeId::VmFiles),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "linux")]
            {
                return brand_from_marker_file(ProbeId::VmFiles, board);
            }
            #[cfg(target_os = "windows")]
            {
                use crate::data::vm_files::WINDOWS_VM_REGISTRY_KEYS;
                for (key, brand) in WINDOWS_VM_REGISTRY_KEYS {
                    if crate::platform::windows::hklm_key_exists(key) {
                        board.vote(*brand, default_weight(ProbeId::VmFiles));
                        return true;
                    }
                }
                false
            }
            #[cfg(not(any(target_os = "linux", target_os = "windows")))]
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
    fn registers_every_filesystem_technique() {
        let mut probes = Vec::new();
        register(&mut probes);
        let expected = [
            ProbeId::Dockerenv,
            ProbeId::PodmanFile,
            ProbeId::HypervisorDir,
            ProbeId::VboxModule,
            ProbeId::DeviceTree,
            ProbeId::QemuVirtualDmi,
            ProbeId::QemuUsb,
            ProbeId::SysQemuDir,
            ProbeId::VmwareIomem,
            ProbeId::VmwareIoports,
            ProbeId::VmwareScsi,
            ProbeId::SysinfoProc,
            ProbeId::WslProc,
            ProbeId::FileAccessHistory,
            ProbeId::VmFiles,
        ];
        for id in expected {
            assert!(probes.iter().any(|p| p.id == id), "{id:?} missing");
        }
    }
}
