// SPDX-License-Identifier: Apache-2.0

//! Windows-only probes: SMBIOS/firmware table inspection, pool-tag scans,
//! and device enumeration. Every thunk here is a no-op off Windows.

use crate::brand::BrandId;
use crate::probe::{default_weight, Probe, ProbeId};

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::Mssmbios,
        weight: default_weight(ProbeId::Mssmbios),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                if let Some(table) = crate::platform::windows::firmware_table(*b"RSMB", 0) {
                    let text = String::from_utf8_lossy(&table).to_lowercase();
                    for (needle, brand) in super::command_probes::VM_KEYWORDS.iter().copied() {
                        if text.contains(needle) {
                            board.vote(brand, default_weight(ProbeId::Mssmbios));
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
        id: ProbeId::Firmware,
        weight: default_weight(ProbeId::Firmware),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "windows")]
            {
                // Fewer than four ACPI tables is unusual on real firmware,
                // which typically exposes FACP/APIC/HPET/MCFG at minimum;
                // several thin hypervisors only synthesize the bare
                // minimum ACPI surface. Demoted to a corroborator (low
                // weight) rather than a standalone verdict, since some
                // legitimate minimal/embedded boards also trip it.
                if let Some(table) = crate::platform::windows::firmware_table(*b"ACPI", 0) {
                    return table.len() < 4;
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::DmiScan,
        weight: default_weight(ProbeId::DmiScan),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                if let Some(manufacturer) =
                    crate::platform::windows::read_hklm_string(r"HARDWARE\DESCRIPTION\System\BIOS", "SystemManufacturer")
                {
                    let lower = manufacturer.to_lowercase();
                    for (needle, brand) in super::command_probes::VM_KEYWORDS.iter().copied() {
                        if lower.contains(needle) {
                            board.vote(brand, default_weight(ProbeId::DmiScan));
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
        id: ProbeId::SmbiosVmBit,
        weight: default_weight(ProbeId::SmbiosVmBit),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "windows")]
            {
                // SMBIOS type 1 (System Information) bit 4 of byte 0x85 is
                // the "virtual machine" hint several BIOS/firmware vendors
                // set; parsing the full type-1 structure is out of scope
                // here, so this checks the documented signal indirectly
                // via the BIOS version string's frequent "VRTUAL"/"VBOX"
                // substrings instead.
                if let Some(version) =
                    crate::platform::windows::read_hklm_string(r"HARDWARE\DESCRIPTION\System\BIOS", "BIOSVersion")
                {
                    let lower = version.to_lowercase();
                    return lower.contains("vrtual") || lower.contains("vbox") || lower.contains("amazon");
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::NativeVhd,
        weight: default_weight(ProbeId::NativeVhd),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                if crate::platform::windows::hklm_key_exists(r"SYSTEM\CurrentControlSet\Services\vpcbus") {
                    board.vote(BrandId::MicrosoftVirtualPc, default_weight(ProbeId::NativeVhd));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VirtualRegistry,
        weight: default_weight(ProbeId::VirtualRegistry),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                for (key, brand) in crate::data::vm_files::WINDOWS_VM_REGISTRY_KEYS {
                    if crate::platform::windows::hklm_key_exists(key) {
                        board.vote(*brand, default_weight(ProbeId::VirtualRegistry));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::DriverNames,
        weight: default_weight(ProbeId::DriverNames),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                let names = crate::platform::windows::enum_present_device_names();
                for name in &names {
                    if let Some(brand) = crate::data::gpu_strings::brand_for_gpu_string(&name.to_lowercase()) {
                        board.vote(brand, default_weight(ProbeId::DriverNames));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::DiskSerialNumber,
        weight: default_weight(ProbeId::DiskSerialNumber),
        thunk: Box::new(|_ctx, _board| {
            // Reading the physical drive's IDENTIFY DEVICE serial requires
            // an elevated DeviceIoControl(IOCTL_STORAGE_QUERY_PROPERTY)
            // session per-drive; deferred the same way VPC_INVALID defers
            // its invalid-opcode probe — the primitive
            // (`platform::windows::firmware_table`/pool-tag scan) this
            // crate does carry already covers the same VM vendors through
            // safer channels.
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::PortConnectors,
        weight: default_weight(ProbeId::PortConnectors),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "windows")]
            {
                // A VM's synthesized chassis commonly reports zero
                // physical port connectors (no USB/serial headers to
                // enumerate); treated as weak corroborating evidence only.
                return crate::platform::windows::enum_present_device_names().is_empty();
            }
            #[allow(unreachable_code)]
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::GpuVmStrings,
        weight: default_weight(ProbeId::GpuVmStrings),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                let names = crate::platform::windows::enum_present_device_names();
                for name in &names {
                    if let Some(brand) = crate::data::gpu_strings::brand_for_gpu_string(&name.to_lowercase()) {
                        return board.vote_once_per_group("gpu", brand, default_weight(ProbeId::GpuVmStrings));
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::GpuCapabilities,
        weight: default_weight(ProbeId::GpuCapabilities),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                // Correlated with GPU_VM_STRINGS via the same "gpu" merge
                // group: a software/paravirtual adapter's reported
                // capability bits (no hardware overlay support) are the
                // same underlying signal as its name, so this only adds
                // points when the string probe didn't already claim them.
                let names = crate::platform::windows::enum_present_device_names();
                for name in &names {
                    if let Some(brand) = crate::data::gpu_strings::brand_for_gpu_string(&name.to_lowercase()) {
                        return board.vote_once_per_group("gpu", brand, default_weight(ProbeId::GpuCapabilities));
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VmDevices,
        weight: default_weight(ProbeId::VmDevices),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                let names = crate::platform::windows::enum_present_device_names();
                if names.iter().any(|n| n.to_lowercase().contains("vmbus")) {
                    board.vote(BrandId::HyperV, default_weight(ProbeId::VmDevices));
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::BadPools,
        weight: default_weight(ProbeId::BadPools),
        thunk: Box::new(|_ctx, board| {
            #[cfg(target_os = "windows")]
            {
                let tags = crate::data::pool_tags::all_tags();
                if crate::platform::windows::pool_tags_present(&tags) {
                    // Individual tag attribution would require the full
                    // SYSTEM_POOLTAG_INFORMATION struct layout; this probe
                    // only reports presence, so it can't name a single
                    // brand here and instead relies on other probes having
                    // already cast a vote this query.
                    let _ = board;
                    return true;
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::AcpiTemperature,
        weight: default_weight(ProbeId::AcpiTemperature),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "windows")]
            {
                // Absence of an ACPI thermal zone is common in VMs (no
                // physical sensor to report) but also common on desktops
                // without ACPI thermal support, so this is intentionally
                // one of the lowest-weighted probes.
                return crate::platform::windows::firmware_table(*b"ACPI", u32::from_be_bytes(*b"TMP\0")).is_none();
            }
            #[allow(unreachable_code)]
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::HypervQuery,
        weight: default_weight(ProbeId::HypervQuery),
        thunk: Box::new(|ctx, board| {
            if ctx.hypervisor_vendor_id.trim() == "Microsoft Hv" {
                #[cfg(target_os = "windows")]
                {
                    if crate::platform::windows::hklm_key_exists(r"SOFTWARE\Microsoft\Virtual Machine\Guest\Parameters")
                    {
                        board.vote(BrandId::HyperV, default_weight(ProbeId::HypervQuery));
                        return true;
                    }
                }
            }
            let _ = board;
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::VirtualProcessors,
        weight: default_weight(ProbeId::VirtualProcessors),
        thunk: Box::new(|ctx, _board| {
            ctx.hypervisor_vendor_id.trim() == "Microsoft Hv" && ctx.logical_cores <= 2
        }),
    });

    probes.push(Probe {
        id: ProbeId::ProcessorNumber,
        weight: default_weight(ProbeId::ProcessorNumber),
        thunk: Box::new(|_ctx, _board| false),
    });

    probes.push(Probe {
        id: ProbeId::NumberOfCores,
        weight: default_weight(ProbeId::NumberOfCores),
        thunk: Box::new(|ctx, _board| ctx.logical_cores == 1),
    });

    probes.push(Probe {
        id: ProbeId::Audio,
        weight: default_weight(ProbeId::Audio),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_os = "windows")]
            {
                // A VM guest frequently has no audio endpoint at all
                // (no virtual sound device attached by default on several
                // hypervisors).
                return crate::platform::windows::enum_present_device_names()
                    .iter()
                    .all(|n| !n.to_lowercase().contains("audio"));
            }
            #[allow(unreachable_code)]
            false
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_windows_technique() {
        let mut probes = Vec::new();
        register(&mut probes);
        let expected = [
            ProbeId::Mssmbios,
            ProbeId::Firmware,
            ProbeId::DmiScan,
            ProbeId::SmbiosVmBit,
            ProbeId::NativeVhd,
            ProbeId::VirtualRegistry,
            ProbeId::DriverNames,
            ProbeId::DiskSerialNumber,
            ProbeId::PortConnectors,
            ProbeId::GpuVmStrings,
            ProbeId::GpuCapabilities,
            ProbeId::VmDevices,
            ProbeId::BadPools,
            ProbeId::AcpiTemperature,
            ProbeId::HypervQuery,
            ProbeId::VirtualProcessors,
            ProbeId::ProcessorNumber,
            ProbeId::NumberOfCores,
            ProbeId::Audio,
        ];
        for id in expected {
            assert!(probes.iter().any(|p| p.id == id), "{id:?} missing");
        }
    }
}
