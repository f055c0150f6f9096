// SPDX-License-Identifier: Apache-2.0

//! The probe registry: identifiers, weights, and the ordered table of
//! built-in checks.

pub mod command_probes;
pub mod cpuid_probes;
pub mod fs_probes;
pub mod instruction_probes;
pub mod misc_probes;
pub mod registry_probes;
pub mod thread_probes;
pub mod timing_probe;
pub mod windows_probes;

use crate::brand::Scoreboard;
use crate::platform::cpuid::CpuidSource;

/// Facts gathered once per query and handed to every probe thunk, so each
/// probe doesn't re-read CPUID or re-spawn `nproc` independently.
pub struct ProbeContext<'a> {
    pub cpuid: &'a dyn CpuidSource,
    pub vendor_id: String,
    pub brand_string: String,
    pub hypervisor_bit: bool,
    pub hypervisor_vendor_id: String,
    /// `eax` of leaf 0x4000_0000: the highest hypervisor leaf reported
    /// supported. Zero unless `hypervisor_bit` is set.
    pub hypervisor_max_leaf: u32,
    /// Leaf 0x4000_0003 `ebx` bit 0: this partition is Hyper-V's root
    /// partition (the host) rather than a guest. Meaningless unless
    /// `hypervisor_bit` is set and the vendor at leaf 0x4000_0000 is
    /// `Microsoft Hv`, but read unconditionally alongside the other
    /// hypervisor leaves since a non-Hyper-V monitor simply reports zero.
    pub hyperv_root_partition: bool,
    /// Leaf 0x4000_0001's `ebx:ecx:edx` vendor string, distinct from that
    /// leaf's `eax` (the `cpuid_signature` probe's interface signature).
    pub leaf_0x4000_0001_vendor: String,
    pub logical_cores: usize,
    pub is_admin: bool,
}

impl<'a> ProbeContext<'a> {
    #[must_use]
    pub fn gather(cpuid: &'a dyn CpuidSource) -> Self {
        let hypervisor_bit = cpuid.supported() && crate::platform::cpuid::hypervisor_bit(cpuid);
        let (hypervisor_vendor_id, hypervisor_max_leaf, hyperv_root_partition, leaf_0x4000_0001_vendor) =
            if hypervisor_bit {
                (
                    crate::platform::cpuid::hypervisor_vendor_id(cpuid),
                    crate::platform::cpuid::hypervisor_max_leaf(cpuid),
                    crate::platform::cpuid::hyperv_root_partition(cpuid),
                    crate::platform::cpuid::leaf_0x4000_0001_vendor_id(cpuid),
                )
            } else {
                (String::new(), 0, false, String::new())
            };
        Self {
            vendor_id: if cpuid.supported() {
                crate::platform::cpuid::vendor_id(cpuid)
            } else {
                String::new()
            },
            brand_string: if cpuid.supported() {
                crate::platform::cpuid::brand_string(cpuid)
            } else {
                String::new()
            },
            hypervisor_bit,
            hypervisor_vendor_id,
            hypervisor_max_leaf,
            hyperv_root_partition,
            leaf_0x4000_0001_vendor,
            logical_cores: crate::cpu::logical_core_count(),
            is_admin: crate::platform::admin::is_admin(),
            cpuid,
        }
    }
}

/// A dense identifier for every built-in probe plus the reserved range used
/// for flags and settings.
///
/// The enum is split into three contiguous sub-ranges: techniques (the
/// probes themselves), aggregate flags (`Default`/`All`/`NullArg`), and
/// settings (`NoMemo`, `HighThreshold`, `Dynamic`, `Multiple`). A settings
/// identifier must never be handed to [`crate::Engine::check`];
/// [`crate::options`] enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
#[non_exhaustive]
pub enum ProbeId {
    // --- CPUID probes ---
    Vmid,
    CpuBrand,
    HypervisorBit,
    HypervisorStr,
    CpuidSignature,
    KvmBitmask,
    KgtSignature,

    // --- Instruction probes ---
    Sidt,
    Sgdt,
    Sldt,
    Smsw,
    VpcInvalid,
    VmwareBackdoor,
    VmwarePortMemory,
    VmwareStr,
    Osxsave,

    // --- Timing probe ---
    Timer,

    // --- Thread-count probes ---
    ThreadCount,
    OddCpuThreads,
    IntelThreadMismatch,
    XeonThreadMismatch,
    AmdThreadMismatch,

    // --- Filesystem probes ---
    Dockerenv,
    PodmanFile,
    HypervisorDir,
    VboxModule,
    DeviceTree,
    QemuVirtualDmi,
    QemuUsb,
    SysQemuDir,
    VmwareIomem,
    VmwareIoports,
    VmwareScsi,
    SysinfoProc,
    WslProc,
    FileAccessHistory,
    VmFiles,

    // --- Command-output probes ---
    SystemdVirt,
    Dmidecode,
    Dmesg,
    LshwQemu,
    IoregGrep,
    MacSip,
    Hwmodel,
    HwMemsize,

    // --- Platform-table probes (Windows) ---
    Mssmbios,
    Firmware,
    DmiScan,
    SmbiosVmBit,
    NativeVhd,
    VirtualRegistry,

    // --- Device/driver probes (Windows) ---
    DriverNames,
    DiskSerialNumber,
    PortConnectors,
    GpuVmStrings,
    GpuCapabilities,
    VmDevices,
    BadPools,
    AcpiTemperature,
    HypervQuery,
    VirtualProcessors,
    ProcessorNumber,
    NumberOfCores,
    Audio,

    // --- Registry probes (Windows) ---
    RegistryKey,
    HklmRegistries,

    // --- Miscellaneous probes ---
    MacAddressCheck,
    HypervHostname,
    GeneralHostname,
    DllCheck,
    Mutex,
    CuckooDir,
    CuckooPipe,
    DeviceString,
    NsjailPid,
    Lspci,
    AmdSev,
    UnknownManufacturer,

    // --- Aggregate flags ---
    /// All built-in techniques except the opt-in [`ProbeId::Dmesg`] probe
    /// (`VMWARE_DMESG`'s stable flag name).
    Default,
    /// Every built-in technique, including opt-ins.
    All,
    /// Sentinel for "no argument supplied"; never set in a real
    /// [`crate::options::EnabledSet`].
    NullArg,

    // --- Settings ---
    /// Disable memoization: every query re-runs every probe.
    NoMemo,
    /// Raise the detection threshold from 150 to 300.
    HighThreshold,
    /// Return a graded 0-99 percentage below the threshold instead of a flat
    /// 0/100.
    Dynamic,
    /// Return every tied top brand, joined by `" or "`, instead of one.
    Multiple,
}

impl ProbeId {
    /// First technique variant, used to bound the technique sub-range.
    const FIRST_TECHNIQUE: Self = Self::Vmid;
    /// Last technique variant, used to bound the technique sub-range.
    const LAST_TECHNIQUE: Self = Self::UnknownManufacturer;

    /// All built-in technique ids, in registration order.
    pub const TECHNIQUES: &'static [ProbeId] = &[
        Self::Vmid,
        Self::CpuBrand,
        Self::HypervisorBit,
        Self::HypervisorStr,
        Self::CpuidSignature,
        Self::KvmBitmask,
        Self::KgtSignature,
        Self::Sidt,
        Self::Sgdt,
        Self::Sldt,
        Self::Smsw,
        Self::VpcInvalid,
        Self::VmwareBackdoor,
        Self::VmwarePortMemory,
        Self::VmwareStr,
        Self::Osxsave,
        Self::Timer,
        Self::ThreadCount,
        Self::OddCpuThreads,
        Self::IntelThreadMismatch,
        Self::XeonThreadMismatch,
        Self::AmdThreadMismatch,
        Self::Dockerenv,
        Self::PodmanFile,
        Self::HypervisorDir,
        Self::VboxModule,
        Self::DeviceTree,
        Self::QemuVirtualDmi,
        Self::QemuUsb,
        Self::SysQemuDir,
        Self::VmwareIomem,
        Self::VmwareIoports,
        Self::VmwareScsi,
        Self::SysinfoProc,
        Self::WslProc,
        Self::FileAccessHistory,
        Self::VmFiles,
        Self::SystemdVirt,
        Self::Dmidecode,
        Self::Dmesg,
        Self::LshwQemu,
        Self::IoregGrep,
        Self::MacSip,
        Self::Hwmodel,
        Self::HwMemsize,
        Self::Mssmbios,
        Self::Firmware,
        Self::DmiScan,
        Self::SmbiosVmBit,
        Self::NativeVhd,
        Self::VirtualRegistry,
        Self::DriverNames,
        Self::DiskSerialNumber,
        Self::PortConnectors,
        Self::GpuVmStrings,
        Self::GpuCapabilities,
        Self::VmDevices,
        Self::BadPools,
        Self::AcpiTemperature,
        Self::HypervQuery,
        Self::VirtualProcessors,
        Self::ProcessorNumber,
        Self::NumberOfCores,
        Self::Audio,
        Self::RegistryKey,
        Self::HklmRegistries,
        Self::MacAddressCheck,
        Self::HypervHostname,
        Self::GeneralHostname,
        Self::DllCheck,
        Self::Mutex,
        Self::CuckooDir,
        Self::CuckooPipe,
        Self::DeviceString,
        Self::NsjailPid,
        Self::Lspci,
        Self::AmdSev,
        Self::UnknownManufacturer,
    ];

    /// True for the four `settings` identifiers: `NO_MEMO`, `HIGH_THRESHOLD`,
    /// `DYNAMIC`, `MULTIPLE`.
    #[must_use]
    pub fn is_setting(self) -> bool {
        matches!(
            self,
            Self::NoMemo | Self::HighThreshold | Self::Dynamic | Self::Multiple
        )
    }

    /// True for the three aggregate identifiers: `DEFAULT`, `ALL`,
    /// `NULL_ARG`.
    #[must_use]
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::Default | Self::All | Self::NullArg)
    }

    /// True for a concrete technique (one of the ~78 built-in probes).
    #[must_use]
    pub fn is_technique(self) -> bool {
        (Self::FIRST_TECHNIQUE as u16..=Self::LAST_TECHNIQUE as u16).contains(&(self as u16))
    }

    /// Stable identifier name, used for flag arguments and round-tripped by
    /// [`ProbeId::from_flag_string`].
    #[must_use]
    pub fn flag_to_string(self) -> &'static str {
        match self {
            Self::Vmid => "VMID",
            Self::CpuBrand => "CPU_BRAND",
            Self::HypervisorBit => "HYPERVISOR_BIT",
            Self::HypervisorStr => "HYPERVISOR_STR",
            Self::CpuidSignature => "CPUID_SIGNATURE",
            Self::KvmBitmask => "KVM_BITMASK",
            Self::KgtSignature => "KGT_SIGNATURE",
            Self::Sidt => "SIDT",
            Self::Sgdt => "SGDT",
            Self::Sldt => "SLDT",
            Self::Smsw => "SMSW",
            Self::VpcInvalid => "VPC_INVALID",
            Self::VmwareBackdoor => "VMWARE_BACKDOOR",
            Self::VmwarePortMemory => "VMWARE_PORT_MEM",
            Self::VmwareStr => "VMWARE_STR",
            Self::Osxsave => "OSXSAVE",
            Self::Timer => "TIMER",
            Self::ThreadCount => "THREAD_COUNT",
            Self::OddCpuThreads => "ODD_CPU_THREADS",
            Self::IntelThreadMismatch => "INTEL_THREAD_MISMATCH",
            Self::XeonThreadMismatch => "XEON_THREAD_MISMATCH",
            Self::AmdThreadMismatch => "AMD_THREAD_MISMATCH",
            Self::Dockerenv => "DOCKERENV",
            Self::PodmanFile => "PODMAN_FILE",
            Self::HypervisorDir => "HYPERVISOR_DIR",
            Self::VboxModule => "VBOX_MODULE",
            Self::DeviceTree => "DEVICE_TREE",
            Self::QemuVirtualDmi => "QEMU_VIRTUAL_DMI",
            Self::QemuUsb => "QEMU_USB",
            Self::SysQemuDir => "SYS_QEMU_DIR",
            Self::VmwareIomem => "VMWARE_IOMEM",
            Self::VmwareIoports => "VMWARE_IOPORTS",
            Self::VmwareScsi => "VMWARE_SCSI",
            Self::SysinfoProc => "SYSINFO_PROC",
            Self::WslProc => "WSL_PROC",
            Self::FileAccessHistory => "FILE_ACCESS_HISTORY",
            Self::VmFiles => "VM_FILES",
            Self::SystemdVirt => "SYSTEMD_VIRT",
            Self::Dmidecode => "DMIDECODE",
            Self::Dmesg => "VMWARE_DMESG",
            Self::LshwQemu => "LSHW_QEMU",
            Self::IoregGrep => "IOREG_GREP",
            Self::MacSip => "MAC_SIP",
            Self::Hwmodel => "HWMODEL",
            Self::HwMemsize => "HW_MEMSIZE",
            Self::Mssmbios => "MSSMBIOS",
            Self::Firmware => "FIRMWARE",
            Self::DmiScan => "DMI_SCAN",
            Self::SmbiosVmBit => "SMBIOS_VM_BIT",
            Self::NativeVhd => "NATIVE_VHD",
            Self::VirtualRegistry => "VIRTUAL_REGISTRY",
            Self::DriverNames => "DRIVER_NAMES",
            Self::DiskSerialNumber => "DISK_SERIAL_NUMBER",
            Self::PortConnectors => "PORT_CONNECTORS",
            Self::GpuVmStrings => "GPU_VM_STRINGS",
            Self::GpuCapabilities => "GPU_CAPABILITIES",
            Self::VmDevices => "VM_DEVICES",
            Self::BadPools => "BAD_POOLS",
            Self::AcpiTemperature => "ACPI_TEMPERATURE",
            Self::HypervQuery => "HYPERV_QUERY",
            Self::VirtualProcessors => "VIRTUAL_PROCESSORS",
            Self::ProcessorNumber => "PROCESSOR_NUMBER",
            Self::NumberOfCores => "NUMBER_OF_CORES",
            Self::Audio => "AUDIO",
            Self::RegistryKey => "REGISTRY_KEY",
            Self::HklmRegistries => "HKLM_REGISTRIES",
            Self::MacAddressCheck => "MAC_ADDRESS_CHECK",
            Self::HypervHostname => "HYPERV_HOSTNAME",
            Self::GeneralHostname => "GENERAL_HOSTNAME",
            Self::DllCheck => "DLL_CHECK",
            Self::Mutex => "MUTEX",
            Self::CuckooDir => "CUCKOO_DIR",
            Self::CuckooPipe => "CUCKOO_PIPE",
            Self::DeviceString => "DEVICE_STRING",
            Self::NsjailPid => "NSJAIL_PID",
            Self::Lspci => "LSPCI",
            Self::AmdSev => "AMD_SEV",
            Self::UnknownManufacturer => "UNKNOWN_MANUFACTURER",
            Self::Default => "DEFAULT",
            Self::All => "ALL",
            Self::NullArg => "NULL_ARG",
            Self::NoMemo => "NO_MEMO",
            Self::HighThreshold => "HIGH_THRESHOLD",
            Self::Dynamic => "DYNAMIC",
            Self::Multiple => "MULTIPLE",
        }
    }

    /// Parses a stable identifier name back into a [`ProbeId`]. Round-trips
    /// with [`ProbeId::flag_to_string`] for every variant.
    #[must_use]
    pub fn from_flag_string(name: &str) -> Option<Self> {
        Self::TECHNIQUES
            .iter()
            .copied()
            .chain([Self::Default, Self::All, Self::NullArg])
            .chain([Self::NoMemo, Self::HighThreshold, Self::Dynamic, Self::Multiple])
            .find(|id| id.flag_to_string() == name)
    }
}

/// The default weight contributed to the global score when a probe's thunk
/// returns `true`. Declared once here so the registry table below stays the
/// single source of truth for every built-in probe's weight.
#[must_use]
pub fn default_weight(id: ProbeId) -> u8 {
    use ProbeId::*;
    match id {
        Vmid => 90,
        CpuBrand => 50,
        HypervisorBit => 95,
        HypervisorStr => 45,
        CpuidSignature => 95,
        KvmBitmask => 40,
        KgtSignature => 80,

        Sidt => 65,
        Sgdt => 40,
        Sldt => 55,
        Smsw => 30,
        VpcInvalid => 15,
        VmwareBackdoor => 100,
        VmwarePortMemory => 85,
        VmwareStr => 35,
        Osxsave => 20,

        Timer => 45,

        ThreadCount => 35,
        OddCpuThreads => 40,
        IntelThreadMismatch => 95,
        XeonThreadMismatch => 95,
        AmdThreadMismatch => 95,

        Dockerenv => 55,
        PodmanFile => 55,
        HypervisorDir => 45,
        VboxModule => 50,
        DeviceTree => 50,
        QemuVirtualDmi => 40,
        QemuUsb => 35,
        SysQemuDir => 45,
        VmwareIomem => 60,
        VmwareIoports => 60,
        VmwareScsi => 40,
        SysinfoProc => 35,
        WslProc => 40,
        FileAccessHistory => 5,
        VmFiles => 20,

        SystemdVirt => 70,
        Dmidecode => 55,
        Dmesg => 35,
        LshwQemu => 55,
        IoregGrep => 65,
        MacSip => 40,
        Hwmodel => 80,
        HwMemsize => 35,

        Mssmbios => 100,
        Firmware => 75,
        DmiScan => 65,
        SmbiosVmBit => 50,
        NativeVhd => 55,
        VirtualRegistry => 65,

        DriverNames => 100,
        DiskSerialNumber => 60,
        PortConnectors => 25,
        GpuVmStrings => 100,
        GpuCapabilities => 100,
        VmDevices => 60,
        BadPools => 80,
        AcpiTemperature => 35,
        HypervQuery => 45,
        VirtualProcessors => 65,
        ProcessorNumber => 30,
        NumberOfCores => 40,
        Audio => 35,

        RegistryKey => 50,
        HklmRegistries => 50,

        MacAddressCheck => 60,
        HypervHostname => 60,
        GeneralHostname => 35,
        DllCheck => 40,
        Mutex => 40,
        CuckooDir => 30,
        CuckooPipe => 30,
        DeviceString => 25,
        NsjailPid => 40,
        Lspci => 60,
        AmdSev => 50,
        UnknownManufacturer => 40,

        Default | All | NullArg | NoMemo | HighThreshold | Dynamic | Multiple => 0,
    }
}

/// A single probe: a stable id, its point weight, and the thunk invoked to
/// produce a signal. `weight` never exceeds 100 (enforced for custom probes
/// in [`crate::Engine::add_custom`]; built-in weights are compile-time
/// constants and are asserted against this bound in tests).
pub struct Probe {
    pub id: ProbeId,
    pub weight: u8,
    pub thunk: Box<dyn Fn(&ProbeContext, &mut Scoreboard) -> bool + Send + Sync>,
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Builds the ordered table of built-in probes. Called once per
/// [`crate::Engine::new`]; user probes registered via
/// [`crate::Engine::add_custom`] are appended separately and run after this
/// table, per the aggregation order.
#[must_use]
pub fn builtin_registry() -> Vec<Probe> {
    let mut probes = Vec::with_capacity(ProbeId::TECHNIQUES.len());
    cpuid_probes::register(&mut probes);
    instruction_probes::register(&mut probes);
    timing_probe::register(&mut probes);
    thread_probes::register(&mut probes);
    fs_probes::register(&mut probes);
    command_probes::register(&mut probes);
    windows_probes::register(&mut probes);
    registry_probes::register(&mut probes);
    misc_probes::register(&mut probes);
    probes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_to_string_round_trips() {
        for id in ProbeId::TECHNIQUES
            .iter()
            .copied()
            .chain([ProbeId::Default, ProbeId::All, ProbeId::NullArg])
            .chain([
                ProbeId::NoMemo,
                ProbeId::HighThreshold,
                ProbeId::Dynamic,
                ProbeId::Multiple,
            ])
        {
            let s = id.flag_to_string();
            assert_eq!(ProbeId::from_flag_string(s), Some(id), "failed for {id:?}");
        }
    }

    #[test]
    fn technique_weights_never_exceed_100() {
        for id in ProbeId::TECHNIQUES.iter().copied() {
            assert!(default_weight(id) <= 100, "{id:?} exceeds max weight");
        }
    }

    #[test]
    fn settings_and_aggregates_are_disjoint_from_techniques() {
        for id in [ProbeId::Default, ProbeId::All, ProbeId::NullArg] {
            assert!(id.is_aggregate());
            assert!(!id.is_technique());
        }
        for id in [
            ProbeId::NoMemo,
            ProbeId::HighThreshold,
            ProbeId::Dynamic,
            ProbeId::Multiple,
        ] {
            assert!(id.is_setting());
            assert!(!id.is_technique());
        }
    }

    #[test]
    fn builtin_registry_has_one_probe_per_technique() {
        let probes = builtin_registry();
        assert_eq!(probes.len(), ProbeId::TECHNIQUES.len());
        let mut seen: Vec<ProbeId> = probes.iter().map(|p| p.id).collect();
        seen.sort();
        let mut expected: Vec<ProbeId> = ProbeId::TECHNIQUES.to_vec();
        expected.sort();
        assert_eq!(seen, expected);
    }
}
