// SPDX-License-Identifier: Apache-2.0

//! Brand identifiers, the per-query scoreboard, and the brand → category
//! classifier table.

use std::collections::HashMap;

/// Every product a probe can vote for. `Unknown` is the zero value returned
/// when no probe accumulated enough weight to name a brand; `Native` is
/// reserved for the explicit bare-metal verdict described by the conclusion
/// string builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum BrandId {
    VirtualBox,
    Vmware,
    VmwareExpress,
    KvmHyperv,
    Kvm,
    Qemu,
    HyperV,
    MicrosoftVirtualPc,
    Xen,
    ParallelsDesktop,
    Virtualbox,
    VirtualPcVhd,
    VirtualApple,
    Docker,
    Podman,
    Lxc,
    OpenVz,
    Wsl,
    AndroidEmulator,
    Bochs,
    Qnx,
    AppleVz,
    Anka,
    HyperVArtifact,
    Nsjail,
    Cuckoo,
    Sandboxie,
    Jailhouse,
    Bhyve,
    Intel,
    Acrn,
    IntelKgt,
    HyperPlatform,
    Nvmm,
    OpenBsdVmm,
    UnisysSpar,
    LockheedLmhs,
    Barevisor,
    MiniVisor,
    IntelTdx,
    Lkvm,
    Unknown,
}

/// Every concrete brand a probe can vote for, in declaration order. Used by
/// the aggregator to enumerate scoreboard candidates without requiring
/// `BrandId` to implement a full enum-iteration derive.
pub const ALL_BRANDS: &[BrandId] = &[
    BrandId::VirtualBox,
    BrandId::Vmware,
    BrandId::VmwareExpress,
    BrandId::KvmHyperv,
    BrandId::Kvm,
    BrandId::Qemu,
    BrandId::HyperV,
    BrandId::MicrosoftVirtualPc,
    BrandId::Xen,
    BrandId::ParallelsDesktop,
    BrandId::Virtualbox,
    BrandId::VirtualPcVhd,
    BrandId::VirtualApple,
    BrandId::Docker,
    BrandId::Podman,
    BrandId::Lxc,
    BrandId::OpenVz,
    BrandId::Wsl,
    BrandId::AndroidEmulator,
    BrandId::Bochs,
    BrandId::Qnx,
    BrandId::AppleVz,
    BrandId::Anka,
    BrandId::HyperVArtifact,
    BrandId::Nsjail,
    BrandId::Cuckoo,
    BrandId::Sandboxie,
    BrandId::Jailhouse,
    BrandId::Bhyve,
    BrandId::Intel,
    BrandId::Acrn,
    BrandId::IntelKgt,
    BrandId::HyperPlatform,
    BrandId::Nvmm,
    BrandId::OpenBsdVmm,
    BrandId::UnisysSpar,
    BrandId::LockheedLmhs,
    BrandId::Barevisor,
    BrandId::MiniVisor,
    BrandId::IntelTdx,
    BrandId::Lkvm,
    BrandId::Unknown,
];

impl BrandId {
    /// Human-facing brand name, returned by `crate::brand`.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::VirtualBox | Self::Virtualbox => "VirtualBox",
            Self::Vmware => "VMware",
            Self::VmwareExpress => "VMware Express",
            Self::KvmHyperv => "QEMU+KVM Hyper-V Enlightenment",
            Self::Kvm => "KVM",
            Self::Qemu => "QEMU",
            Self::HyperV => "Microsoft Hyper-V",
            Self::MicrosoftVirtualPc => "Microsoft Virtual PC",
            Self::Xen => "Xen HVM",
            Self::ParallelsDesktop => "Parallels",
            Self::VirtualPcVhd => "Virtual PC VHD",
            Self::VirtualApple => "Apple VZ",
            Self::Docker => "Docker",
            Self::Podman => "Podman",
            Self::Lxc => "LXC",
            Self::OpenVz => "OpenVZ",
            Self::Wsl => "Windows Subsystem for Linux",
            Self::AndroidEmulator => "Android Emulator",
            Self::Bochs => "Bochs",
            Self::Qnx => "QNX Hypervisor",
            Self::AppleVz => "Apple Virtualization.framework",
            Self::Anka => "Veertu Anka",
            Self::HyperVArtifact => "Hyper-V artifact (not an actual VM)",
            Self::Nsjail => "nsjail",
            Self::Cuckoo => "Cuckoo Sandbox",
            Self::Sandboxie => "Sandboxie",
            Self::Jailhouse => "Jailhouse",
            Self::Bhyve => "bhyve",
            Self::Intel => "Intel HAXM",
            Self::Acrn => "ACRN",
            Self::IntelKgt => "Intel KGT (Trusty)",
            Self::HyperPlatform => "HyperPlatform",
            Self::Nvmm => "NVMM",
            Self::OpenBsdVmm => "OpenBSD VMM",
            Self::UnisysSpar => "Unisys s-Par",
            Self::LockheedLmhs => "Lockheed-Martin LMHS",
            Self::Barevisor => "Barevisor",
            Self::MiniVisor => "MiniVisor",
            Self::IntelTdx => "Intel TDX",
            Self::Lkvm => "LKVM",
            Self::Unknown => "Unknown",
        }
    }

    /// Classification bucket used by `crate::type_of`, mirroring the type
    /// classifier table.
    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            Self::VirtualBox
            | Self::Virtualbox
            | Self::Vmware
            | Self::VmwareExpress
            | Self::Kvm
            | Self::KvmHyperv
            | Self::Qemu
            | Self::HyperV
            | Self::MicrosoftVirtualPc
            | Self::Xen
            | Self::ParallelsDesktop
            | Self::VirtualPcVhd
            | Self::Bochs
            | Self::Jailhouse
            | Self::Bhyve
            | Self::Acrn
            | Self::IntelKgt
            | Self::HyperPlatform
            | Self::Nvmm
            | Self::OpenBsdVmm
            | Self::UnisysSpar
            | Self::LockheedLmhs
            | Self::Barevisor
            | Self::MiniVisor
            | Self::IntelTdx
            | Self::Lkvm => "VM",
            Self::VirtualApple | Self::AppleVz | Self::Anka => "Hypervisor",
            Self::Docker | Self::Podman | Self::Lxc | Self::OpenVz | Self::Wsl => "Container",
            Self::AndroidEmulator | Self::Qnx | Self::Intel => "Emulator",
            Self::HyperVArtifact => "Hypervisor",
            Self::Nsjail | Self::Cuckoo | Self::Sandboxie => "Sandbox",
            Self::Unknown => "Unknown",
        }
    }
}

/// Per-query accumulator: every probe that fires adds its weight to one or
/// more brand slots here before the aggregator picks the winner(s).
///
/// A probe votes for a brand with [`Scoreboard::vote`]; probes sharing a
/// correlation group (the GPU-string/GPU-capability pair is the only
/// built-in example) use [`Scoreboard::merge_group`] to suppress
/// double-counting when both fire for the same brand in the same query.
#[derive(Debug, Default)]
pub struct Scoreboard {
    points: HashMap<BrandId, u32>,
    fired_groups: std::collections::HashSet<&'static str>,
}

impl Scoreboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` points to `brand`'s running total.
    pub fn vote(&mut self, brand: BrandId, weight: u8) {
        *self.points.entry(brand).or_insert(0) += u32::from(weight);
    }

    /// Adds `weight` points to `brand` only if `group` has not already fired
    /// in this query; returns whether the vote was applied. Used to merge
    /// correlated probes (e.g. `GPU_VM_STRINGS` and `GPU_CAPABILITIES`) so a
    /// single underlying signal is not counted twice.
    pub fn vote_once_per_group(&mut self, group: &'static str, brand: BrandId, weight: u8) -> bool {
        if self.fired_groups.contains(group) {
            return false;
        }
        self.fired_groups.insert(group);
        self.vote(brand, weight);
        true
    }

    /// The total number of points accumulated across every brand, used for
    /// the overall boolean verdict and percentage.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.points.values().sum()
    }

    /// Returns the highest-scoring brand(s). More than one entry means a
    /// tie; the aggregator decides whether to report all of them (the
    /// `MULTIPLE` setting) or just the first in [`BrandId`] declaration
    /// order.
    #[must_use]
    pub fn leaders(&self) -> Vec<BrandId> {
        let Some(&max) = self.points.values().max() else {
            return Vec::new();
        };
        if max == 0 {
            return Vec::new();
        }
        let mut leaders: Vec<BrandId> = self
            .points
            .iter()
            .filter(|(_, &points)| points == max)
            .map(|(&brand, _)| brand)
            .collect();
        leaders.sort();
        leaders
    }

    /// Raw per-brand tally, exposed for tests and debugging.
    #[must_use]
    pub fn points_for(&self, brand: BrandId) -> u32 {
        self.points.get(&brand).copied().unwrap_or(0)
    }
}
