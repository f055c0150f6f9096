// SPDX-License-Identifier: Apache-2.0

//! Hyper-V host-vs-guest arbitration ("Hyper-X").
//!
//! Microsoft's Hyper-V leaves its enlightenment signature
//! (`Microsoft Hv`) in CPUID on both the *host* running Hyper-V and any
//! *guest* it hosts, so a raw hypervisor-bit/vendor-string match alone
//! cannot tell which side of the fence the current process runs on. This
//! module resolves that ambiguity from a handful of corroborating signals
//! collected once per query and cached (see [`crate::cache::Cache`]).

/// Resolution of the host/guest ambiguity left by a bare Hyper-V CPUID
/// signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HyperXState {
    /// A non-root (child) partition reporting the full Hyper-V leaf range:
    /// a genuine Hyper-V guest.
    RealVm,
    /// A root partition whose leaf 0x4000_0001 vendor string names KVM: a
    /// nested QEMU+KVM guest exposing Hyper-V-compatible enlightenments to
    /// its own guests.
    Enlightenment,
    /// A root partition with no KVM vendor string at leaf 0x4000_0001: this
    /// is the Hyper-V host itself, not a VM.
    ArtifactVm,
    /// Either the enlightenment signature is absent, or this is a non-root
    /// partition reporting a hypervisor leaf range other than Hyper-V's
    /// standard 11-leaf span.
    UnknownVm,
}

/// Evidence the arbitration table is keyed on, gathered once per query from
/// [`crate::probe::ProbeContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HyperXEvidence {
    /// `HYPERVISOR_BIT` found the `Microsoft Hv` enlightenment signature.
    pub enlightenment_signature: bool,
    /// Leaf 0x4000_0003 `ebx` bit 0: this partition is Hyper-V's root
    /// partition (the host), not a child/guest partition.
    pub is_root_partition: bool,
    /// `eax` of leaf 0x4000_0000: the highest hypervisor leaf reported.
    pub hypervisor_max_leaf: u32,
    /// Leaf 0x4000_0001's `ebx:ecx:edx` vendor string contains `KVM`.
    pub leaf_0x4000_0001_vendor_contains_kvm: bool,
}

/// Arbitrates Hyper-V host-vs-guest ambiguity from already-collected
/// evidence, per the root-partition/max-leaf/vendor-string decision table.
#[must_use]
pub fn arbitrate(evidence: HyperXEvidence) -> HyperXState {
    if !evidence.enlightenment_signature {
        return HyperXState::UnknownVm;
    }
    if !evidence.is_root_partition {
        return if evidence.hypervisor_max_leaf == 11 {
            HyperXState::RealVm
        } else {
            HyperXState::UnknownVm
        };
    }
    if evidence.leaf_0x4000_0001_vendor_contains_kvm {
        HyperXState::Enlightenment
    } else {
        HyperXState::ArtifactVm
    }
}
