// SPDX-License-Identifier: Apache-2.0

//! Probes reading CPUID directly: vendor/brand strings, the hypervisor
//! presence bit, and the hypervisor vendor id leaf.

use crate::brand::BrandId;
use crate::cpu::vendor_strings::brand_for_vendor_string;
use crate::hyperx::{arbitrate, HyperXEvidence, HyperXState};
use crate::platform::cpuid::hypervisor_leaf_range_present;
use crate::probe::{default_weight, Probe, ProbeContext, ProbeId};

/// Resolves the Hyper-V host/guest ambiguity for a probe that already found
/// the `Microsoft Hv` vendor string, and votes the brand the table
/// associates with the result. Returns whether the calling probe should
/// report itself as having fired: `ArtifactVm`/`UnknownVm` vote (or don't)
/// without counting toward the overall score, since the enlightenment
/// signature alone is not evidence of being a guest.
fn vote_hyperx(ctx: &ProbeContext, board: &mut crate::brand::Scoreboard, weight: u8) -> bool {
    let evidence = HyperXEvidence {
        enlightenment_signature: true,
        is_root_partition: ctx.hyperv_root_partition,
        hypervisor_max_leaf: ctx.hypervisor_max_leaf,
        leaf_0x4000_0001_vendor_contains_kvm: ctx.leaf_0x4000_0001_vendor.contains("KVM"),
    };
    match arbitrate(evidence) {
        HyperXState::RealVm => {
            board.vote(BrandId::HyperV, weight);
            true
        }
        HyperXState::Enlightenment => {
            board.vote(BrandId::KvmHyperv, weight);
            true
        }
        HyperXState::ArtifactVm => {
            board.vote(BrandId::HyperVArtifact, weight);
            false
        }
        HyperXState::UnknownVm => false,
    }
}

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::Vmid,
        weight: default_weight(ProbeId::Vmid),
        thunk: Box::new(|ctx, board| {
            let Some(brand) = brand_for_vendor_string(&ctx.hypervisor_vendor_id) else {
                return false;
            };
            if brand == BrandId::HyperV {
                return vote_hyperx(ctx, board, default_weight(ProbeId::Vmid));
            }
            board.vote(brand, default_weight(ProbeId::Vmid));
            true
        }),
    });

    probes.push(Probe {
        id: ProbeId::CpuBrand,
        weight: default_weight(ProbeId::CpuBrand),
        thunk: Box::new(|ctx, board| {
            let lower = ctx.brand_string.to_lowercase();
            let keywords: &[(&str, BrandId)] = &[
                ("virtualbox", BrandId::VirtualBox),
                ("vmware", BrandId::Vmware),
                ("qemu", BrandId::Qemu),
                ("kvm", BrandId::Kvm),
                ("hyper-v", BrandId::HyperV),
                ("parallels", BrandId::ParallelsDesktop),
                ("bhyve", BrandId::Bhyve),
            ];
            for (needle, brand) in keywords {
                if lower.contains(needle) {
                    board.vote(*brand, default_weight(ProbeId::CpuBrand));
                    return true;
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::HypervisorBit,
        weight: default_weight(ProbeId::HypervisorBit),
        thunk: Box::new(|ctx, board| {
            if !ctx.hypervisor_bit {
                return false;
            }
            if let Some(brand) = brand_for_vendor_string(&ctx.hypervisor_vendor_id) {
                if brand == BrandId::HyperV {
                    return vote_hyperx(ctx, board, default_weight(ProbeId::HypervisorBit));
                }
                board.vote(brand, default_weight(ProbeId::HypervisorBit));
            }
            true
        }),
    });

    probes.push(Probe {
        id: ProbeId::HypervisorStr,
        weight: default_weight(ProbeId::HypervisorStr),
        thunk: Box::new(|ctx, board| {
            let Some(brand) = brand_for_vendor_string(&ctx.hypervisor_vendor_id) else {
                return false;
            };
            if brand == BrandId::HyperV {
                return vote_hyperx(ctx, board, default_weight(ProbeId::HypervisorStr));
            }
            board.vote(brand, default_weight(ProbeId::HypervisorStr));
            true
        }),
    });

    probes.push(Probe {
        id: ProbeId::CpuidSignature,
        weight: default_weight(ProbeId::CpuidSignature),
        thunk: Box::new(|ctx, board| {
            if !ctx.hypervisor_bit || ctx.hypervisor_vendor_id.trim().is_empty() {
                return false;
            }
            let Some(brand) = brand_for_vendor_string(&ctx.hypervisor_vendor_id) else {
                return false;
            };
            if brand == BrandId::HyperV {
                return vote_hyperx(ctx, board, default_weight(ProbeId::CpuidSignature));
            }
            board.vote(brand, default_weight(ProbeId::CpuidSignature));
            true
        }),
    });

    probes.push(Probe {
        id: ProbeId::KvmBitmask,
        weight: default_weight(ProbeId::KvmBitmask),
        thunk: Box::new(|ctx, board| {
            let leaf = ctx.cpuid.read(0x4000_0000, 0);
            if leaf.eax >= 0x4000_0001 && ctx.hypervisor_vendor_id.trim() == "KVMKVMKVM" {
                board.vote(BrandId::Kvm, default_weight(ProbeId::KvmBitmask));
                return true;
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::KgtSignature,
        weight: default_weight(ProbeId::KgtSignature),
        thunk: Box::new(|ctx, board| {
            // Intel KGT (Trusty) signs leaf 3's ecx:edx with "EVMM"/"INTC"
            // rather than publishing a vendor string at leaf 0x4000_0000.
            let leaf = ctx.cpuid.read(0x3, 0);
            if leaf.ecx.to_le_bytes() == *b"EVMM" && leaf.edx.to_le_bytes() == *b"INTC" {
                board.vote(BrandId::IntelKgt, default_weight(ProbeId::KgtSignature));
                return true;
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::UnknownManufacturer,
        weight: default_weight(ProbeId::UnknownManufacturer),
        thunk: Box::new(|ctx, _board| {
            ctx.hypervisor_bit
                && hypervisor_leaf_range_present(ctx.cpuid)
                && brand_for_vendor_string(&ctx.hypervisor_vendor_id).is_none()
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::Scoreboard;
    use crate::platform::cpuid::{FixedCpuidSource, Leaves};
    use crate::probe::ProbeContext;

    fn vmware_source() -> FixedCpuidSource {
        FixedCpuidSource::new()
            .with_leaf(
                0x1,
                0,
                Leaves {
                    eax: 0,
                    ebx: 0,
                    ecx: 1 << 31,
                    edx: 0,
                },
            )
            .with_leaf(
                0x4000_0000,
                0,
                Leaves {
                    eax: 0x4000_0000,
                    ebx: u32::from_le_bytes(*b"VMwa"),
                    ecx: u32::from_le_bytes(*b"reVM"),
                    edx: u32::from_le_bytes(*b"ware"),
                },
            )
    }

    #[test]
    fn hypervisor_bit_probe_votes_vmware() {
        let source = vmware_source();
        let ctx = ProbeContext::gather(&source);
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::HypervisorBit).unwrap();
        assert!((probe.thunk)(&ctx, &mut board));
        assert!(board.points_for(BrandId::Vmware) > 0);
    }

    #[test]
    fn no_hypervisor_bit_means_no_vote() {
        let source = FixedCpuidSource::new();
        let ctx = ProbeContext::gather(&source);
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::HypervisorBit).unwrap();
        assert!(!(probe.thunk)(&ctx, &mut board));
    }
}
