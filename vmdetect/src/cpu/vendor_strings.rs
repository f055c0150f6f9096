// SPDX-License-Identifier: Apache-2.0

//! Hypervisor vendor identification strings, as reported in CPUID leaf
//! `0x4000_0000`'s `ebx:ecx:edx` registers, mapped to the brand that
//! registered each one.

use crate::brand::BrandId;

/// Hypervisor vendor id string → brand, for vendors that publish a fixed,
/// fully-padded 12-byte string. `registers_to_ascii` already strips the
/// trailing NULs some vendors pad with (`Jailhouse`, `Barevisor!`,
/// `MiniVisor`), so those keys are listed here at their stripped length
/// rather than the padded length CPUID actually returns.
pub static HYPERVISOR_VENDOR_STRINGS: phf::Map<&'static str, BrandId> = phf::phf_map! {
    "bhyve bhyve " => BrandId::Bhyve,
    "BHyVE BHyVE " => BrandId::Bhyve,
    "TCGTCGTCGTCG" => BrandId::Qemu,
    "Microsoft Hv" => BrandId::HyperV,
    "Linux KVM Hv" => BrandId::KvmHyperv,
    "VMwareVMware" => BrandId::Vmware,
    "VBoxVBoxVBox" => BrandId::VirtualBox,
    "XenVMMXenVMM" => BrandId::Xen,
    " prl hyperv " => BrandId::ParallelsDesktop,
    " lrpepyh  vr" => BrandId::ParallelsDesktop,
    "ACRNACRNACRN" => BrandId::Acrn,
    " QNXQVMBSQG " => BrandId::Qnx,
    "___ NVMM ___" => BrandId::Nvmm,
    "OpenBSDVMM58" => BrandId::OpenBsdVmm,
    "HAXMHAXMHAXM" => BrandId::Intel,
    "UnisysSpar64" => BrandId::UnisysSpar,
    "SRESRESRESRE" => BrandId::LockheedLmhs,
    "Jailhouse" => BrandId::Jailhouse,
    "EVMMEVMMEVMM" => BrandId::IntelKgt,
    "Barevisor!" => BrandId::Barevisor,
    "MiniVisor" => BrandId::MiniVisor,
    "IntelTDX    " => BrandId::IntelTdx,
    "LKVMLKVMLKVM" => BrandId::Lkvm,
};

/// Vendor strings matched by substring rather than exact value: sandboxes and
/// nested hosts mangle or truncate these rather than publishing the exact
/// 12-byte id, so an exact-map lookup would never fire on real hardware.
/// Checked only after [`HYPERVISOR_VENDOR_STRINGS`] misses, so the unrelated
/// exact `Linux KVM Hv` entry (which also contains `KVM`) is never shadowed
/// by the bare `KVM` fallback below.
const SUBSTRING_MATCHES: &[(&str, BrandId)] = &[
    ("QXNQSBMV", BrandId::Qnx),
    ("Apple VZ", BrandId::VirtualApple),
    ("PpyH", BrandId::HyperPlatform),
    ("KVM", BrandId::Kvm),
];

/// Looks up a hypervisor vendor id string read from CPUID leaf
/// `0x4000_0000` (or the companion leaves `0x4000_0001`/`0x4000_0100` some
/// probes read for cross-checks). Tries an exact match first, then falls
/// back to the substring table for vendors known to mangle their id.
#[must_use]
pub fn brand_for_vendor_string(vendor: &str) -> Option<BrandId> {
    if let Some(&brand) = HYPERVISOR_VENDOR_STRINGS.get(vendor) {
        return Some(brand);
    }
    SUBSTRING_MATCHES
        .iter()
        .find(|(needle, _)| vendor.contains(needle))
        .map(|&(_, brand)| brand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_vmware() {
        assert_eq!(brand_for_vendor_string("VMwareVMware"), Some(BrandId::Vmware));
    }

    #[test]
    fn unrecognized_string_is_none() {
        assert_eq!(brand_for_vendor_string("NotARealVendor"), None);
    }

    #[test]
    fn every_entry_round_trips_through_the_map() {
        for (&vendor, &brand) in HYPERVISOR_VENDOR_STRINGS.entries() {
            assert_eq!(brand_for_vendor_string(vendor), Some(brand));
        }
    }

    #[test]
    fn bare_kvm_id_matches_by_substring() {
        assert_eq!(brand_for_vendor_string("KVMKVMKVM"), Some(BrandId::Kvm));
    }

    #[test]
    fn linux_kvm_hv_is_not_shadowed_by_the_bare_kvm_substring() {
        assert_eq!(brand_for_vendor_string("Linux KVM Hv"), Some(BrandId::KvmHyperv));
    }

    #[test]
    fn apple_vz_matches_by_substring() {
        assert_eq!(brand_for_vendor_string("Apple VZ Hypervisor"), Some(BrandId::VirtualApple));
    }

    #[test]
    fn qnx_truncated_variant_matches_by_substring() {
        assert_eq!(brand_for_vendor_string("QXNQSBMV"), Some(BrandId::Qnx));
    }

    #[test]
    fn hyperplatform_matches_by_substring() {
        assert_eq!(brand_for_vendor_string("xxxPpyHxxx"), Some(BrandId::HyperPlatform));
    }
}
