// SPDX-License-Identifier: Apache-2.0

//! MAC address vendor-prefix (OUI) table for hypervisors that assign
//! virtual NICs from a registered block, keyed by the first three octets in
//! `XX:XX:XX` form (uppercase hex).

use crate::brand::BrandId;

pub static VM_OUIS: phf::Map<&'static str, BrandId> = phf::phf_map! {
    "00:05:69" => BrandId::Vmware,
    "00:0C:29" => BrandId::Vmware,
    "00:1C:14" => BrandId::Vmware,
    "00:50:56" => BrandId::Vmware,
    "08:00:27" => BrandId::VirtualBox,
    "0A:00:27" => BrandId::VirtualBox,
    "00:03:FF" => BrandId::HyperV,
    "00:1C:42" => BrandId::ParallelsDesktop,
    "00:16:3E" => BrandId::Xen,
    "52:54:00" => BrandId::Qemu,
};

/// Resolves a brand from the first three octets of a MAC address. `prefix`
/// must already be normalized to uppercase `XX:XX:XX`.
#[must_use]
pub fn brand_for_oui(prefix: &str) -> Option<BrandId> {
    VM_OUIS.get(prefix).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_vbox_oui() {
        assert_eq!(brand_for_oui("08:00:27"), Some(BrandId::VirtualBox));
    }

    #[test]
    fn unrecognized_oui_is_none() {
        assert_eq!(brand_for_oui("AA:BB:CC"), None);
    }
}
