// SPDX-License-Identifier: Apache-2.0

//! Four-byte Windows kernel pool tags left behind by VM guest-integration
//! drivers, scanned for via [`crate::platform::windows::pool_tags_present`].
//! Tags are stored in the byte order they appear in the pool tag table
//! (i.e. as written in the driver source, not reversed).

use crate::brand::BrandId;

pub static VM_POOL_TAGS: &[(&[u8; 4], BrandId)] = &[
    (b"VBox", BrandId::VirtualBox),
    (b"VBHD", BrandId::VirtualBox),
    (b"VMMD", BrandId::Vmware),
    (b"vm3d", BrandId::Vmware),
    (b"VPCD", BrandId::MicrosoftVirtualPc),
    (b"VMBS", BrandId::HyperV),
];

/// All known tags, for a single `pool_tags_present` call that tests every
/// brand at once.
#[must_use]
pub fn all_tags() -> Vec<[u8; 4]> {
    VM_POOL_TAGS.iter().map(|(tag, _)| **tag).collect()
}

/// Resolves the brand a specific tag belongs to.
#[must_use]
pub fn brand_for_tag(tag: &[u8; 4]) -> Option<BrandId> {
    VM_POOL_TAGS.iter().find(|(t, _)| *t == tag).map(|(_, brand)| *brand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_vbox_tag() {
        assert_eq!(brand_for_tag(b"VBox"), Some(BrandId::VirtualBox));
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(brand_for_tag(b"Zzzz"), None);
    }
}
