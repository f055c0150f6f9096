// SPDX-License-Identifier: Apache-2.0

//! GPU adapter-name substrings left by virtualized/software display
//! adapters, consulted by the `GPU_VM_STRINGS`/`GPU_CAPABILITIES` probe
//! pair. Matching is case-insensitive substring search against
//! `EnumDisplayDevices`' `DeviceString`/`DeviceID` fields (Windows) or the
//! GL renderer string (Linux/macOS, where applicable).

use crate::brand::BrandId;

pub static GPU_VM_MARKERS: &[(&str, BrandId)] = &[
    ("vmware svga", BrandId::Vmware),
    ("vmware svga 3d", BrandId::Vmware),
    ("virtualbox graphics adapter", BrandId::VirtualBox),
    ("vboxsvga", BrandId::VirtualBox),
    ("vboxvga", BrandId::VirtualBox),
    ("hyper-v virtual video", BrandId::HyperV),
    ("microsoft basic render driver", BrandId::HyperV),
    ("parallels display adapter", BrandId::ParallelsDesktop),
    ("qxl paravirtual", BrandId::Qemu),
    ("virtio-gpu", BrandId::Qemu),
    ("llvmpipe", BrandId::Qemu),
    ("apple paravirtual device", BrandId::AppleVz),
];

/// Finds the first known VM GPU marker contained in `adapter_string`
/// (already lowercased by the caller), or `None` if the string names a real
/// hardware adapter or an unrecognized one.
#[must_use]
pub fn brand_for_gpu_string(adapter_string_lower: &str) -> Option<BrandId> {
    GPU_VM_MARKERS
        .iter()
        .find(|(marker, _)| adapter_string_lower.contains(marker))
        .map(|(_, brand)| *brand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_vmware_svga() {
        assert_eq!(
            brand_for_gpu_string("vmware svga 3d adapter"),
            Some(BrandId::Vmware)
        );
    }

    #[test]
    fn real_hardware_adapter_is_none() {
        assert_eq!(brand_for_gpu_string("nvidia geforce rtx 4090"), None);
    }
}
