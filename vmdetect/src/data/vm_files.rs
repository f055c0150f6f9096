// SPDX-License-Identifier: Apache-2.0

//! Filesystem and registry paths whose mere presence is evidence of a
//! specific VM/container/sandbox product, grouped by the platform the
//! filesystem probes check them on.

use crate::brand::BrandId;

/// Linux/generic-POSIX marker files checked by [`crate::probe::fs_probes`].
pub static LINUX_MARKER_FILES: &[(&str, BrandId)] = &[
    ("/.dockerenv", BrandId::Docker),
    ("/.dockerinit", BrandId::Docker),
    ("/run/.containerenv", BrandId::Podman),
    ("/proc/xen", BrandId::Xen),
    ("/proc/vz", BrandId::OpenVz),
    ("/dev/lxd/sock", BrandId::Lxc),
    ("/proc/sys/kernel/osrelease", BrandId::Wsl),
];

/// Loaded-kernel-module name substrings, checked against
/// [`crate::platform::linux::loaded_kernel_modules`].
pub static LINUX_VM_MODULES: &[(&str, BrandId)] = &[
    ("vboxguest", BrandId::VirtualBox),
    ("vboxsf", BrandId::VirtualBox),
    ("vboxvideo", BrandId::VirtualBox),
    ("vmw_balloon", BrandId::Vmware),
    ("vmwgfx", BrandId::Vmware),
    ("vmw_vsock", BrandId::Vmware),
    ("virtio_balloon", BrandId::Qemu),
    ("virtio_net", BrandId::Qemu),
    ("xen_balloon", BrandId::Xen),
    ("hv_vmbus", BrandId::HyperV),
    ("hv_balloon", BrandId::HyperV),
];

/// `/sys/class/dmi/id/*` substrings (already lowercased), checked against
/// [`crate::platform::linux::dmi_field`].
pub static DMI_VM_MARKERS: &[(&str, BrandId)] = &[
    ("vmware", BrandId::Vmware),
    ("virtualbox", BrandId::VirtualBox),
    ("kvm", BrandId::Kvm),
    ("qemu", BrandId::Qemu),
    ("microsoft corporation virtual machine", BrandId::HyperV),
    ("xen", BrandId::Xen),
    ("bochs", BrandId::Bochs),
    ("parallels", BrandId::ParallelsDesktop),
];

/// Windows registry subkeys under `HKEY_LOCAL_MACHINE` whose mere existence
/// is evidence of a specific product's guest integration components,
/// transcribed from the vendor-grouped key list a full implementation
/// checks one by one.
pub static WINDOWS_VM_REGISTRY_KEYS: &[(&str, BrandId)] = &[
    (r"SOFTWARE\Classes\Folder\shell\sandbox", BrandId::Sandboxie),
    (r"SOFTWARE\Microsoft\Hyper-V", BrandId::HyperV),
    (r"SOFTWARE\Microsoft\VirtualMachine", BrandId::HyperV),
    (r"SYSTEM\ControlSet001\Services\vmicheartbeat", BrandId::HyperV),
    (r"SYSTEM\ControlSet001\Services\vmicvss", BrandId::HyperV),
    (r"SYSTEM\ControlSet001\Services\vmicshutdown", BrandId::HyperV),
    (r"SYSTEM\ControlSet001\Services\vmicexchange", BrandId::HyperV),
    (r"SYSTEM\CurrentControlSet\Services\SbieDrv", BrandId::Sandboxie),
    (r"SYSTEM\ControlSet001\Services\VBoxGuest", BrandId::VirtualBox),
    (r"SYSTEM\ControlSet001\Services\VBoxMouse", BrandId::VirtualBox),
    (r"SYSTEM\ControlSet001\Services\VBoxService", BrandId::VirtualBox),
    (r"SYSTEM\ControlSet001\Services\VBoxSF", BrandId::VirtualBox),
    (r"SYSTEM\ControlSet001\Services\VBoxVideo", BrandId::VirtualBox),
    (r"HARDWARE\ACPI\DSDT\VBOX__", BrandId::VirtualBox),
    (r"HARDWARE\ACPI\FADT\VBOX__", BrandId::VirtualBox),
    (r"HARDWARE\ACPI\RSDT\VBOX__", BrandId::VirtualBox),
    (r"SOFTWARE\Oracle\VirtualBox Guest Additions", BrandId::VirtualBox),
    (r"SYSTEM\ControlSet001\Services\vpcbus", BrandId::MicrosoftVirtualPc),
    (r"SYSTEM\ControlSet001\Services\vpc-s3", BrandId::MicrosoftVirtualPc),
    (r"SYSTEM\ControlSet001\Services\vpcuhub", BrandId::MicrosoftVirtualPc),
    (r"SYSTEM\ControlSet001\Services\msvmmouf", BrandId::MicrosoftVirtualPc),
    (r"SOFTWARE\VMware, Inc.\VMware Tools", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\vmdebug", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\vmmouse", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\VMTools", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\VMMEMCTL", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\vmware", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\vmci", BrandId::Vmware),
    (r"SYSTEM\ControlSet001\Services\vmx86", BrandId::Vmware),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_non_empty() {
        assert!(!LINUX_MARKER_FILES.is_empty());
        assert!(!LINUX_VM_MODULES.is_empty());
        assert!(!DMI_VM_MARKERS.is_empty());
        assert!(!WINDOWS_VM_REGISTRY_KEYS.is_empty());
    }
}
