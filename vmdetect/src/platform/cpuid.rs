// SPDX-License-Identifier: Apache-2.0

//! CPUID leaf access.
//!
//! Wraps `__cpuid`/`__cpuid_count` with a `# SAFETY:` comment and a
//! `CpuidResult`-shaped return value, trimmed to the handful of leaves
//! the probes above actually read: 0x0 (vendor id), 0x1 (feature bits),
//! 0x7 (extended features, unused today but kept for parity with the
//! rest of the leaf layout), 0x8000_0000..0x8000_0004 (brand string),
//! and the 0x4000_0000..0x4000_0100 hypervisor range.

/// The four 32-bit registers CPUID fills in, named the same way
/// `core::arch::x86_64::CpuidResult` does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Leaves {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

/// Abstraction over "ask the CPU" so tests can inject synthetic leaf tables
/// instead of depending on the host's real CPU. Production code only ever
/// uses [`HostCpuidSource`]; [`crate::Engine::with_cpuid_source`] is the
/// only place a [`FixedCpuidSource`] is constructed.
pub trait CpuidSource: Send + Sync {
    /// True if the `cpuid` instruction is usable at all on this platform.
    fn supported(&self) -> bool;
    /// Reads one leaf/subleaf pair. Returns all-zero registers for leaves
    /// beyond what `cpuid(0)`/`cpuid(0x8000_0000)` report as the maximum,
    /// matching real CPUID's behavior for an unsupported leaf.
    fn read(&self, leaf: u32, subleaf: u32) -> Leaves;
}

/// Reads real CPUID from the executing core.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCpuidSource;

impl CpuidSource for HostCpuidSource {
    #[cfg(target_arch = "x86_64")]
    fn supported(&self) -> bool {
        true
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn supported(&self) -> bool {
        false
    }

    #[cfg(target_arch = "x86_64")]
    fn read(&self, leaf: u32, subleaf: u32) -> Leaves {
        // SAFETY: `__cpuid_count` is always safe to call on x86_64; the
        // instruction cannot fault and every input bit pattern is valid.
        let result = unsafe { core::arch::x86_64::__cpuid_count(leaf, subleaf) };
        Leaves {
            eax: result.eax,
            ebx: result.ebx,
            ecx: result.ecx,
            edx: result.edx,
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn read(&self, _leaf: u32, _subleaf: u32) -> Leaves {
        Leaves::default()
    }
}

/// A synthetic CPUID table for deterministic tests, keyed by `(leaf,
/// subleaf)`. Leaves not present in the table read back as all-zero.
#[derive(Debug, Clone, Default)]
pub struct FixedCpuidSource {
    supported: bool,
    table: std::collections::HashMap<(u32, u32), Leaves>,
}

impl FixedCpuidSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: true,
            table: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            table: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_leaf(mut self, leaf: u32, subleaf: u32, values: Leaves) -> Self {
        self.table.insert((leaf, subleaf), values);
        self
    }
}

impl CpuidSource for FixedCpuidSource {
    fn supported(&self) -> bool {
        self.supported
    }

    fn read(&self, leaf: u32, subleaf: u32) -> Leaves {
        self.table.get(&(leaf, subleaf)).copied().unwrap_or_default()
    }
}

/// Decodes an ASCII vendor/brand string packed little-endian across
/// `eax, ebx, ecx, edx`-shaped register groups, the layout CPUID always
/// uses for manufacturer and brand strings.
#[must_use]
pub fn registers_to_ascii(regs: &[u32]) -> String {
    let mut bytes = Vec::with_capacity(regs.len() * 4);
    for reg in regs {
        bytes.extend_from_slice(&reg.to_le_bytes());
    }
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reads the 12-byte vendor id string from leaf 0x0 (`ebx, edx, ecx` order,
/// per the CPUID specification).
#[must_use]
pub fn vendor_id(source: &dyn CpuidSource) -> String {
    let leaf0 = source.read(0x0, 0);
    registers_to_ascii(&[leaf0.ebx, leaf0.edx, leaf0.ecx])
}

/// Reads the 48-byte processor brand string from leaves
/// 0x8000_0002-0x8000_0004, or an empty string if the extended range isn't
/// supported.
#[must_use]
pub fn brand_string(source: &dyn CpuidSource) -> String {
    let max_ext = source.read(0x8000_0000, 0).eax;
    if max_ext < 0x8000_0004 {
        return String::new();
    }
    let mut regs = Vec::with_capacity(12);
    for leaf in 0x8000_0002u32..=0x8000_0004 {
        let l = source.read(leaf, 0);
        regs.extend_from_slice(&[l.eax, l.ebx, l.ecx, l.edx]);
    }
    registers_to_ascii(&regs).trim().to_string()
}

/// Bit 31 of `ecx` in leaf 0x1: set by every hypervisor that honors the
/// convention, clear on bare metal and (per the convention) on a Hyper-V
/// root partition.
#[must_use]
pub fn hypervisor_bit(source: &dyn CpuidSource) -> bool {
    source.read(0x1, 0).ecx & (1 << 31) != 0
}

/// Reads the 12-byte hypervisor vendor id from leaf 0x4000_0000, valid only
/// when [`hypervisor_bit`] is set.
#[must_use]
pub fn hypervisor_vendor_id(source: &dyn CpuidSource) -> String {
    let leaf = source.read(0x4000_0000, 0);
    registers_to_ascii(&[leaf.ebx, leaf.ecx, leaf.edx])
}

/// True if CPUID leaves in the 0x4000_0000..0x4000_0100 hypervisor range
/// report a nonzero maximum, a signal several sandboxes and thin
/// hypervisors leave even when the vendor string itself is spoofed blank.
#[must_use]
pub fn hypervisor_leaf_range_present(source: &dyn CpuidSource) -> bool {
    source.read(0x4000_0000, 0).eax >= 0x4000_0000
}

/// Reads `eax` of leaf 0x4000_0000: the highest hypervisor leaf the monitor
/// claims to support. Hyper-X arbitration uses this to tell a genuine
/// Hyper-V guest (max leaf 11) apart from an impostor vendor string.
#[must_use]
pub fn hypervisor_max_leaf(source: &dyn CpuidSource) -> u32 {
    source.read(0x4000_0000, 0).eax
}

/// Reads the 12-byte vendor id string from leaf 0x4000_0001's `ebx:ecx:edx`
/// registers, the same packing leaf 0x4000_0000 uses for its vendor id.
/// Distinct from that leaf's `eax`, which carries the unrelated interface
/// signature the `cpuid_signature` probe matches against.
#[must_use]
pub fn leaf_0x4000_0001_vendor_id(source: &dyn CpuidSource) -> String {
    let leaf = source.read(0x4000_0001, 0);
    registers_to_ascii(&[leaf.ebx, leaf.ecx, leaf.edx])
}

/// Bit 0 of `ebx` in leaf 0x4000_0003: set when this partition is Hyper-V's
/// root partition (the host itself) rather than a child/guest partition.
#[must_use]
pub fn hyperv_root_partition(source: &dyn CpuidSource) -> bool {
    source.read(0x4000_0003, 0).ebx & 1 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_id_decodes_genuine_intel() {
        let source = FixedCpuidSource::new().with_leaf(
            0x0,
            0,
            Leaves {
                eax: 0,
                ebx: u32::from_le_bytes(*b"Genu"),
                ecx: u32::from_le_bytes(*b"ntel"),
                edx: u32::from_le_bytes(*b"ineI"),
            },
        );
        assert_eq!(vendor_id(&source), "GenuineIntel");
    }

    #[test]
    fn hypervisor_bit_reads_ecx_bit_31() {
        let source = FixedCpuidSource::new().with_leaf(
            0x1,
            0,
            Leaves {
                eax: 0,
                ebx: 0,
                ecx: 1 << 31,
                edx: 0,
            },
        );
        assert!(hypervisor_bit(&source));
    }

    #[test]
    fn brand_string_empty_when_extended_leaves_unsupported() {
        let source = FixedCpuidSource::new().with_leaf(0x8000_0000, 0, Leaves::default());
        assert_eq!(brand_string(&source), "");
    }

    #[test]
    fn unsupported_source_reports_false() {
        let source = FixedCpuidSource::unsupported();
        assert!(!source.supported());
    }
}
