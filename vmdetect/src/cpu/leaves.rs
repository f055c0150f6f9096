// SPDX-License-Identifier: Apache-2.0

//! Bit-index constants for the CPUID leaves the probes read: one module
//! per leaf, one sub-module per register.

/// Basic CPUID Information.
pub mod leaf_0x1 {
    pub const LEAF_NUM: u32 = 0x1;

    pub mod ecx {
        /// CPU is running under a hypervisor (set by every hypervisor that
        /// honors the convention; clear on bare metal).
        pub const HYPERVISOR_BITINDEX: u32 = 31;
        /// OS has enabled XSAVE/XGETBV for user mode.
        pub const OSXSAVE_BITINDEX: u32 = 27;
        /// Hardware hypervisor assist (VT-x).
        pub const VMX_BITINDEX: u32 = 5;
    }

    pub mod edx {
        /// Max APIC IDs reserved field is valid; used alongside `ebx`'s
        /// logical-processor-count field for the thread-count probes.
        pub const HTT_BITINDEX: u32 = 28;
    }
}

/// Hypervisor vendor information leaf, valid only when
/// `leaf_0x1::ecx::HYPERVISOR_BITINDEX` is set.
pub mod leaf_0x4000_0000 {
    pub const LEAF_NUM: u32 = 0x4000_0000;
}

/// Extended function CPUID information: maximum supported extended leaf.
pub mod leaf_0x8000_0000 {
    pub const LEAF_NUM: u32 = 0x8000_0000;
}

/// Processor brand string, spread across three consecutive leaves.
pub mod leaf_0x8000_0002 {
    pub const LEAF_NUM: u32 = 0x8000_0002;
    pub const LAST_LEAF_NUM: u32 = 0x8000_0004;
}
