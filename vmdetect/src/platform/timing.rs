// SPDX-License-Identifier: Apache-2.0

//! Cycle-accurate timing primitives for the `CPUID`-serialization timing
//! probe: a hypervisor trapping and emulating `cpuid` makes the instruction
//! run orders of magnitude slower than on bare metal.

/// Reads the time-stamp counter. `rdtsc` is unserialized (can retire out of
/// order around neighboring instructions) but that's acceptable here: the
/// probe only needs a coarse average over many iterations, not a tight
/// single-instruction bound.
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn rdtsc() -> u64 {
    // SAFETY: `rdtsc` is available on every x86_64 CPU Rust targets and
    // never faults.
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub fn rdtsc() -> u64 {
    0
}

/// Runs `cpuid(0, 0)` `iterations` times, returning the average
/// cycle cost per call as measured by [`rdtsc`] bracketing. The
/// caller interprets the magnitude (a bare-metal `cpuid` is typically
/// under 100 cycles; a trap-and-emulate hypervisor commonly costs several
/// thousand).
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn average_cpuid_cycles(iterations: u32) -> u64 {
    if iterations == 0 {
        return 0;
    }
    let mut total: u64 = 0;
    for _ in 0..iterations {
        let start = rdtsc();
        // SAFETY: `__cpuid_count` never faults.
        let _ = unsafe { core::arch::x86_64::__cpuid_count(0, 0) };
        total += rdtsc().saturating_sub(start);
    }
    total / u64::from(iterations)
}

#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub fn average_cpuid_cycles(_iterations: u32) -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn rdtsc_increases_monotonically_ish() {
        let a = rdtsc();
        let b = rdtsc();
        assert!(b >= a);
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn average_cpuid_cycles_zero_iterations_is_zero() {
        assert_eq!(average_cpuid_cycles(0), 0);
    }
}
