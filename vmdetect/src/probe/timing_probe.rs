// SPDX-License-Identifier: Apache-2.0

//! The CPUID-serialization timing probe: bare metal retires `cpuid` in well
//! under a microsecond; a trap-and-emulate hypervisor routinely costs
//! several thousand cycles per call.

use crate::probe::{default_weight, Probe, ProbeId};

/// Average cycles above which `cpuid` is considered "suspiciously slow".
/// Bare-metal averages observed across common desktop/server parts sit
/// well under 200 cycles; this threshold leaves headroom for
/// frequency-scaling noise while still separating from the
/// thousands-of-cycles cost a trapped `cpuid` incurs.
const SLOW_CPUID_CYCLES: u64 = 350;

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::Timer,
        weight: default_weight(ProbeId::Timer),
        thunk: Box::new(|_ctx, _board| {
            #[cfg(target_arch = "x86_64")]
            {
                let average = crate::platform::timing::average_cpuid_cycles(100);
                return average > SLOW_CPUID_CYCLES;
            }
            #[cfg(not(target_arch = "x86_64"))]
            false
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_exactly_one_probe() {
        let mut probes = Vec::new();
        register(&mut probes);
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].id, ProbeId::Timer);
    }
}
