// SPDX-License-Identifier: Apache-2.0

//! Logical-core-count probes: a raw low-count heuristic plus model-aware
//! mismatch checks against the thread-count databases.

use crate::cpu::model::{classify, is_ancient_or_excluded, CpuModel};
use crate::data::{amd_threads, intel_threads};
use crate::probe::{default_weight, Probe, ProbeId};

pub fn register(probes: &mut Vec<Probe>) {
    probes.push(Probe {
        id: ProbeId::ThreadCount,
        weight: default_weight(ProbeId::ThreadCount),
        thunk: Box::new(|ctx, _board| ctx.logical_cores <= 2),
    });

    probes.push(Probe {
        id: ProbeId::OddCpuThreads,
        weight: default_weight(ProbeId::OddCpuThreads),
        thunk: Box::new(|ctx, _board| {
            // A real CPU's logical core count is always even once
            // hyperthreading/SMT is active, and single-digit odd counts
            // below that are vanishingly rare outside VM allocations
            // (e.g. 1, 3, 5 vCPUs).
            ctx.logical_cores > 1 && ctx.logical_cores % 2 != 0
        }),
    });

    probes.push(Probe {
        id: ProbeId::IntelThreadMismatch,
        weight: default_weight(ProbeId::IntelThreadMismatch),
        thunk: Box::new(|ctx, _board| {
            if is_ancient_or_excluded(&ctx.brand_string) {
                return false;
            }
            if let CpuModel::IntelCore { number, .. } = classify(&ctx.brand_string) {
                if let Some(expected) = intel_threads::expected_threads(&number) {
                    return usize::from(expected) != ctx.logical_cores;
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::XeonThreadMismatch,
        weight: default_weight(ProbeId::XeonThreadMismatch),
        thunk: Box::new(|ctx, _board| {
            if let CpuModel::IntelXeon { number } = classify(&ctx.brand_string) {
                if let Some(expected) = intel_threads::expected_threads(&number) {
                    return usize::from(expected) != ctx.logical_cores;
                }
            }
            false
        }),
    });

    probes.push(Probe {
        id: ProbeId::AmdThreadMismatch,
        weight: default_weight(ProbeId::AmdThreadMismatch),
        thunk: Box::new(|ctx, _board| {
            if is_ancient_or_excluded(&ctx.brand_string) {
                return false;
            }
            let model = classify(&ctx.brand_string);
            let number = match &model {
                CpuModel::AmdRyzen { number } | CpuModel::AmdEpyc { number } => Some(number),
                _ => None,
            };
            if let Some(number) = number {
                if let Some(expected) = amd_threads::expected_threads(number) {
                    return usize::from(expected) != ctx.logical_cores;
                }
            }
            false
        }),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::Scoreboard;
    use crate::platform::cpuid::FixedCpuidSource;
    use crate::probe::ProbeContext;

    #[test]
    fn thread_count_probe_fires_below_three_cores() {
        let source = FixedCpuidSource::new();
        let mut ctx = ProbeContext::gather(&source);
        ctx.logical_cores = 2;
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::ThreadCount).unwrap();
        assert!((probe.thunk)(&ctx, &mut board));
    }

    #[test]
    fn odd_cpu_threads_fires_on_three() {
        let source = FixedCpuidSource::new();
        let mut ctx = ProbeContext::gather(&source);
        ctx.logical_cores = 3;
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::OddCpuThreads).unwrap();
        assert!((probe.thunk)(&ctx, &mut board));
    }

    #[test]
    fn intel_mismatch_fires_when_cores_dont_match_part() {
        let source = FixedCpuidSource::new();
        let mut ctx = ProbeContext::gather(&source);
        ctx.brand_string = "Intel(R) Core(TM) i9-9900K CPU @ 3.60GHz".to_string();
        ctx.logical_cores = 4;
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::IntelThreadMismatch).unwrap();
        assert!((probe.thunk)(&ctx, &mut board));
    }

    #[test]
    fn intel_mismatch_silent_when_cores_match() {
        let source = FixedCpuidSource::new();
        let mut ctx = ProbeContext::gather(&source);
        ctx.brand_string = "Intel(R) Core(TM) i9-9900K CPU @ 3.60GHz".to_string();
        ctx.logical_cores = 16;
        let mut board = Scoreboard::new();
        let mut probes = Vec::new();
        register(&mut probes);
        let probe = probes.iter().find(|p| p.id == ProbeId::IntelThreadMismatch).unwrap();
        assert!(!(probe.thunk)(&ctx, &mut board));
    }
}
