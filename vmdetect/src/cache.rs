// SPDX-License-Identifier: Apache-2.0

//! Memoization: per-probe result cache, final-brand cache, and the Hyper-X
//! disambiguation cache slot.

use std::collections::HashMap;

use crate::brand::BrandId;
use crate::hyperx::HyperXState;
use crate::probe::ProbeId;

/// Caches everything an [`crate::Engine`] computes across repeated queries
/// in the same process, so `percentage`/`brand`/`type_of`/`conclusion`
/// calls against the same `Options` don't re-run every probe each time.
///
/// Cleared by [`Cache::clear`] when the `NO_MEMO` setting is active, and
/// selectively invalidated by [`Cache::invalidate`] when
/// [`crate::Engine::modify_score`] changes a probe's weight (a cached
/// boolean outcome is still valid, but the score it contributed is not).
#[derive(Debug, Default)]
pub struct Cache {
    probes: HashMap<ProbeId, bool>,
    score: Option<u32>,
    brand: Option<Vec<BrandId>>,
    hyperx: Option<HyperXState>,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn probe_result(&self, id: ProbeId) -> Option<bool> {
        self.probes.get(&id).copied()
    }

    pub fn store_probe_result(&mut self, id: ProbeId, result: bool) {
        self.probes.insert(id, result);
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    pub fn store_score(&mut self, score: u32) {
        self.score = Some(score);
    }

    #[must_use]
    pub fn brand(&self) -> Option<&[BrandId]> {
        self.brand.as_deref()
    }

    pub fn store_brand(&mut self, brand: Vec<BrandId>) {
        self.brand = Some(brand);
    }

    #[must_use]
    pub fn hyperx(&self) -> Option<HyperXState> {
        self.hyperx
    }

    pub fn store_hyperx(&mut self, state: HyperXState) {
        self.hyperx = Some(state);
    }

    /// Drops every cached value. Called before a query runs under the
    /// `NO_MEMO` setting, and by [`crate::Engine::new`].
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drops the cached result for a single probe and every downstream
    /// aggregate (score/brand depend on every probe, so they're no longer
    /// valid once any one input changes). Hyper-X state is independent of
    /// probe weights and survives.
    pub fn invalidate(&mut self, id: ProbeId) {
        self.probes.remove(&id);
        self.score = None;
        self.brand = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_has_nothing_memoized() {
        let cache = Cache::new();
        assert_eq!(cache.probe_result(ProbeId::Vmid), None);
        assert_eq!(cache.score(), None);
        assert!(cache.brand().is_none());
    }

    #[test]
    fn store_and_retrieve_round_trips() {
        let mut cache = Cache::new();
        cache.store_probe_result(ProbeId::Vmid, true);
        cache.store_score(95);
        cache.store_brand(vec![BrandId::Kvm]);
        assert_eq!(cache.probe_result(ProbeId::Vmid), Some(true));
        assert_eq!(cache.score(), Some(95));
        assert_eq!(cache.brand(), Some(&[BrandId::Kvm][..]));
    }

    #[test]
    fn invalidate_drops_probe_and_downstream_aggregates() {
        let mut cache = Cache::new();
        cache.store_probe_result(ProbeId::Vmid, true);
        cache.store_score(95);
        cache.store_brand(vec![BrandId::Kvm]);
        cache.invalidate(ProbeId::Vmid);
        assert_eq!(cache.probe_result(ProbeId::Vmid), None);
        assert_eq!(cache.score(), None);
        assert!(cache.brand().is_none());
    }

    #[test]
    fn clear_resets_everything_including_hyperx() {
        let mut cache = Cache::new();
        cache.store_hyperx(HyperXState::RealVm);
        cache.clear();
        assert_eq!(cache.hyperx(), None);
    }
}
