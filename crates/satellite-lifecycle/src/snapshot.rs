//! Per-tick catalog classification
//!
//! A full pass over the catalog every tick: O(catalog), no incremental
//! path. Rewinds need nothing special because nothing is remembered.

use std::collections::BTreeMap;

use orbital_mechanics::OrbitType;
use satellite_catalog::SatelliteRecord;
use serde::Serialize;
use tracing::trace;

use crate::{LifecycleConfig, LifecyclePhase, LifecycleState, TimeScale};

/// A satellite in the active render set
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct VisibleSatellite {
    /// Index into the catalog record slice
    pub index: usize,
    pub state: LifecycleState,
}

/// Result of one classification pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct LifecycleSnapshot {
    pub time_ms: f64,
    /// Launching, active or decommissioning
    pub active: Vec<VisibleSatellite>,
    /// Catalog indices with an orbit ellipse drawn
    pub orbiting: Vec<usize>,
    pub phase_counts: BTreeMap<LifecyclePhase, usize>,
    /// Active render set broken down by orbit class
    pub visible_by_orbit: BTreeMap<OrbitType, usize>,
}

impl LifecycleSnapshot {
    fn reset(&mut self, time_ms: f64) {
        self.time_ms = time_ms;
        self.active.clear();
        self.orbiting.clear();
        for phase in LifecyclePhase::ALL {
            self.phase_counts.insert(phase, 0);
        }
        for orbit in OrbitType::ALL {
            self.visible_by_orbit.insert(orbit, 0);
        }
    }

    pub fn count(&self, phase: LifecyclePhase) -> usize {
        self.phase_counts.get(&phase).copied().unwrap_or(0)
    }

    /// Satellites currently launching (what the audio layer keys on)
    pub fn launching(&self) -> usize {
        self.count(LifecyclePhase::Launching)
    }
}

/// One full classification pass over `records` at `t_ms`
pub fn classify_catalog(
    records: &[SatelliteRecord],
    t_ms: f64,
    config: &LifecycleConfig,
    scale: &TimeScale,
) -> LifecycleSnapshot {
    LifecycleEngine::new(config.clone(), *scale).classify(records, t_ms)
}

/// Lifecycle config + time scale, evaluated against a whole catalog
#[derive(Debug, Clone, Default)]
pub struct LifecycleEngine {
    pub config: LifecycleConfig,
    pub scale: TimeScale,
}

impl LifecycleEngine {
    pub fn new(config: LifecycleConfig, scale: TimeScale) -> Self {
        Self { config, scale }
    }

    pub fn evaluate(&self, record: &SatelliteRecord, t_ms: f64) -> LifecycleState {
        LifecycleState::evaluate(record, t_ms, &self.config, &self.scale)
    }

    pub fn classify(&self, records: &[SatelliteRecord], t_ms: f64) -> LifecycleSnapshot {
        let mut snapshot = LifecycleSnapshot::default();
        self.classify_into(records, t_ms, &mut snapshot);
        snapshot
    }

    /// Classify into an existing snapshot, reusing its allocations
    pub fn classify_into(
        &self,
        records: &[SatelliteRecord],
        t_ms: f64,
        snapshot: &mut LifecycleSnapshot,
    ) {
        snapshot.reset(t_ms);

        for (index, record) in records.iter().enumerate() {
            let state = self.evaluate(record, t_ms);
            *snapshot.phase_counts.entry(state.phase).or_insert(0) += 1;

            if !state.is_visible() {
                continue;
            }

            *snapshot.visible_by_orbit.entry(record.orbit_type).or_insert(0) += 1;
            if state.is_orbiting() {
                snapshot.orbiting.push(index);
            }
            snapshot.active.push(VisibleSatellite { index, state });
        }

        trace!(
            "t={} visible={} orbiting={}",
            t_ms,
            snapshot.active.len(),
            snapshot.orbiting.len()
        );
    }
}
