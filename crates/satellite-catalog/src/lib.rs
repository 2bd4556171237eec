//! Satellite Catalog
//!
//! Immutable satellite records for the launch/orbit dashboard, loaded once
//! from a JSON array of catalog rows:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `jcat` | catalog id (unique, stable) |
//! | `name` | object name |
//! | `launch_date` / `end_date` | launch and decay/end timestamps (`end_date` absent = still active) |
//! | `owner_e_name` / `owner_color` | owner display name and colour |
//! | `perigee` / `apogee` | altitudes in km (bad apogee = escape trajectory) |
//! | `inc` | inclination in degrees |
//! | `launch_site_latitude` / `launch_site_longitude` | launch site |
//!
//! Rows without a launch date or launch-site coordinates never reach the
//! rest of the system; the loader drops and counts them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use orbital_mechanics::{classify_orbit, OrbitType, SatelliteInput};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod color;
pub mod loader;

pub use color::Rgb;
pub use loader::{load_catalog, parse_catalog, parse_date};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog has no usable records ({0} rows skipped)")]
    Empty(usize),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One catalog entry, validated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatelliteRecord {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub owner_color: Rgb,
    pub launch: DateTime<Utc>,
    /// Decay/end of mission. `None` = still active
    pub end: Option<DateTime<Utc>>,
    pub perigee_km: f64,
    pub apogee_km: f64,
    pub inclination_deg: f64,
    pub site_latitude_deg: f64,
    pub site_longitude_deg: f64,
    pub orbit_type: OrbitType,
}

impl SatelliteRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        launch: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        perigee_km: f64,
        apogee_km: f64,
        inclination_deg: f64,
        site_latitude_deg: f64,
        site_longitude_deg: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_name: String::new(),
            owner_color: Rgb::DEFAULT_OWNER,
            launch,
            end,
            perigee_km,
            apogee_km,
            inclination_deg,
            site_latitude_deg,
            site_longitude_deg,
            orbit_type: classify_orbit(perigee_km, apogee_km),
        }
    }

    pub fn with_owner(mut self, name: impl Into<String>, color: Rgb) -> Self {
        self.owner_name = name.into();
        self.owner_color = color;
        self
    }

    /// Kernel input (no timestamps, no display fields)
    pub fn orbit_input(&self) -> SatelliteInput {
        SatelliteInput {
            id: self.id.clone(),
            perigee_km: self.perigee_km,
            apogee_km: self.apogee_km,
            inclination_deg: self.inclination_deg,
            site_latitude_deg: self.site_latitude_deg,
            site_longitude_deg: self.site_longitude_deg,
            orbit_type: self.orbit_type,
        }
    }

    /// Launch as Unix milliseconds
    pub fn launch_ms(&self) -> f64 {
        self.launch.timestamp_millis() as f64
    }

    /// End as Unix milliseconds, `+inf` when still active
    pub fn end_ms(&self) -> f64 {
        self.end
            .map(|end| end.timestamp_millis() as f64)
            .unwrap_or(f64::INFINITY)
    }
}

/// Per-load statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogSummary {
    pub total: usize,
    pub skipped: usize,
    pub still_active: usize,
    pub by_orbit: BTreeMap<OrbitType, usize>,
}

/// Loaded catalog with an id index
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<SatelliteRecord>,
    index: HashMap<String, usize>,
    skipped: usize,
}

impl Catalog {
    /// Build from records. Later duplicates of an id are dropped.
    pub fn new(records: Vec<SatelliteRecord>) -> Self {
        Self::with_skipped(records, 0)
    }

    pub(crate) fn with_skipped(records: Vec<SatelliteRecord>, skipped: usize) -> Self {
        let mut unique = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut skipped = skipped;

        for record in records {
            if index.contains_key(&record.id) {
                tracing::warn!("Duplicate catalog id {} dropped", record.id);
                skipped += 1;
                continue;
            }
            index.insert(record.id.clone(), unique.len());
            unique.push(record);
        }

        Self {
            records: unique,
            index,
            skipped,
        }
    }

    pub fn records(&self) -> &[SatelliteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, id: &str) -> Option<&SatelliteRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Kernel inputs for the whole catalog (geometry worker request payload)
    pub fn orbit_inputs(&self) -> Vec<SatelliteInput> {
        self.records.iter().map(SatelliteRecord::orbit_input).collect()
    }

    /// Earliest launch to latest launch/end
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.iter().map(|r| r.launch).min()?;
        let last = self
            .records
            .iter()
            .map(|r| r.end.map_or(r.launch, |end| end.max(r.launch)))
            .max()?;
        Some((first, last))
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut by_orbit = BTreeMap::new();
        for orbit in OrbitType::ALL {
            by_orbit.insert(orbit, 0);
        }
        for record in &self.records {
            *by_orbit.entry(record.orbit_type).or_insert(0) += 1;
        }

        CatalogSummary {
            total: self.records.len(),
            skipped: self.skipped,
            still_active: self.records.iter().filter(|r| r.end.is_none()).count(),
            by_orbit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, perigee: f64, apogee: f64, end: Option<DateTime<Utc>>) -> SatelliteRecord {
        SatelliteRecord::new(
            id,
            id,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            end,
            perigee,
            apogee,
            53.0,
            28.5,
            -80.6,
        )
    }

    #[test]
    fn test_duplicates_dropped() {
        let catalog = Catalog::new(vec![
            record("A", 400.0, 400.0, None),
            record("A", 500.0, 500.0, None),
            record("B", 20_000.0, 20_000.0, None),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.skipped(), 1);
        assert_eq!(catalog.get("A").unwrap().perigee_km, 400.0);
    }

    #[test]
    fn test_summary_counts() {
        let end = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        let catalog = Catalog::new(vec![
            record("A", 400.0, 400.0, None),
            record("B", 35_786.0, 35_786.0, Some(end)),
            record("C", 200.0, -1.0, Some(end)),
        ]);
        let summary = catalog.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.still_active, 1);
        assert_eq!(summary.by_orbit[&OrbitType::Leo], 1);
        assert_eq!(summary.by_orbit[&OrbitType::Geo], 1);
        assert_eq!(summary.by_orbit[&OrbitType::Escape], 1);
        assert_eq!(summary.by_orbit[&OrbitType::Heo], 0);
    }

    #[test]
    fn test_time_span() {
        let end = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let catalog = Catalog::new(vec![record("A", 400.0, 400.0, Some(end))]);
        let (first, last) = catalog.time_span().unwrap();
        assert_eq!(first, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(last, end);
        assert!(Catalog::default().time_span().is_none());
    }

    #[test]
    fn test_end_ms_infinite_when_active() {
        let r = record("A", 400.0, 400.0, None);
        assert!(r.end_ms().is_infinite());
        assert_eq!(r.orbit_input().orbit_type, OrbitType::Leo);
    }
}
