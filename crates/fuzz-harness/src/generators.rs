//! Catalog-shaped generators for property-based testing
//!
//! Values stay inside what a real catalog row can carry. Escape rows use the
//! same sentinels the loader produces (NaN, negative, infinite apogee).

use chrono::{DateTime, Duration, TimeZone, Utc};
use orbital_mechanics::{SatelliteInput, GEO_ALTITUDE_KM, GEO_TOLERANCE_KM, LEO_CEILING_KM};
use proptest::prelude::*;
use satellite_catalog::{Rgb, SatelliteRecord};

// ============================================================================
// Orbital Parameters
// ============================================================================

/// LEO altitude (km)
pub fn altitude_leo() -> impl Strategy<Value = f64> {
    160.0..LEO_CEILING_KM
}

/// MEO altitude (km), below the GEO band
pub fn altitude_meo() -> impl Strategy<Value = f64> {
    LEO_CEILING_KM..(GEO_ALTITUDE_KM - GEO_TOLERANCE_KM)
}

/// Altitude inside the GEO tolerance band (km)
pub fn altitude_geo() -> impl Strategy<Value = f64> {
    (GEO_ALTITUDE_KM - GEO_TOLERANCE_KM)..=(GEO_ALTITUDE_KM + GEO_TOLERANCE_KM)
}

/// Any bound altitude, including past the visualization cap (km)
pub fn altitude_km() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => altitude_leo(),
        2 => altitude_meo(),
        2 => altitude_geo(),
        1 => 36_300.0..400_000.0,
    ]
}

/// Apogee sentinels that mark an escape trajectory
pub fn escape_apogee() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NAN),
        Just(-1.0),
        Just(f64::INFINITY),
        -1.0e6..-0.001,
    ]
}

/// Inclination (deg), retrograde included
pub fn inclination_deg() -> impl Strategy<Value = f64> {
    0.0..=180.0
}

/// Launch site latitude (deg)
pub fn latitude_deg() -> impl Strategy<Value = f64> {
    -90.0..=90.0
}

/// Launch site longitude (deg)
pub fn longitude_deg() -> impl Strategy<Value = f64> {
    -180.0..=180.0
}

/// Progress fraction, endpoints included
pub fn progress() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(1.0), 0.0..=1.0]
}

// ============================================================================
// Identifiers
// ============================================================================

/// Catalog-style id (`S12345`, `A0042`, ...)
pub fn satellite_id() -> impl Strategy<Value = String> {
    "[A-Z][0-9]{4,5}".prop_map(|s| s.to_string())
}

/// Owner colour
pub fn owner_color() -> impl Strategy<Value = Rgb> {
    any::<(u8, u8, u8)>().prop_map(|(r, g, b)| Rgb::new(r, g, b))
}

// ============================================================================
// Composite Generators
// ============================================================================

/// Bound (non-escape) kernel input; perigee <= apogee
pub fn bound_input() -> impl Strategy<Value = SatelliteInput> {
    (
        satellite_id(),
        altitude_km(),
        0.0..=1.0f64,
        inclination_deg(),
        latitude_deg(),
        longitude_deg(),
    )
        .prop_map(|(id, apogee, ratio, inc, lat, lng)| {
            SatelliteInput::new(id, apogee * ratio, apogee, inc, lat, lng)
        })
}

/// Escape kernel input
pub fn escape_input() -> impl Strategy<Value = SatelliteInput> {
    (
        satellite_id(),
        prop_oneof![Just(f64::NAN), 0.0..2_000.0],
        escape_apogee(),
        inclination_deg(),
        latitude_deg(),
        longitude_deg(),
    )
        .prop_map(|(id, perigee, apogee, inc, lat, lng)| {
            SatelliteInput::new(id, perigee, apogee, inc, lat, lng)
        })
}

/// Any kernel input, mostly bound
pub fn satellite_input() -> impl Strategy<Value = SatelliteInput> {
    prop_oneof![9 => bound_input(), 1 => escape_input()]
}

/// Launch date between 1957-10-04 and 2030-01-01
pub fn launch_date() -> impl Strategy<Value = DateTime<Utc>> {
    (-386_380_800i64..1_893_456_000)
        .prop_filter_map("timestamp out of range", |secs| Utc.timestamp_opt(secs, 0).single())
}

/// Catalog record, active or ended up to 30 years after launch
pub fn satellite_record() -> impl Strategy<Value = SatelliteRecord> {
    (
        satellite_input(),
        launch_date(),
        prop::option::of(0i64..(30 * 365)),
        owner_color(),
    )
        .prop_map(|(input, launch, lifetime_days, color)| {
            let end = lifetime_days.map(|d| launch + Duration::days(d));
            SatelliteRecord::new(
                input.id.clone(),
                input.id,
                launch,
                end,
                input.perigee_km,
                input.apogee_km,
                input.inclination_deg,
                input.site_latitude_deg,
                input.site_longitude_deg,
            )
            .with_owner("Fuzz", color)
        })
}

/// Small catalog with unique ids
pub fn catalog(max: usize) -> impl Strategy<Value = Vec<SatelliteRecord>> {
    prop::collection::vec(satellite_record(), 1..=max).prop_map(|mut records| {
        for (i, record) in records.iter_mut().enumerate() {
            record.id = format!("{}-{}", record.id, i);
        }
        records
    })
}

/// Sorted time offsets (simulated days) around a launch
pub fn time_offsets_days(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-30.0..(40.0 * 365.0), len).prop_map(|mut offsets| {
        offsets.sort_by(f64::total_cmp);
        offsets
    })
}
