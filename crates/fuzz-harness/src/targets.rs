//! Named fuzz targets over the orbital kernel and lifecycle state machine
//!
//! Each target is one property run through [`FuzzRunner`], so a whole sweep
//! ends up in a single JSON report.

use orbital_mechanics::{
    classify_orbit, compute_geometry, generate_ascent_points, generate_orbit_points, OrbitType,
    DEFAULT_SEGMENTS,
};
use proptest::prelude::*;
use satellite_lifecycle::{LifecycleConfig, LifecyclePhase, LifecycleState, TimeScale, MS_PER_DAY};

use crate::generators::*;
use crate::runner::{FuzzResult, FuzzRunner};

/// Target names in run order
pub const TARGETS: &[&str] = &[
    "geometry_determinism",
    "ascent_orbit_continuity",
    "escape_two_points",
    "geo_banding",
    "phase_monotonicity",
    "progress_bounds",
];

/// Run one target by name; `None` for an unknown name
pub fn run_target<'a>(runner: &'a mut FuzzRunner, name: &str) -> Option<&'a FuzzResult> {
    let result = match name {
        "geometry_determinism" => runner.run(name, satellite_input(), |input| {
            prop_assert_eq!(compute_geometry(&input, 64), compute_geometry(&input, 64));
            Ok(())
        }),
        "ascent_orbit_continuity" => runner.run(name, bound_input(), |input| {
            let orbit = generate_orbit_points(&input, DEFAULT_SEGMENTS);
            let ascent = generate_ascent_points(&input, DEFAULT_SEGMENTS, 1.0);
            let gap = (ascent[DEFAULT_SEGMENTS] - orbit[0]).norm();
            prop_assert!(gap < 1e-6, "gap {}", gap);
            Ok(())
        }),
        "escape_two_points" => runner.run(name, (escape_input(), progress()), |(input, p)| {
            prop_assert_eq!(classify_orbit(input.perigee_km, input.apogee_km), OrbitType::Escape);
            prop_assert_eq!(generate_orbit_points(&input, DEFAULT_SEGMENTS).len(), 2);
            prop_assert_eq!(generate_ascent_points(&input, DEFAULT_SEGMENTS, p).len(), 2);
            Ok(())
        }),
        "geo_banding" => runner.run(name, (altitude_geo(), altitude_meo()), |(geo, meo)| {
            prop_assert_eq!(classify_orbit(geo, geo), OrbitType::Geo);
            prop_assert_eq!(classify_orbit(meo, meo), OrbitType::Meo);
            Ok(())
        }),
        "phase_monotonicity" => runner.run(
            name,
            (satellite_record(), time_offsets_days(24)),
            |(record, offsets)| {
                let config = LifecycleConfig::default();
                let scale = TimeScale::default();
                let mut last = LifecyclePhase::Pending;
                for days in offsets {
                    let t = record.launch_ms() + days * MS_PER_DAY;
                    let phase = LifecycleState::evaluate(&record, t, &config, &scale).phase;
                    prop_assert!(phase >= last, "{:?} after {:?}", phase, last);
                    last = phase;
                }
                Ok(())
            },
        ),
        "progress_bounds" => runner.run(
            name,
            (satellite_record(), -100.0..(50.0 * 365.0)),
            |(record, days)| {
                let t = record.launch_ms() + days * MS_PER_DAY;
                let state =
                    LifecycleState::evaluate(&record, t, &LifecycleConfig::default(), &TimeScale::default());
                for value in [
                    state.launch_progress,
                    state.launch_opacity,
                    state.orbit_progress,
                    state.decom_progress,
                ] {
                    prop_assert!((0.0..=1.0).contains(&value), "{:?}", state);
                }
                Ok(())
            },
        ),
        _ => return None,
    };
    Some(result)
}

/// Run every target in [`TARGETS`]
pub fn run_all(runner: &mut FuzzRunner) {
    for name in TARGETS {
        run_target(runner, name);
    }
}
