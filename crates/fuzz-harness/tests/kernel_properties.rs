//! Orbital kernel properties

use fuzz_harness::prelude::*;
use orbital_mechanics::{
    classify_orbit, compute_geometry, compute_orbital_params, generate_ascent_points,
    generate_orbit_points, OrbitType, DEFAULT_SEGMENTS,
};

proptest! {
    #![proptest_config(FuzzConfig::new().cases(200).to_proptest_config())]

    #[test]
    fn geometry_is_deterministic(input in satellite_input()) {
        let first = compute_geometry(&input, 64);
        let second = compute_geometry(&input, 64);
        prop_assert_eq!(&first, &second);

        let a = compute_orbital_params(&input);
        let b = compute_orbital_params(&input);
        prop_assert_eq!(a.semi_major_axis.to_bits(), b.semi_major_axis.to_bits());
        prop_assert_eq!(a.matrix, b.matrix);
    }

    #[test]
    fn ascent_ends_on_orbit_start(input in bound_input(), segments in 4usize..=DEFAULT_SEGMENTS) {
        let orbit = generate_orbit_points(&input, segments);
        let ascent = generate_ascent_points(&input, segments, 1.0);
        prop_assert_eq!(orbit.len(), segments + 1);
        prop_assert_eq!(ascent.len(), segments + 1);

        let gap = (ascent[segments] - orbit[0]).norm();
        prop_assert!(gap < 1e-6, "gap {} for {:?}", gap, input);
    }

    #[test]
    fn orbit_stays_in_visual_bounds(input in bound_input()) {
        let params = compute_orbital_params(&input);
        prop_assert!(params.semi_minor_axis <= params.semi_major_axis + 1e-12);
        for p in generate_orbit_points(&input, 32) {
            let r = p.coords.norm();
            prop_assert!(r.is_finite());
            prop_assert!(r >= params.semi_minor_axis - 1e-9);
            prop_assert!(r <= params.semi_major_axis + 1e-9);
        }
    }

    #[test]
    fn escape_tracks_have_two_points(input in escape_input(), p in progress()) {
        prop_assert_eq!(classify_orbit(input.perigee_km, input.apogee_km), OrbitType::Escape);
        prop_assert_eq!(generate_orbit_points(&input, DEFAULT_SEGMENTS).len(), 2);
        prop_assert_eq!(generate_ascent_points(&input, DEFAULT_SEGMENTS, p).len(), 2);

        let geometry = compute_geometry(&input, DEFAULT_SEGMENTS);
        prop_assert_eq!(geometry.total_orbit_points, 2);
        prop_assert_eq!(geometry.orbit_positions.len(), 6);
        prop_assert!(geometry.orbit_positions.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn geo_band_classifies_geo(alt in altitude_geo()) {
        prop_assert_eq!(classify_orbit(alt, alt), OrbitType::Geo);
    }

    #[test]
    fn below_geo_band_classifies_meo(alt in altitude_meo()) {
        prop_assert_eq!(classify_orbit(alt, alt), OrbitType::Meo);
    }
}

#[test]
fn geo_banding_examples() {
    assert_eq!(classify_orbit(35_786.0, 35_786.0), OrbitType::Geo);
    assert_eq!(classify_orbit(35_000.0, 35_000.0), OrbitType::Meo);
    assert_eq!(classify_orbit(35_286.0, 35_286.0), OrbitType::Geo);
    assert_eq!(classify_orbit(36_286.0, 36_286.0), OrbitType::Geo);
    assert_eq!(classify_orbit(36_287.0, 36_287.0), OrbitType::Heo);
    assert_eq!(classify_orbit(400.0, f64::NAN), OrbitType::Escape);
    assert_eq!(classify_orbit(400.0, -1.0), OrbitType::Escape);
}
