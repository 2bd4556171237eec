//! Orbital Mechanics Library
//!
//! Illustrative orbit geometry for the launch/orbit dashboard. Turns sparse
//! catalog parameters (perigee, apogee, inclination, launch site) into:
//! - an orbit classification (LEO / MEO / GEO / HEO / ESCAPE)
//! - an orbital ellipse (semi-major/minor axis + orientation matrix)
//! - an insertion angle on that ellipse nearest the launch site
//! - point tracks for the closed orbit and the ground-to-orbit ascent
//!
//! This is not a propagator. There is no Kepler solve, no drag and no
//! perturbation model; ellipses are centred on the Earth and the ascending
//! node is pseudo-random per satellite. Every function here is total for
//! finite input and free of any rendering or async dependency so it can run
//! unchanged on the background geometry worker and on the render thread.
//!
//! Units: distances are normalized so that Earth radius = 1. The frame is
//! Y-up (polar axis = +Y).

use serde::{Deserialize, Serialize};

pub mod params;
pub mod insertion;
pub mod tracks;

pub use params::{compute_orbital_params, id_hash, OrbitalParams};
pub use insertion::find_insertion_angle;
pub use tracks::{
    compute_geometry, flatten_points, generate_ascent_into, generate_ascent_points,
    generate_orbit_into, generate_orbit_points, GeometryResult, OrbitScratch,
};

/// Mean Earth radius used for normalization
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geostationary altitude
pub const GEO_ALTITUDE_KM: f64 = 35_786.0;

/// Half-width of the GEO band around [`GEO_ALTITUDE_KM`]
pub const GEO_TOLERANCE_KM: f64 = 500.0;

/// Upper bound of the LEO band (average altitude)
pub const LEO_CEILING_KM: f64 = 2_000.0;

/// Visualization floor for perigee. Not a physical limit.
pub const MIN_PERIGEE_KM: f64 = 100.0;

/// Visualization cap for apogee. Keeps HEO/lunar-transfer ellipses on screen.
pub const MAX_APOGEE_KM: f64 = 100_000.0;

/// Minimum altitude of the outward ray drawn for escape trajectories
pub const ESCAPE_MIN_ALTITUDE_KM: f64 = 200.0;

/// Default number of segments for orbit and ascent tracks
pub const DEFAULT_SEGMENTS: usize = 128;

/// Orbit class derived from perigee/apogee
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrbitType {
    Leo,
    Meo,
    Geo,
    Heo,
    /// Non-finite or negative apogee/perigee: drawn as an outward ray
    Escape,
}

impl OrbitType {
    pub const ALL: [OrbitType; 5] = [
        OrbitType::Leo,
        OrbitType::Meo,
        OrbitType::Geo,
        OrbitType::Heo,
        OrbitType::Escape,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leo => "LEO",
            Self::Meo => "MEO",
            Self::Geo => "GEO",
            Self::Heo => "HEO",
            Self::Escape => "ESCAPE",
        }
    }
}

impl std::fmt::Display for OrbitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an orbit by average altitude.
///
/// Negative or non-finite apogee is ESCAPE regardless of perigee. Negative
/// or non-finite perigee is also treated as ESCAPE so malformed rows degrade
/// to a ray instead of a nonsense ellipse.
pub fn classify_orbit(perigee_km: f64, apogee_km: f64) -> OrbitType {
    if !apogee_km.is_finite() || apogee_km < 0.0 {
        return OrbitType::Escape;
    }
    if !perigee_km.is_finite() || perigee_km < 0.0 {
        return OrbitType::Escape;
    }

    let average = (perigee_km + apogee_km) / 2.0;
    let geo_low = GEO_ALTITUDE_KM - GEO_TOLERANCE_KM;
    let geo_high = GEO_ALTITUDE_KM + GEO_TOLERANCE_KM;

    if average < LEO_CEILING_KM {
        OrbitType::Leo
    } else if average < geo_low {
        OrbitType::Meo
    } else if average <= geo_high {
        OrbitType::Geo
    } else {
        OrbitType::Heo
    }
}

/// The narrow slice of a catalog record the kernel needs.
///
/// This is also the per-satellite payload of the geometry worker request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SatelliteInput {
    pub id: String,
    pub perigee_km: f64,
    pub apogee_km: f64,
    pub inclination_deg: f64,
    pub site_latitude_deg: f64,
    pub site_longitude_deg: f64,
    pub orbit_type: OrbitType,
}

impl SatelliteInput {
    pub fn new(
        id: impl Into<String>,
        perigee_km: f64,
        apogee_km: f64,
        inclination_deg: f64,
        site_latitude_deg: f64,
        site_longitude_deg: f64,
    ) -> Self {
        Self {
            id: id.into(),
            perigee_km,
            apogee_km,
            inclination_deg,
            site_latitude_deg,
            site_longitude_deg,
            orbit_type: classify_orbit(perigee_km, apogee_km),
        }
    }

    pub fn is_escape(&self) -> bool {
        self.orbit_type == OrbitType::Escape
            || classify_orbit(self.perigee_km, self.apogee_km) == OrbitType::Escape
    }

    /// Perigee with the visualization floor applied
    pub fn clamped_perigee_km(&self) -> f64 {
        self.perigee_km.max(MIN_PERIGEE_KM)
    }

    /// Apogee with the visualization cap applied
    pub fn clamped_apogee_km(&self) -> f64 {
        self.apogee_km.min(MAX_APOGEE_KM)
    }

    /// Altitude the ascent targets: mean of the clamped perigee/apogee
    pub fn target_altitude_km(&self) -> f64 {
        (self.clamped_perigee_km() + self.clamped_apogee_km()) / 2.0
    }
}

pub mod transforms {
    use nalgebra::Point3;

    use super::EARTH_RADIUS_KM;

    /// Normalized radius of a point `altitude_km` above the surface
    #[inline]
    pub fn radius_at(altitude_km: f64) -> f64 {
        1.0 + altitude_km / EARTH_RADIUS_KM
    }

    /// Geodetic (spherical) position to the Y-up normalized frame
    pub fn geodetic_to_world(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Point3<f64> {
        let r = radius_at(altitude_km);
        let phi = (90.0 - latitude_deg).to_radians();
        let theta = (longitude_deg + 180.0).to_radians();

        Point3::new(
            -r * phi.sin() * theta.cos(),
            r * phi.cos(),
            r * phi.sin() * theta.sin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify_orbit(400.0, 400.0), OrbitType::Leo);
        assert_eq!(classify_orbit(20_000.0, 20_400.0), OrbitType::Meo);
        assert_eq!(classify_orbit(35_786.0, 35_786.0), OrbitType::Geo);
        assert_eq!(classify_orbit(35_000.0, 35_000.0), OrbitType::Meo);
        assert_eq!(classify_orbit(500.0, 400_000.0), OrbitType::Heo);
    }

    #[test]
    fn test_geo_window_edges() {
        assert_eq!(classify_orbit(35_286.0, 35_286.0), OrbitType::Geo);
        assert_eq!(classify_orbit(36_286.0, 36_286.0), OrbitType::Geo);
        assert_eq!(classify_orbit(36_300.0, 36_300.0), OrbitType::Heo);
    }

    #[test]
    fn test_escape_conventions() {
        assert_eq!(classify_orbit(400.0, -1.0), OrbitType::Escape);
        assert_eq!(classify_orbit(400.0, f64::NAN), OrbitType::Escape);
        assert_eq!(classify_orbit(400.0, f64::INFINITY), OrbitType::Escape);
        assert_eq!(classify_orbit(-5.0, 400.0), OrbitType::Escape);
    }

    #[test]
    fn test_geodetic_radius() {
        let p = transforms::geodetic_to_world(28.5, -80.6, 400.0);
        assert!((p.coords.norm() - transforms::radius_at(400.0)).abs() < 1e-12);
        assert!((p.y - transforms::radius_at(400.0) * 28.5f64.to_radians().sin()).abs() < 1e-12);
    }

    #[test]
    fn test_north_pole_is_up() {
        let p = transforms::geodetic_to_world(90.0, 0.0, 0.0);
        assert!((p.y - 1.0).abs() < 1e-12);
        assert!(p.x.abs() < 1e-12 && p.z.abs() < 1e-12);
    }
}
