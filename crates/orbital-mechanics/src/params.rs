//! Ellipse parameters and orientation

use nalgebra::{Matrix4, Rotation3, Vector3};

use crate::{SatelliteInput, EARTH_RADIUS_KM};

/// Derived ellipse for one satellite (normalized units, Earth radius = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalParams {
    pub semi_major_axis: f64,
    pub semi_minor_axis: f64,
    pub is_escape: bool,
    /// `rotationY(ascending node) * rotationX(inclination)`
    pub matrix: Matrix4<f64>,
}

impl OrbitalParams {
    pub fn escape() -> Self {
        Self {
            semi_major_axis: 0.0,
            semi_minor_axis: 0.0,
            is_escape: true,
            matrix: Matrix4::identity(),
        }
    }

    /// Polar radius of the centred ellipse at geometric angle `theta`
    #[inline]
    pub fn radius_at(&self, theta: f64) -> f64 {
        let (a, b) = (self.semi_major_axis, self.semi_minor_axis);
        let bc = b * theta.cos();
        let as_ = a * theta.sin();
        a * b / (bc * bc + as_ * as_).sqrt()
    }

    /// Geometric bearing of the point at parametric angle `theta`
    #[inline]
    pub fn geometric_angle(&self, parametric: f64) -> f64 {
        (self.semi_minor_axis * parametric.sin()).atan2(self.semi_major_axis * parametric.cos())
    }

    /// Inverse of the orientation (a pure rotation, so the inverse always exists)
    pub fn inverse_matrix(&self) -> Matrix4<f64> {
        self.matrix.try_inverse().unwrap_or_else(Matrix4::identity)
    }
}

/// Deterministic string hash in [0, 1).
///
/// FNV-1a over the UTF-8 bytes. Only used to fan orbital planes out around
/// the pole; it carries no physical meaning.
pub fn id_hash(id: &str) -> f64 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in id.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash as f64 / 4_294_967_296.0
}

/// Longitude of the ascending node in degrees.
///
/// Presentation choice: launch-site longitude plus a per-id pseudo-random
/// offset. Catalog rows carry no RAAN, and without the offset every launch
/// from one site would share a single plane.
pub fn ascending_node_deg(input: &SatelliteInput) -> f64 {
    input.site_longitude_deg + id_hash(&input.id) * 360.0
}

/// Compute ellipse axes and orientation for a satellite.
///
/// Perigee is floored at 100 km and apogee capped at 100,000 km. Both are
/// visualization limits. Same input always yields the same bits; the worker
/// and the render thread rely on that for cache coherency.
pub fn compute_orbital_params(input: &SatelliteInput) -> OrbitalParams {
    if input.is_escape() {
        return OrbitalParams::escape();
    }

    let perigee_km = input.clamped_perigee_km();
    let apogee_km = input.clamped_apogee_km();

    let semi_major_km = (perigee_km + apogee_km) / 2.0 + EARTH_RADIUS_KM;
    let semi_minor_km = ((perigee_km + EARTH_RADIUS_KM) * (apogee_km + EARTH_RADIUS_KM)).sqrt();

    let node = ascending_node_deg(input).to_radians();
    let inclination = input.inclination_deg.to_radians();
    let inclination = if inclination.is_finite() { inclination } else { 0.0 };

    let rot_y = Rotation3::from_axis_angle(&Vector3::y_axis(), node);
    let rot_x = Rotation3::from_axis_angle(&Vector3::x_axis(), inclination);

    OrbitalParams {
        semi_major_axis: semi_major_km / EARTH_RADIUS_KM,
        semi_minor_axis: semi_minor_km / EARTH_RADIUS_KM,
        is_escape: false,
        matrix: (rot_y * rot_x).to_homogeneous(),
    }
}
