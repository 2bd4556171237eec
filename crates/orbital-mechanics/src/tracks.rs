//! Orbit and ascent track generation
//!
//! Contract: for every non-escape input, the last ascent point (at
//! `progress = 1`) coincides with the first orbit point. Both tracks derive
//! from the same insertion angle and the same orientation matrix.

use std::f64::consts::TAU;

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

use crate::insertion::insertion_angle_local;
use crate::params::{compute_orbital_params, OrbitalParams};
use crate::transforms::geodetic_to_world;
use crate::{SatelliteInput, ESCAPE_MIN_ALTITUDE_KM};

/// Outward extension factor of the escape ray
const ESCAPE_RAY_FACTOR: f64 = 3.0;

/// Reusable scratch for track generation.
///
/// Every generator call overwrites both fields. Nothing may hold on to them
/// past the call that filled them.
#[derive(Debug, Clone)]
pub struct OrbitScratch {
    inverse: Matrix4<f64>,
    local_ground: Point3<f64>,
}

impl Default for OrbitScratch {
    fn default() -> Self {
        Self {
            inverse: Matrix4::identity(),
            local_ground: Point3::origin(),
        }
    }
}

impl OrbitScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the inverse orientation and the launch site in the orbit's local frame
    fn prepare(&mut self, input: &SatelliteInput, params: &OrbitalParams) {
        self.inverse = params.inverse_matrix();
        let ground = geodetic_to_world(input.site_latitude_deg, input.site_longitude_deg, 0.0);
        self.local_ground = self.inverse.transform_point(&ground);
    }
}

/// Precomputed tracks for one satellite, flattened to xyz triples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryResult {
    pub id: String,
    pub orbit_positions: Vec<f32>,
    pub ascent_positions: Vec<f32>,
    pub total_orbit_points: usize,
    pub total_ascent_points: usize,
}

impl GeometryResult {
    /// Position buffer bytes held by this result
    pub fn byte_len(&self) -> usize {
        (self.orbit_positions.len() + self.ascent_positions.len()) * std::mem::size_of::<f32>()
    }
}

fn escape_altitude_km(input: &SatelliteInput) -> f64 {
    // f64::max ignores NaN, so a missing perigee lands on the floor
    input.perigee_km.max(ESCAPE_MIN_ALTITUDE_KM)
}

fn orbit_with(
    input: &SatelliteInput,
    segments: usize,
    scratch: &mut OrbitScratch,
    mut sink: impl FnMut(Point3<f64>),
) -> usize {
    let params = compute_orbital_params(input);

    if params.is_escape {
        let start = geodetic_to_world(
            input.site_latitude_deg,
            input.site_longitude_deg,
            escape_altitude_km(input),
        );
        sink(start);
        sink(Point3::from(start.coords * ESCAPE_RAY_FACTOR));
        return 2;
    }

    let segments = segments.max(1);
    let (a, b) = (params.semi_major_axis, params.semi_minor_axis);

    // scratch now holds this satellite's inverse/local ground point
    scratch.prepare(input, &params);
    let start = insertion_angle_local(&scratch.local_ground, a, b);

    for i in 0..=segments {
        let theta = start + TAU * i as f64 / segments as f64;
        let local = Point3::new(a * theta.cos(), 0.0, b * theta.sin());
        sink(params.matrix.transform_point(&local));
    }

    segments + 1
}

fn ascent_with(
    input: &SatelliteInput,
    segments: usize,
    progress: f64,
    scratch: &mut OrbitScratch,
    mut sink: impl FnMut(Point3<f64>),
) -> usize {
    let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
    let params = compute_orbital_params(input);

    if params.is_escape {
        let lat = input.site_latitude_deg;
        let lng = input.site_longitude_deg;
        sink(geodetic_to_world(lat, lng, 0.0));
        sink(geodetic_to_world(lat, lng, escape_altitude_km(input) * progress));
        return 2;
    }

    let segments = segments.max(1);

    // scratch now holds this satellite's inverse/local ground point
    scratch.prepare(input, &params);
    let ground = scratch.local_ground;

    let start_angle = ground.z.atan2(ground.x);
    let start_radius = (ground.x * ground.x + ground.z * ground.z).sqrt();

    let insertion = insertion_angle_local(&ground, params.semi_major_axis, params.semi_minor_axis);
    // Parametric angle is not the bearing on a non-circular ellipse
    let target_angle = params.geometric_angle(insertion);

    // Always wind up at least one full revolution before insertion
    let sweep = (target_angle - start_angle).rem_euclid(TAU) + TAU;

    for i in 0..=segments {
        let t = progress * i as f64 / segments as f64;
        let angle = start_angle + sweep * t;

        let ease = t * (2.0 - t);
        let radius = start_radius + (params.radius_at(angle) - start_radius) * ease;
        let off_plane = ground.y * (1.0 - t) * (1.0 - t);

        let local = Point3::new(radius * angle.cos(), off_plane, radius * angle.sin());
        sink(params.matrix.transform_point(&local));
    }

    segments + 1
}

/// Full closed orbit starting at the insertion point (`segments + 1` points).
///
/// Escape trajectories yield a 2-point outward ray.
pub fn generate_orbit_points(input: &SatelliteInput, segments: usize) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(segments + 1);
    orbit_with(input, segments, &mut OrbitScratch::new(), |p| points.push(p));
    points
}

/// Ascent from the launch site to the insertion point, revealed up to `progress`.
///
/// `progress = 1` gives the full track used for caching. Escape
/// trajectories yield 2 points along the local vertical.
pub fn generate_ascent_points(
    input: &SatelliteInput,
    segments: usize,
    progress: f64,
) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(segments + 1);
    ascent_with(input, segments, progress, &mut OrbitScratch::new(), |p| points.push(p));
    points
}

/// Orbit track written into a caller-owned buffer (cleared first).
/// Returns the point count.
pub fn generate_orbit_into(
    input: &SatelliteInput,
    segments: usize,
    scratch: &mut OrbitScratch,
    out: &mut Vec<f32>,
) -> usize {
    out.clear();
    out.reserve(3 * (segments + 1));
    orbit_with(input, segments, scratch, |p| push_point(out, &p))
}

/// Ascent track written into a caller-owned buffer (cleared first).
/// Returns the point count.
pub fn generate_ascent_into(
    input: &SatelliteInput,
    segments: usize,
    progress: f64,
    scratch: &mut OrbitScratch,
    out: &mut Vec<f32>,
) -> usize {
    out.clear();
    out.reserve(3 * (segments + 1));
    ascent_with(input, segments, progress, scratch, |p| push_point(out, &p))
}

#[inline]
fn push_point(out: &mut Vec<f32>, p: &Point3<f64>) {
    out.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
}

/// Flatten points to an xyz `f32` buffer
pub fn flatten_points(points: &[Point3<f64>]) -> Vec<f32> {
    let mut out = Vec::with_capacity(points.len() * 3);
    for p in points {
        push_point(&mut out, p);
    }
    out
}

/// Both full tracks for one satellite.
///
/// Shared by the background worker and the render-thread fallback, so the
/// two paths produce identical buffers.
pub fn compute_geometry(input: &SatelliteInput, segments: usize) -> GeometryResult {
    let mut scratch = OrbitScratch::new();
    let mut orbit_positions = Vec::new();
    let mut ascent_positions = Vec::new();

    let total_orbit_points = generate_orbit_into(input, segments, &mut scratch, &mut orbit_positions);
    let total_ascent_points =
        generate_ascent_into(input, segments, 1.0, &mut scratch, &mut ascent_positions);

    GeometryResult {
        id: input.id.clone(),
        orbit_positions,
        ascent_positions,
        total_orbit_points,
        total_ascent_points,
    }
}
