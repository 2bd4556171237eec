//! Insertion angle search
//!
//! Finds the parametric angle on the orbit ellipse nearest the point above
//! the launch site. Coarse scan of 72 angles, then two refinement passes
//! (window of +/-2 and +/-0.2 coarse steps, 11 candidates each).
//!
//! Bounded, allocation-free hill-climb rather than a closed-form solve. For
//! near-circular, steeply inclined ellipses it can settle on a local minimum
//! a little off the true optimum; at render scale the difference is not
//! visible. Keep this behaviour: ascent and orbit tracks are both keyed off
//! the angle it returns.

use std::f64::consts::TAU;

use nalgebra::{Matrix4, Point3};

use crate::transforms::geodetic_to_world;
use crate::SatelliteInput;

pub const COARSE_SAMPLES: usize = 72;
pub const REFINE_SAMPLES: usize = 11;

/// Refinement half-windows in units of the coarse step
const REFINE_WINDOWS: [f64; 2] = [2.0, 0.2];

/// Find the insertion angle (radians, parametric).
///
/// `matrix` must be the same orientation used to transform the final orbit
/// points, otherwise ascent and orbit will visibly disagree.
pub fn find_insertion_angle(input: &SatelliteInput, a: f64, b: f64, matrix: &Matrix4<f64>) -> f64 {
    let inverse = matrix.try_inverse().unwrap_or_else(Matrix4::identity);
    let ground = geodetic_to_world(input.site_latitude_deg, input.site_longitude_deg, 0.0);
    insertion_angle_local(&inverse.transform_point(&ground), a, b)
}

/// Same search with the ground point already in the orbit's local frame
pub fn insertion_angle_local(local: &Point3<f64>, a: f64, b: f64) -> f64 {
    let distance_sq = |theta: f64| {
        let dx = a * theta.cos() - local.x;
        let dz = b * theta.sin() - local.z;
        dx * dx + local.y * local.y + dz * dz
    };

    let step = TAU / COARSE_SAMPLES as f64;

    let mut best = 0.0;
    let mut best_d = distance_sq(best);
    for i in 1..COARSE_SAMPLES {
        let theta = i as f64 * step;
        let d = distance_sq(theta);
        if d < best_d {
            best = theta;
            best_d = d;
        }
    }

    for window in REFINE_WINDOWS {
        let half = window * step;
        let center = best;
        for k in 0..REFINE_SAMPLES {
            let theta = center - half + 2.0 * half * k as f64 / (REFINE_SAMPLES - 1) as f64;
            let d = distance_sq(theta);
            if d < best_d {
                best = theta;
                best_d = d;
            }
        }
    }

    best
}
