//! Polar and normalized-canvas coordinate conversions.
//!
//! # Responsibility
//! - Map `(ring, angle)` pairs onto the fixed square canvas and back.
//! - Provide one canonical angle range for every comparison.
//!
//! # Invariants
//! - Canonical angles live in `(-PI, PI]`.
//! - Normalized coordinates are `[0, 1]` fractions of `CANVAS_SIZE` for any
//!   ring that fits inside the canvas.

use std::f64::consts::{PI, TAU};

/// Edge length of the square canvas in pixels. The canvas center is the
/// origin of every ring.
pub const CANVAS_SIZE: f64 = 640.0;

/// Point in normalized canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

/// Point in polar space around the canvas center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarPoint {
    pub ring: f64,
    pub angle: f64,
}

/// Folds any finite angle into `(-PI, PI]`.
///
/// Angles already in range are returned untouched so repeated
/// normalization never drifts.
pub fn normalize_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let folded = angle.rem_euclid(TAU);
    if folded > PI {
        folded - TAU
    } else {
        folded
    }
}

/// Maps polar coordinates to normalized canvas coordinates.
pub fn polar_to_normalized(ring: f64, angle: f64) -> NormalizedPoint {
    let center = CANVAS_SIZE / 2.0;
    NormalizedPoint {
        x: (angle.cos() * ring + center) / CANVAS_SIZE,
        y: (angle.sin() * ring + center) / CANVAS_SIZE,
    }
}

/// Maps normalized canvas coordinates back to polar coordinates.
///
/// Returns `None` when either input is not finite, which callers treat as
/// "no normalized position available".
pub fn normalized_to_polar(x: f64, y: f64) -> Option<PolarPoint> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let center = CANVAS_SIZE / 2.0;
    let dx = x * CANVAS_SIZE - center;
    let dy = y * CANVAS_SIZE - center;
    Some(PolarPoint {
        ring: dx.hypot(dy),
        angle: normalize_angle(dy.atan2(dx)),
    })
}

/// Shortest signed angular distance from `b` to `a`, in `(-PI, PI]`.
pub fn signed_angle_difference(a: f64, b: f64) -> f64 {
    normalize_angle(normalize_angle(a) - normalize_angle(b))
}

/// Shortest unsigned angular distance between two angles, in `[0, PI]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    signed_angle_difference(a, b).abs()
}
