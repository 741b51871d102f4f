//! Geometry calculations for placement and antenna direction.
//!
//! Contains helper functions for:
//! - Distance calculations (squared distance where only comparisons are needed)
//! - Angle between two directions seen from a common origin
//! - Uniform-ish sampling of positions inside a disc

use rand::Rng;

use super::types::Point;

/// Squared Euclidean distance in meters².
pub fn distance2(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

pub fn distance(a: &Point, b: &Point) -> f64 {
    distance2(a, b).sqrt()
}

/// Angle in degrees (0..=180) between the directions `origin → first` and
/// `origin → second`.
///
/// A zero-length direction has no orientation; the angle is reported as 0
/// in that case.
pub fn angle_between(origin: &Point, first: &Point, second: &Point) -> f64 {
    let (ax, ay) = (first.x - origin.x, first.y - origin.y);
    let (bx, by) = (second.x - origin.x, second.y - origin.y);
    let norms = (ax * ax + ay * ay).sqrt() * (bx * bx + by * by).sqrt();
    if norms == 0.0 {
        return 0.0;
    }
    // Clamp to guard acos against rounding just outside [-1, 1]
    let cosine = ((ax * bx + ay * by) / norms).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// Draw a position inside the disc of `radius` around `center`.
///
/// Two uniform numbers `a <= b` give radius `b·R` and angle `2π·a/b`, which
/// spreads points evenly over the area without a rejection loop.
pub fn sample_in_disc<R: Rng + ?Sized>(center: &Point, radius: f64, rng: &mut R) -> Point {
    let mut a: f64 = rng.gen_range(0.0..1.0);
    let mut b: f64 = rng.gen_range(0.0..1.0);
    if b < a {
        std::mem::swap(&mut a, &mut b);
    }
    if b == 0.0 {
        return *center;
    }
    let angle = 2.0 * std::f64::consts::PI * a / b;
    Point {
        x: b * radius * angle.cos() + center.x,
        y: b * radius * angle.sin() + center.y,
    }
}
