//! Parametric heart curve
//!
//! `t` runs over [-π, π]. The curve is mirror-symmetric about the y axis and
//! lives in a roughly 320 x 250 box with y pointing up.

use std::f64::consts::PI;

use rand::Rng;

use super::vector::Vector2;

/// Curve-space width mapped onto one sprite edge
pub const HEART_EXTENT: f64 = 350.0;

/// Point on the heart outline for parameter `t`
pub fn point_on_heart(t: f64) -> Vector2 {
    Vector2::new(
        160.0 * t.sin().powi(3),
        130.0 * t.cos() - 50.0 * (2.0 * t).cos() - 20.0 * (3.0 * t).cos() - 10.0 * (4.0 * t).cos()
            + 25.0,
    )
}

/// Trace the outline from `t = -π`, advancing by `step` while `t < π`.
///
/// Yields the start point followed by every stepped point, so the last point
/// lands at or just past `π`. A non-positive `step` yields only the start.
pub fn outline(step: f64) -> impl Iterator<Item = Vector2> {
    let mut t = -PI;
    let mut started = false;
    std::iter::from_fn(move || {
        if !started {
            started = true;
            return Some(point_on_heart(t));
        }
        if step <= 0.0 || t >= PI {
            return None;
        }
        t += step;
        Some(point_on_heart(t))
    })
}

/// Where and how fast a new particle leaves the outline.
///
/// Both vectors are in curve space (y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spawn {
    pub offset: Vector2,
    pub direction: Vector2,
}

/// Pick a random point on the outline and a radial launch velocity
pub fn sample_spawn<R: Rng + ?Sized>(rng: &mut R, velocity: f64) -> Spawn {
    let u: f64 = rng.random();
    let offset = point_on_heart(PI - 2.0 * PI * u);
    Spawn {
        offset,
        direction: offset.with_length(velocity),
    }
}
