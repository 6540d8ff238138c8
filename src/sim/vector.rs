//! 2D vector value type used by the simulation
//!
//! Double precision on purpose: particle ages and positions are integrated
//! every frame for the whole lifetime of the page.

use std::ops::{Add, AddAssign, Mul, Sub};

use glam::Vec2;

/// A point or direction in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean norm
    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Scale to unit length in place.
    ///
    /// A zero vector yields NaN components; callers must not pass one.
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.length();
        self.x /= length;
        self.y /= length;
        self
    }

    /// Normalize, then scale to `target` magnitude in place
    pub fn set_length(&mut self, target: f64) -> &mut Self {
        self.normalize();
        self.x *= target;
        self.y *= target;
        self
    }

    /// Copy of this vector scaled to `target` magnitude
    #[inline]
    pub fn with_length(mut self, target: f64) -> Self {
        self.set_length(target);
        self
    }

    /// Narrow to single precision for GPU upload
    #[inline]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl From<Vector2> for Vec2 {
    fn from(v: Vector2) -> Self {
        v.as_vec2()
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}
