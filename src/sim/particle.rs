//! A single pooled particle

use super::vector::Vector2;
use crate::renderer::{Sprite, Surface};

/// Cubic ease-out: fast growth early, flattening towards `t = 1`
#[inline]
pub fn ease(t: f64) -> f64 {
    let u = t - 1.0;
    u * u * u + 1.0
}

/// Derived render parameters for one particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// Edge length of the drawn sprite in pixels
    pub size: f64,
    /// Global alpha in [0, 1] while the particle is alive
    pub opacity: f64,
}

/// A particle slot. Reused in place by `ParticlePool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Particle {
    pub position: Vector2,
    pub velocity: Vector2,
    pub acceleration: Vector2,
    /// Seconds since the last `initialize`
    pub age: f64,
}

impl Particle {
    /// Overwrite every field of this slot for a fresh particle.
    ///
    /// Acceleration is the initial velocity scaled by `effect`, so a negative
    /// factor decelerates the particle along its launch direction.
    pub fn initialize(&mut self, x: f64, y: f64, dx: f64, dy: f64, effect: f64) {
        self.position = Vector2::new(x, y);
        self.velocity = Vector2::new(dx, dy);
        self.acceleration = Vector2::new(dx * effect, dy * effect);
        self.age = 0.0;
    }

    /// Advance by `delta_time` seconds.
    ///
    /// Position uses the velocity from before this step.
    pub fn update(&mut self, delta_time: f64) {
        self.position += self.velocity * delta_time;
        self.velocity += self.acceleration * delta_time;
        self.age += delta_time;
    }

    #[inline]
    pub fn is_expired(&self, duration: f64) -> bool {
        self.age >= duration
    }

    /// Size and opacity at the current age. Not clamped past `duration`.
    pub fn appearance(&self, sprite_size: f64, duration: f64) -> Appearance {
        let t = self.age / duration;
        Appearance {
            size: sprite_size * ease(t),
            opacity: 1.0 - t,
        }
    }

    /// Draw the sprite centered on the particle
    pub fn draw<S: Surface>(&self, surface: &mut S, sprite: &S::Image, duration: f64) {
        let Appearance { size, opacity } = self.appearance(sprite.size() as f64, duration);
        surface.draw_image(
            sprite,
            self.position.x - size / 2.0,
            self.position.y - size / 2.0,
            size,
            size,
            opacity,
        );
    }
}
