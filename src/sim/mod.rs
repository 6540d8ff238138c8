//! Particle simulation module
//!
//! Everything here is pure and allocation-free after construction:
//! - Plain `Copy` vectors, no aliasing between particles
//! - Fixed-capacity pool, slots are reinitialized in place
//! - No rendering or platform dependencies beyond the `Surface` trait

pub mod heart;
pub mod particle;
pub mod pool;
pub mod vector;

pub use heart::{HEART_EXTENT, Spawn, outline, point_on_heart, sample_spawn};
pub use particle::{Appearance, Particle, ease};
pub use pool::ParticlePool;
pub use vector::Vector2;
