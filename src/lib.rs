//! Pinkboard - a looping heart-shaped particle animation
//!
//! Core modules:
//! - `sim`: Particle lifecycle, circular particle pool and the heart curve
//! - `renderer`: Drawing surfaces (software raster and WebGPU sprite batch)
//! - `effect`: Per-frame driver owning the pool, sprite, clock and spawn rate
//! - `settings`: Startup configuration

pub mod effect;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use effect::{FrameClock, FrameStats, HeartEffect};
pub use settings::{ParticleSettings, Rgb, Settings, SettingsError};

/// Effect configuration defaults
pub mod consts {
    /// Maximum amount of live particles
    pub const DEFAULT_CAPACITY: usize = 500;
    /// Particle lifetime in seconds
    pub const DEFAULT_DURATION: f64 = 2.0;
    /// Spawn velocity in pixels/second
    pub const DEFAULT_VELOCITY: f64 = 100.0;
    /// Acceleration curl factor (negative decelerates)
    pub const DEFAULT_EFFECT: f64 = -0.75;
    /// Sprite edge length in pixels
    pub const DEFAULT_SPRITE_SIZE: u32 = 30;
    /// Sprite fill color
    pub const DEFAULT_COLOR: &str = "#ea80b0";
    /// Canvas clear color
    pub const DEFAULT_BACKGROUND: &str = "#000000";

    /// Parameter step used when tracing the heart outline
    pub const OUTLINE_STEP: f64 = 0.01;

    /// Number of frame timestamps used for the FPS estimate
    pub const FPS_WINDOW: usize = 60;
}
