//! Effect settings
//!
//! Read once at startup. On the web the JSON comes from the canvas
//! `data-settings` attribute, natively from an optional file argument.
//! Missing fields fall back to the defaults in `crate::consts`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Settings parse/validation failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid color {0:?}, expected #rrggbb")]
    Color(String),

    #[error("particles.{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear-space float components for GPU clear colors
    pub fn to_linear(self) -> [f64; 3] {
        fn channel(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

impl FromStr for Rgb {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SettingsError::Color(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

/// Particle system tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    /// Pool capacity (maximum live particles)
    pub length: usize,
    /// Particle lifetime in seconds
    pub duration: f64,
    /// Launch speed in pixels/second
    pub velocity: f64,
    /// Acceleration curl factor
    pub effect: f64,
    /// Sprite size in pixels
    pub size: u32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            length: DEFAULT_CAPACITY,
            duration: DEFAULT_DURATION,
            velocity: DEFAULT_VELOCITY,
            effect: DEFAULT_EFFECT,
            size: DEFAULT_SPRITE_SIZE,
        }
    }
}

/// Top-level effect settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub particles: ParticleSettings,
    /// Sprite fill color, `#rrggbb`
    pub color: String,
    /// Canvas clear color, `#rrggbb`
    pub background: String,
    /// Spawn RNG seed; the frame clock is used when absent
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            particles: ParticleSettings::default(),
            color: DEFAULT_COLOR.to_string(),
            background: DEFAULT_BACKGROUND.to_string(),
            seed: None,
        }
    }
}

impl Settings {
    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges the simulation relies on
    pub fn validate(&self) -> Result<(), SettingsError> {
        let p = &self.particles;
        if p.length == 0 {
            return Err(SettingsError::OutOfRange {
                field: "length",
                value: 0.0,
            });
        }
        if !p.duration.is_finite() || p.duration <= 0.0 {
            return Err(SettingsError::OutOfRange {
                field: "duration",
                value: p.duration,
            });
        }
        if !p.velocity.is_finite() {
            return Err(SettingsError::OutOfRange {
                field: "velocity",
                value: p.velocity,
            });
        }
        if !p.effect.is_finite() {
            return Err(SettingsError::OutOfRange {
                field: "effect",
                value: p.effect,
            });
        }
        if p.size == 0 {
            return Err(SettingsError::OutOfRange {
                field: "size",
                value: 0.0,
            });
        }
        self.color()?;
        self.background()?;
        Ok(())
    }

    pub fn color(&self) -> Result<Rgb, SettingsError> {
        self.color.parse()
    }

    pub fn background(&self) -> Result<Rgb, SettingsError> {
        self.background.parse()
    }

    /// Particles spawned per second so the pool turns over once per lifetime
    pub fn spawn_rate(&self) -> f64 {
        self.particles.length as f64 / self.particles.duration
    }

    /// Load settings from the canvas `data-settings` attribute (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load(canvas: &web_sys::HtmlCanvasElement) -> Self {
        match canvas.get_attribute("data-settings") {
            Some(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from canvas data-settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring data-settings: {}", e);
                    Self::default()
                }
            },
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Load settings from a JSON file, defaults when no path is given
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
