//! Pre-rendered particle sprite

use glam::Vec2;

use super::Sprite;
use super::raster::Raster;
use crate::consts::OUTLINE_STEP;
use crate::settings::Rgb;
use crate::sim::heart::{HEART_EXTENT, outline};

/// Square RGBA sprite, rendered once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteImage {
    raster: Raster,
}

impl SpriteImage {
    /// Wrap an existing raster; non-square rasters are sampled by width
    pub fn from_raster(raster: Raster) -> Self {
        Self { raster }
    }

    /// Fill the heart outline into a `size` x `size` image.
    ///
    /// Curve space (y up, centered) is mapped so `HEART_EXTENT` spans the edge.
    pub fn heart(size: u32, color: Rgb) -> Self {
        let half = size as f64 / 2.0;
        let scale = size as f64 / HEART_EXTENT;
        let polygon: Vec<Vec2> = outline(OUTLINE_STEP)
            .map(|p| Vec2::new((half + p.x * scale) as f32, (half - p.y * scale) as f32))
            .collect();

        let mut raster = Raster::new(size, size);
        raster.fill_polygon(&polygon, color);
        log::debug!("Rendered {}px heart sprite from {} points", size, polygon.len());
        Self { raster }
    }

    #[inline]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// RGBA8 bytes for texture upload
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        self.raster.pixels()
    }
}

impl Sprite for SpriteImage {
    fn size(&self) -> u32 {
        self.raster.width()
    }
}
