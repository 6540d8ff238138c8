//! Rendering module
//!
//! The simulation only talks to a `Surface`: a canvas-like target that can be
//! cleared and can blit a sprite into a rectangle with a global alpha.
//! Two implementations live here:
//! - `raster::Raster`: CPU RGBA buffer (sprite pre-render, headless runs, tests)
//! - `sprite_pipeline::GpuSurface`: WebGPU instanced sprite batch

pub mod raster;
pub mod sprite;
pub mod sprite_pipeline;
pub mod vertex;

pub use raster::Raster;
pub use sprite::SpriteImage;
pub use sprite_pipeline::{GpuSprite, GpuSurface, RenderError};

/// Anything that can be drawn by `Surface::draw_image`
pub trait Sprite {
    /// Edge length of the square source image in pixels
    fn size(&self) -> u32;
}

/// A 2D drawing target in canvas pixels (origin top-left, y down)
pub trait Surface {
    type Image: Sprite;

    /// Current pixel dimensions; may change between frames
    fn size(&self) -> (u32, u32);

    /// Reset the whole surface to its background
    fn clear(&mut self);

    /// Draw `image` scaled into the given rectangle, blended with `alpha`.
    ///
    /// Degenerate rectangles (empty or non-finite) draw nothing.
    fn draw_image(
        &mut self,
        image: &Self::Image,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        alpha: f64,
    );
}
