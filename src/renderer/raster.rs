//! CPU raster surface
//!
//! Straight-alpha RGBA8 pixels, row-major. Sampling happens at pixel centers,
//! so a rectangle covers the pixels whose centers fall inside it.

use glam::Vec2;

use super::Surface;
use super::sprite::SpriteImage;
use crate::settings::Rgb;

/// Owned RGBA8 image that doubles as a drawing surface
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    background: [u8; 4],
}

impl Raster {
    /// Transparent raster of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, [0, 0, 0, 0])
    }

    /// Raster cleared to `background`
    pub fn with_background(width: u32, height: u32, background: [u8; 4]) -> Self {
        let mut raster = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            background,
        };
        raster.fill(background);
        raster
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at `(x, y)`, `None` outside the raster
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Reallocate for a new size and clear to the background
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
        self.fill(self.background);
    }

    fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Fill a closed polygon with an opaque color (even-odd rule)
    pub fn fill_polygon(&mut self, points: &[Vec2], color: Rgb) {
        if points.len() < 3 {
            return;
        }
        let rgba = [color.r, color.g, color.b, 255];
        let mut crossings: Vec<f32> = Vec::with_capacity(points.len());

        for row in 0..self.height {
            let y = row as f32 + 0.5;
            crossings.clear();

            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
                    crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(f32::total_cmp);

            for span in crossings.chunks_exact(2) {
                // Pixel centers in [span[0], span[1])
                let start = (span[0] - 0.5).ceil().max(0.0) as u32;
                let end = ((span[1] - 0.5).ceil().max(0.0) as u32).min(self.width);
                for col in start..end {
                    let i = self.offset(col, row);
                    self.pixels[i..i + 4].copy_from_slice(&rgba);
                }
            }
        }
    }

    /// Source-over blend of `src` (straight alpha) scaled by `alpha`
    fn blend(&mut self, x: u32, y: u32, src: &[u8], alpha: f32) {
        let sa = src[3] as f32 / 255.0 * alpha;
        if sa <= 0.0 {
            return;
        }
        let i = self.offset(x, y);
        let dst = &mut self.pixels[i..i + 4];
        let da = dst[3] as f32 / 255.0;
        let oa = sa + da * (1.0 - sa);
        for c in 0..3 {
            let sc = src[c] as f32;
            let dc = dst[c] as f32;
            dst[c] = ((sc * sa + dc * da * (1.0 - sa)) / oa).round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

impl Surface for Raster {
    type Image = SpriteImage;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.fill(self.background);
    }

    fn draw_image(
        &mut self,
        image: &SpriteImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        alpha: f64,
    ) {
        if !(width > 0.0 && height > 0.0 && alpha > 0.0)
            || !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite())
        {
            return;
        }
        let src = image.raster();
        if src.width == 0 || src.height == 0 {
            return;
        }
        let alpha = alpha.min(1.0) as f32;

        // Destination pixels whose centers fall inside the rectangle
        let x0 = (x - 0.5).ceil().max(0.0);
        let y0 = (y - 0.5).ceil().max(0.0);
        let x1 = (x + width - 0.5).ceil().min(self.width as f64);
        let y1 = (y + height - 0.5).ceil().min(self.height as f64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for row in y0 as u32..y1 as u32 {
            let v = ((row as f64 + 0.5 - y) / height * src.height as f64) as u32;
            let v = v.min(src.height - 1);
            for col in x0 as u32..x1 as u32 {
                let u = ((col as f64 + 0.5 - x) / width * src.width as f64) as u32;
                let u = u.min(src.width - 1);
                let s = src.offset(u, v);
                let texel = [
                    src.pixels[s],
                    src.pixels[s + 1],
                    src.pixels[s + 2],
                    src.pixels[s + 3],
                ];
                self.blend(col, row, &texel, alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x1, y1),
            Vec2::new(x0, y1),
        ]
    }

    #[test]
    fn test_new_is_transparent() {
        let raster = Raster::new(4, 3);
        assert_eq!(raster.pixels().len(), 4 * 3 * 4);
        assert_eq!(raster.pixel(3, 2), Some([0, 0, 0, 0]));
        assert_eq!(raster.pixel(4, 0), None);
    }

    #[test]
    fn test_fill_polygon_covers_pixel_centers() {
        let mut raster = Raster::new(8, 8);
        raster.fill_polygon(&square(2.0, 2.0, 6.0, 6.0), Rgb::new(255, 0, 0));
        assert_eq!(raster.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(raster.pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(raster.pixel(1, 3), Some([0, 0, 0, 0]));
        assert_eq!(raster.pixel(6, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_image_scales_and_fades() {
        let mut sprite = Raster::new(2, 2);
        sprite.fill_polygon(&square(0.0, 0.0, 2.0, 2.0), Rgb::new(255, 255, 255));
        let sprite = SpriteImage::from_raster(sprite);

        let mut canvas = Raster::with_background(10, 10, [0, 0, 0, 255]);
        canvas.draw_image(&sprite, 2.0, 2.0, 4.0, 4.0, 0.5);

        // Half-white over opaque black
        assert_eq!(canvas.pixel(3, 3), Some([128, 128, 128, 255]));
        assert_eq!(canvas.pixel(5, 5), Some([128, 128, 128, 255]));
        assert_eq!(canvas.pixel(6, 6), Some([0, 0, 0, 255]));

        canvas.clear();
        assert_eq!(canvas.pixel(3, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_image_ignores_degenerate_rects() {
        let sprite = SpriteImage::from_raster(Raster::with_background(2, 2, [255; 4]));
        let mut canvas = Raster::new(4, 4);
        let before = canvas.clone();
        canvas.draw_image(&sprite, f64::NAN, 0.0, 2.0, 2.0, 1.0);
        canvas.draw_image(&sprite, 0.0, 0.0, 0.0, 0.0, 1.0);
        canvas.draw_image(&sprite, 0.0, 0.0, 2.0, 2.0, 0.0);
        canvas.draw_image(&sprite, -10.0, -10.0, 2.0, 2.0, 1.0);
        assert_eq!(canvas, before);
    }

    #[test]
    fn test_draw_image_clips_to_bounds() {
        let sprite = SpriteImage::from_raster(Raster::with_background(2, 2, [255; 4]));
        let mut canvas = Raster::new(4, 4);
        canvas.draw_image(&sprite, 2.0, 2.0, 8.0, 8.0, 1.0);
        assert_eq!(canvas.pixel(3, 3), Some([255; 4]));
        assert_eq!(canvas.pixel(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_resize_clears() {
        let mut canvas = Raster::with_background(2, 2, [1, 2, 3, 255]);
        canvas.resize(3, 1);
        assert_eq!(canvas.size(), (3, 1));
        assert_eq!(canvas.pixel(2, 0), Some([1, 2, 3, 255]));
    }
}
