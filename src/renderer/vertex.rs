//! GPU-side types for the sprite batch

use bytemuck::{Pod, Zeroable};

/// One sprite quad, stepped per instance
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// Destination rectangle in canvas pixels: x, y, width, height
    pub rect: [f32; 4],
    pub alpha: f32,
}

impl SpriteInstance {
    pub fn new(x: f64, y: f64, width: f64, height: f64, alpha: f64) -> Self {
        Self {
            rect: [x as f32, y as f32, width as f32, height as f32],
            alpha: alpha.clamp(0.0, 1.0) as f32,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Per-frame uniforms (must match `sprite_shader.wgsl`)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Globals {
    pub resolution: [f32; 2],
    pub _pad: [f32; 2],
}

impl Globals {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 20);
        assert_eq!(std::mem::size_of::<Globals>(), 16);
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_eq!(SpriteInstance::new(0.0, 0.0, 1.0, 1.0, 1.5).alpha, 1.0);
        assert_eq!(SpriteInstance::new(0.0, 0.0, 1.0, 1.0, -0.2).alpha, 0.0);
    }
}
