//! WebGPU sprite batch surface
//!
//! `draw_image` only records an instance; `present` uploads the batch and
//! draws it in one pass over a cleared background. Instances keep insertion
//! order, so later particles blend over earlier ones like a 2D canvas.

use thiserror::Error;
use wgpu::util::DeviceExt;

use super::sprite::SpriteImage;
use super::vertex::{Globals, SpriteInstance};
use super::{Sprite, Surface};
use crate::settings::Rgb;

/// GPU setup failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Surface format plus the matching sprite texture format.
///
/// Prefers an sRGB surface. Without one the sprite texture is plain
/// `Rgba8Unorm`, so sampled bytes reach the target unchanged.
fn select_formats(
    formats: &[wgpu::TextureFormat],
) -> Option<(wgpu::TextureFormat, wgpu::TextureFormat)> {
    if let Some(&srgb) = formats.iter().find(|f| f.is_srgb()) {
        return Some((srgb, wgpu::TextureFormat::Rgba8UnormSrgb));
    }
    formats
        .first()
        .map(|&format| (format, wgpu::TextureFormat::Rgba8Unorm))
}

/// Handle to a sprite texture uploaded with `GpuSurface::upload_sprite`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuSprite {
    id: usize,
    size: u32,
}

impl Sprite for GpuSprite {
    fn size(&self) -> u32 {
        self.size
    }
}

/// Consecutive instances drawn with the same sprite
#[derive(Debug, Clone, Copy)]
struct Run {
    sprite: usize,
    end: u32,
}

pub struct GpuSurface {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    sprite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    sprite_format: wgpu::TextureFormat,
    sprites: Vec<wgpu::BindGroup>,

    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instances: Vec<SpriteInstance>,
    runs: Vec<Run>,

    clear_color: wgpu::Color,
    /// Viewport size in pixels
    pub size: (u32, u32),
}

impl GpuSurface {
    /// Configure `surface` and build the sprite pipeline.
    ///
    /// `capacity` pre-sizes the instance buffer; pass the pool capacity so
    /// steady-state frames never reallocate.
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        capacity: usize,
        background: Rgb,
    ) -> Result<Self, RenderError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("pinkboard-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        let (surface_format, sprite_format) =
            select_formats(&surface_caps.formats).ok_or(RenderError::NoSurfaceFormat)?;
        if !surface_format.is_srgb() {
            log::warn!(
                "No sRGB surface format, sprites uploaded as {:?} without decoding",
                sprite_format
            );
        }
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite_shader.wgsl").into()),
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals"),
            contents: bytemuck::bytes_of(&Globals::new(config.width, config.height)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let sprite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &sprite_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SpriteInstance::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let instance_capacity = capacity.max(1);
        let instance_buffer = Self::create_instance_buffer(&device, instance_capacity);

        // Non-sRGB targets take the stored bytes as-is
        let [r, g, b] = if surface_format.is_srgb() {
            background.to_linear()
        } else {
            [background.r, background.g, background.b].map(|c| c as f64 / 255.0)
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            globals_buffer,
            globals_bind_group,
            sprite_layout,
            sampler,
            sprite_format,
            sprites: Vec::new(),
            instance_buffer,
            instance_capacity,
            instances: Vec::with_capacity(instance_capacity),
            runs: Vec::with_capacity(4),
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            size: (width, height),
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_instances"),
            size: (std::mem::size_of::<SpriteInstance>() * capacity) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload a sprite as a premultiplied-alpha texture
    pub fn upload_sprite(&mut self, image: &SpriteImage) -> GpuSprite {
        let raster = image.raster();
        let (width, height) = (raster.width(), raster.height());

        let premultiplied: Vec<u8> = raster
            .pixels()
            .chunks_exact(4)
            .flat_map(|px| {
                let a = px[3] as u16;
                let scale = |c: u8| ((c as u16 * a + 127) / 255) as u8;
                [scale(px[0]), scale(px[1]), scale(px[2]), px[3]]
            })
            .collect();

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sprite_texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.sprite_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &premultiplied,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_bind_group"),
            layout: &self.sprite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.sprites.push(bind_group);
        log::info!("Uploaded {}x{} sprite texture", width, height);

        GpuSprite {
            id: self.sprites.len() - 1,
            size: width,
        }
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
            self.queue.write_buffer(
                &self.globals_buffer,
                0,
                bytemuck::bytes_of(&Globals::new(new_width, new_height)),
            );
        }
    }

    /// Upload the recorded batch and draw it
    pub fn present(&mut self) -> Result<(), wgpu::SurfaceError> {
        if self.instances.len() > self.instance_capacity {
            self.instance_capacity = self.instances.len().next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(&self.device, self.instance_capacity);
            log::debug!("Grew sprite instance buffer to {}", self.instance_capacity);
        }
        if !self.instances.is_empty() {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.instances),
            );
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sprite_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));

            let mut start = 0;
            for run in &self.runs {
                render_pass.set_bind_group(1, &self.sprites[run.sprite], &[]);
                render_pass.draw(0..6, start..run.end);
                start = run.end;
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl Surface for GpuSurface {
    type Image = GpuSprite;

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self) {
        self.instances.clear();
        self.runs.clear();
    }

    fn draw_image(
        &mut self,
        image: &GpuSprite,
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
        self.instances
            .push(SpriteInstance::new(x, y, width, height, alpha));
        let end = self.instances.len() as u32;
        match self.runs.last_mut() {
            Some(run) if run.sprite == image.id => run.end = end,
            _ => self.runs.push(Run {
                sprite: image.id,
                end,
            }),
        }
    }
}
