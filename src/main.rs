//! Pinkboard entry point
//!
//! On the web: WebGPU canvas driven by requestAnimationFrame.
//! Natively: headless run into a CPU raster, last frame saved as PNG.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlCanvasElement;

    use pinkboard::renderer::{GpuSprite, GpuSurface, RenderError, SpriteImage};
    use pinkboard::{HeartEffect, Settings};

    /// Element id of the target canvas
    const CANVAS_ID: &str = "pinkboard";

    /// Everything the frame callback needs
    struct App {
        effect: HeartEffect<GpuSprite>,
        surface: GpuSurface,
        canvas: HtmlCanvasElement,
    }

    impl App {
        /// Match the canvas backing store to its CSS size
        fn on_resize(&mut self) {
            let (width, height) = backing_size(&self.canvas);
            if (width, height) != self.surface.size {
                self.canvas.set_width(width);
                self.canvas.set_height(height);
                self.surface.resize(width, height);
                log::info!("Canvas resized to {}x{}", width, height);
            }
        }

        fn frame(&mut self, time: f64) {
            // requestAnimationFrame timestamps are milliseconds
            self.effect.frame(time / 1000.0, &mut self.surface);

            match self.surface.present() {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                    let (w, h) = self.surface.size;
                    self.surface.resize(w, h);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }
        }
    }

    fn backing_size(canvas: &HtmlCanvasElement) -> (u32, u32) {
        pinkboard::effect::backing_size(canvas.client_width(), canvas.client_height())
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Pinkboard starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(CANVAS_ID)
            .ok_or("no canvas")?
            .dyn_into()?;

        let settings = Settings::load(&canvas);
        let color = settings.color().map_err(to_js)?;
        let background = settings.background().map_err(to_js)?;

        let (width, height) = backing_size(&canvas);
        canvas.set_width(width);
        canvas.set_height(height);

        let mut surface = init_gpu(&canvas, width, height, settings.particles.length, background)
            .await
            .map_err(to_js)?;

        let sprite = SpriteImage::heart(settings.particles.size, color);
        let sprite = surface.upload_sprite(&sprite);

        let seed = js_sys::Date::now() as u64;
        let effect = HeartEffect::new(settings, sprite, seed);

        let app = Rc::new(RefCell::new(App {
            effect,
            surface,
            canvas,
        }));

        setup_resize_handler(app.clone());
        request_animation_frame(app);

        log::info!("Pinkboard running!");
        Ok(())
    }

    fn to_js(e: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    async fn init_gpu(
        canvas: &HtmlCanvasElement,
        width: u32,
        height: u32,
        capacity: usize,
        background: pinkboard::Rgb,
    ) -> Result<GpuSurface, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        GpuSurface::new(surface, &adapter, width, height, capacity, background).await
    }

    fn setup_resize_handler(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            app.borrow_mut().on_resize();
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            render_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn render_loop(app: Rc<RefCell<App>>, time: f64) {
        app.borrow_mut().frame(time);
        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_app::run().await
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::error::Error;
    use std::path::PathBuf;

    use pinkboard::renderer::{Raster, SpriteImage};
    use pinkboard::{HeartEffect, Settings};

    /// Command line options
    pub struct Options {
        pub settings: Option<PathBuf>,
        pub frames: u32,
        pub width: u32,
        pub height: u32,
        pub out: Option<PathBuf>,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                settings: None,
                frames: 180,
                width: 800,
                height: 600,
                out: None,
            }
        }
    }

    impl Options {
        /// `pinkboard [settings.json] [--frames N] [--size WxH] [--out frame.png]`
        pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
            let mut options = Self::default();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--frames" => {
                        let value = args.next().ok_or("--frames needs a value")?;
                        options.frames = value
                            .parse()
                            .map_err(|_| format!("invalid frame count {:?}", value))?;
                    }
                    "--size" => {
                        let value = args.next().ok_or("--size needs a value")?;
                        let (w, h) = value
                            .split_once('x')
                            .ok_or_else(|| format!("invalid size {:?}, expected WxH", value))?;
                        options.width = w.parse().map_err(|_| format!("invalid width {:?}", w))?;
                        options.height = h.parse().map_err(|_| format!("invalid height {:?}", h))?;
                    }
                    "--out" => {
                        options.out = Some(args.next().ok_or("--out needs a path")?.into());
                    }
                    path if !path.starts_with("--") && options.settings.is_none() => {
                        options.settings = Some(path.into());
                    }
                    other => return Err(format!("unexpected argument {:?}", other)),
                }
            }
            Ok(options)
        }
    }

    pub fn run(options: Options) -> Result<(), Box<dyn Error>> {
        let settings = Settings::load(options.settings.as_deref())?;
        let background = settings.background()?;
        let sprite = SpriteImage::heart(settings.particles.size, settings.color()?);

        let mut canvas = Raster::with_background(
            options.width,
            options.height,
            [background.r, background.g, background.b, 255],
        );
        let mut effect = HeartEffect::new(settings, sprite, 0);

        // Fixed 60 Hz clock
        for frame in 0..options.frames {
            effect.frame(frame as f64 / 60.0, &mut canvas);
        }

        let stats = effect.stats();
        log::info!(
            "Rendered {} frames: {} live, {} spawned, {} evicted",
            stats.frames,
            stats.live,
            stats.spawned,
            stats.evicted
        );

        if let Some(path) = options.out {
            image::save_buffer(
                &path,
                canvas.pixels(),
                canvas.width(),
                canvas.height(),
                image::ExtendedColorType::Rgba8,
            )?;
            log::info!("Wrote {}", path.display());
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pinkboard (native) starting...");
    log::info!("Native mode renders headless - run with `trunk serve` for the web version");

    let options = headless::Options::parse(std::env::args().skip(1))?;
    headless::run(options)
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
