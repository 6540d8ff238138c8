//! Frame driver for the heart effect
//!
//! `HeartEffect` is the explicit render context: it owns the pool, the sprite,
//! the spawn RNG and the frame clock. The platform layer only supplies
//! timestamps and a `Surface`, once per display frame.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::FPS_WINDOW;
use crate::renderer::Surface;
use crate::settings::Settings;
use crate::sim::{ParticlePool, sample_spawn};

/// Frames between periodic stats log lines
const STATS_LOG_INTERVAL: u64 = 600;

/// Canvas backing store size for a CSS client size.
///
/// Curve offsets, velocity and sprite size are CSS pixels, so the backing
/// store matches the client size and the device pixel ratio is left out.
pub fn backing_size(client_width: i32, client_height: i32) -> (u32, u32) {
    (client_width.max(1) as u32, client_height.max(1) as u32)
}

/// Turns wall-clock timestamps into frame deltas
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick. The first tick, and any clock that
    /// runs backwards, yields zero.
    pub fn tick(&mut self, now: f64) -> f64 {
        let delta = match self.last {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        self.last = Some(now);
        delta
    }
}

/// Rolling frame statistics
#[derive(Debug, Clone)]
pub struct FrameStats {
    frame_times: [f64; FPS_WINDOW],
    frame_index: usize,
    /// Frames per second over the last `FPS_WINDOW` frames
    pub fps: u32,
    /// Frames rendered so far
    pub frames: u64,
    /// Particles spawned so far
    pub spawned: u64,
    /// Live particles after the last frame
    pub live: usize,
    /// Live particles overwritten because the pool was full
    pub evicted: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            frame_times: [0.0; FPS_WINDOW],
            frame_index: 0,
            fps: 0,
            frames: 0,
            spawned: 0,
            live: 0,
            evicted: 0,
        }
    }
}

impl FrameStats {
    fn record(&mut self, now: f64) {
        self.frames += 1;
        self.frame_times[self.frame_index] = now;
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;

        // Oldest sample is the one about to be overwritten
        if self.frames >= FPS_WINDOW as u64 {
            let elapsed = now - self.frame_times[self.frame_index];
            if elapsed > 0.0 {
                self.fps = ((FPS_WINDOW - 1) as f64 / elapsed).round() as u32;
            }
        }
    }
}

/// The running heart animation
pub struct HeartEffect<I> {
    settings: Settings,
    pool: ParticlePool,
    sprite: I,
    rng: Pcg32,
    clock: FrameClock,
    /// Fractional particles carried to the next frame
    spawn_carry: f64,
    stats: FrameStats,
}

impl<I> HeartEffect<I> {
    /// Build the effect around an already rendered sprite.
    ///
    /// `fallback_seed` seeds the spawn RNG unless the settings carry a seed.
    pub fn new(settings: Settings, sprite: I, fallback_seed: u64) -> Self {
        let seed = settings.seed.unwrap_or(fallback_seed);
        let p = &settings.particles;
        let pool = ParticlePool::new(p.length, p.duration, p.effect);
        log::info!(
            "Heart effect: {} particles, {}s lifetime, seed {}",
            pool.capacity(),
            p.duration,
            seed
        );
        Self {
            pool,
            sprite,
            rng: Pcg32::seed_from_u64(seed),
            clock: FrameClock::new(),
            spawn_carry: 0.0,
            stats: FrameStats::default(),
            settings,
        }
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Render one frame at wall-clock time `now` (seconds)
    pub fn frame<S>(&mut self, now: f64, surface: &mut S)
    where
        S: Surface<Image = I>,
    {
        let delta_time = self.clock.tick(now);
        let (width, height) = surface.size();

        surface.clear();
        self.spawn(delta_time, width as f64 / 2.0, height as f64 / 2.0);
        self.pool.update(delta_time);
        self.pool.draw(surface, &self.sprite);

        self.stats.record(now);
        self.stats.live = self.pool.len();
        self.stats.evicted = self.pool.evicted();
        if self.stats.frames % STATS_LOG_INTERVAL == 0 {
            log::debug!(
                "fps {} live {} spawned {} evicted {}",
                self.stats.fps,
                self.stats.live,
                self.stats.spawned,
                self.stats.evicted
            );
        }
    }

    /// Emit this frame's share of particles around the canvas center.
    ///
    /// Spawns `floor(rate * dt)` and carries the fraction, so the long-run
    /// rate is exactly `length / duration`. Rounding up every frame instead
    /// (5 per frame at 60 Hz for the defaults) keeps the pool saturated; this
    /// version draws a visibly sparser heart than that.
    ///
    /// Curve space is y-up, canvas space y-down, so both the offset and the
    /// launch direction flip their y component.
    fn spawn(&mut self, delta_time: f64, center_x: f64, center_y: f64) {
        self.spawn_carry += self.settings.spawn_rate() * delta_time;
        let whole = self.spawn_carry.floor();
        self.spawn_carry -= whole;

        // Anything beyond one full pool would be evicted within this frame
        let count = (whole as usize).min(self.pool.capacity());
        let velocity = self.settings.particles.velocity;
        for _ in 0..count {
            let spawn = sample_spawn(&mut self.rng, velocity);
            self.pool.add(
                center_x + spawn.offset.x,
                center_y - spawn.offset.y,
                spawn.direction.x,
                -spawn.direction.y,
            );
        }
        self.stats.spawned += count as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{Raster, Sprite, SpriteImage};
    use crate::settings::Rgb;

    struct Dot;

    impl Sprite for Dot {
        fn size(&self) -> u32 {
            30
        }
    }

    struct Counter {
        size: (u32, u32),
        clears: usize,
        draws: usize,
    }

    impl Surface for Counter {
        type Image = Dot;

        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.draws = 0;
        }

        fn draw_image(&mut self, _: &Dot, _: f64, _: f64, _: f64, _: f64, _: f64) {
            self.draws += 1;
        }
    }

    fn counter() -> Counter {
        Counter {
            size: (800, 600),
            clears: 0,
            draws: 0,
        }
    }

    #[test]
    fn test_clock_first_tick_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(12.0), 0.0);
        assert_eq!(clock.tick(12.5), 0.5);
        // Backwards jumps do not produce negative deltas
        assert_eq!(clock.tick(12.25), 0.0);
    }

    #[test]
    fn test_first_frame_spawns_nothing() {
        let mut effect = HeartEffect::new(Settings::default(), Dot, 1);
        let mut surface = counter();
        effect.frame(100.0, &mut surface);
        assert_eq!(surface.clears, 1);
        assert!(effect.pool().is_empty());
        assert_eq!(surface.draws, 0);
    }

    #[test]
    fn test_spawn_rate_with_carry() {
        let mut effect = HeartEffect::new(Settings::default(), Dot, 1);
        let mut surface = counter();
        effect.frame(0.0, &mut surface);
        // 250 particles/s at 1/64s frames is 3.90625 per frame
        for i in 1..=10 {
            effect.frame(i as f64 / 64.0, &mut surface);
        }
        assert_eq!(effect.stats().spawned, 39);
        assert_eq!(effect.pool().len(), 39);
        assert_eq!(surface.draws, 39);
    }

    #[test]
    fn test_spawned_particles_start_on_the_heart() {
        let mut effect = HeartEffect::new(Settings::default(), Dot, 3);
        let mut surface = counter();
        effect.frame(0.0, &mut surface);
        effect.spawn(0.1, 400.0, 300.0);

        for p in effect.pool().iter() {
            // Offsets stay inside the heart's bounding box around the center
            assert!((p.position.x - 400.0).abs() <= 160.0 + 1e-9);
            assert!(p.position.y >= 300.0 - 150.0 && p.position.y <= 300.0 + 150.0);
            assert!((p.velocity.length() - 100.0).abs() < 1e-9);
            // Launch direction points away from the curve origin
            let outward = (p.position.x - 400.0) * p.velocity.x
                + (p.position.y - 300.0) * p.velocity.y;
            assert!(outward > 0.0);
        }
    }

    #[test]
    fn test_resize_moves_spawn_center() {
        let mut settings = Settings::default();
        settings.seed = Some(11);
        let mut effect = HeartEffect::new(settings, Dot, 0);
        let mut surface = counter();
        effect.frame(0.0, &mut surface);
        // 250 particles/s: 31.25 spawns, then 62.5 plus the carried quarter
        effect.frame(0.125, &mut surface);
        let before = effect.pool().len();
        assert_eq!(before, 31);

        surface.size = (2000, 600);
        effect.frame(0.375, &mut surface);
        let added = effect.pool().len() - before;
        assert_eq!(added, 62);

        let old: Vec<f64> = effect.pool().iter().take(before).map(|p| p.position.x).collect();
        let new: Vec<f64> = effect.pool().iter().skip(before).map(|p| p.position.x).collect();
        let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        assert!((mean(&old) - 400.0).abs() < 100.0);
        assert!((mean(&new) - 1000.0).abs() < 100.0);
        assert!(new.iter().all(|&x| (x - 1000.0).abs() <= 160.0 + 30.0));
    }

    #[test]
    fn test_backing_size_ignores_pixel_ratio() {
        assert_eq!(backing_size(800, 600), (800, 600));
        assert_eq!(backing_size(0, -5), (1, 1));
    }

    #[test]
    fn test_steady_state_is_bounded_by_capacity() {
        let mut settings = Settings::default();
        settings.particles.length = 50;
        settings.seed = Some(5);
        let mut effect = HeartEffect::new(settings, Dot, 0);
        let mut surface = counter();

        // A long stall spawns far more than the pool can hold
        effect.frame(0.0, &mut surface);
        effect.frame(10.0, &mut surface);
        assert!(effect.pool().len() <= 50);
        assert!(effect.stats().spawned <= 50);

        for i in 1..=600 {
            effect.frame(10.0 + i as f64 / 60.0, &mut surface);
            assert!(effect.pool().len() <= 50);
        }
        assert!(effect.stats().fps >= 59 && effect.stats().fps <= 61);
    }

    #[test]
    fn test_same_seed_same_frames() {
        let mut settings = Settings::default();
        settings.seed = Some(42);
        let mut a = HeartEffect::new(settings.clone(), Dot, 0);
        let mut b = HeartEffect::new(settings, Dot, 99);
        let mut surface = counter();
        for i in 0..30 {
            a.frame(i as f64 / 60.0, &mut surface);
            b.frame(i as f64 / 60.0, &mut surface);
        }
        let pa: Vec<_> = a.pool().iter().map(|p| p.position).collect();
        let pb: Vec<_> = b.pool().iter().map(|p| p.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_renders_into_raster() {
        let sprite = SpriteImage::heart(30, Rgb::new(0xea, 0x80, 0xb0));
        let mut effect = HeartEffect::new(Settings::default(), sprite, 8);
        let mut canvas = Raster::with_background(400, 400, [0, 0, 0, 255]);
        for i in 0..90 {
            effect.frame(i as f64 / 60.0, &mut canvas);
        }
        let lit = canvas
            .pixels()
            .chunks_exact(4)
            .filter(|px| px[0] > 0)
            .count();
        assert!(lit > 100);
    }
}
