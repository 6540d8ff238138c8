//! Fixed-capacity circular particle pool
//!
//! Slots are allocated once and reinitialized in place. The live particles
//! form the circular window `[first_active, first_free)`; an explicit live
//! count tells an empty window from a full one when both cursors coincide.
//!
//! Particles retire strictly from the front: every particle shares the same
//! duration, so insertion order is also expiry order.

use std::iter::Chain;
use std::slice;

use super::particle::Particle;
use crate::renderer::Surface;

/// Circular buffer of pre-allocated particles
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: Box<[Particle]>,
    first_active: usize,
    first_free: usize,
    len: usize,
    /// Lifetime shared by every particle, in seconds
    duration: f64,
    /// Acceleration curl factor applied on `add`
    effect: f64,
    /// Live particles overwritten because the pool was full
    evicted: u64,
}

impl ParticlePool {
    /// Allocate `capacity` slots. A zero capacity is bumped to one slot.
    pub fn new(capacity: usize, duration: f64, effect: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            particles: vec![Particle::default(); capacity].into_boxed_slice(),
            first_active: 0,
            first_free: 0,
            len: 0,
            duration,
            effect,
            evicted: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Number of live particles
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Slot index of the oldest live particle
    #[inline]
    pub fn first_active(&self) -> usize {
        self.first_active
    }

    /// Slot index the next `add` will claim
    #[inline]
    pub fn first_free(&self) -> usize {
        self.first_free
    }

    /// Total live particles dropped to make room for new ones
    #[inline]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.capacity() { 0 } else { next }
    }

    /// Claim the slot at `first_free` for a new particle.
    ///
    /// When the pool is full the oldest live particle is silently overwritten.
    pub fn add(&mut self, x: f64, y: f64, dx: f64, dy: f64) {
        let effect = self.effect;
        self.particles[self.first_free].initialize(x, y, dx, dy, effect);
        self.first_free = self.advance(self.first_free);

        if self.len == self.capacity() {
            self.first_active = self.advance(self.first_active);
            self.evicted += 1;
        } else {
            self.len += 1;
        }
    }

    /// Integrate every live particle, then retire expired ones from the front
    pub fn update(&mut self, delta_time: f64) {
        for particle in self.iter_mut() {
            particle.update(delta_time);
        }

        while self.len > 0 && self.particles[self.first_active].is_expired(self.duration) {
            self.first_active = self.advance(self.first_active);
            self.len -= 1;
        }
    }

    /// Draw live particles oldest first
    pub fn draw<S: Surface>(&self, surface: &mut S, sprite: &S::Image) {
        for particle in self.iter() {
            particle.draw(surface, sprite, self.duration);
        }
    }

    /// Drop every live particle without touching slot contents
    pub fn clear(&mut self) {
        self.first_active = self.first_free;
        self.len = 0;
    }

    /// The live window as two linear runs, oldest first.
    ///
    /// The second run is empty unless the window wraps past the last slot.
    pub fn as_slices(&self) -> (&[Particle], &[Particle]) {
        let (head, tail) = self.split_ranges();
        (&self.particles[head.0..head.1], &self.particles[tail.0..tail.1])
    }

    pub fn as_mut_slices(&mut self) -> (&mut [Particle], &mut [Particle]) {
        let (head, tail) = self.split_ranges();
        // tail always lies before head in memory
        let (front, back) = self.particles.split_at_mut(head.0);
        (&mut back[..head.1 - head.0], &mut front[tail.0..tail.1])
    }

    pub fn iter(&self) -> Chain<slice::Iter<'_, Particle>, slice::Iter<'_, Particle>> {
        let (head, tail) = self.as_slices();
        head.iter().chain(tail.iter())
    }

    pub fn iter_mut(&mut self) -> Chain<slice::IterMut<'_, Particle>, slice::IterMut<'_, Particle>> {
        let (head, tail) = self.as_mut_slices();
        head.iter_mut().chain(tail.iter_mut())
    }

    /// Index ranges `(start, end)` of the two runs of the live window
    fn split_ranges(&self) -> ((usize, usize), (usize, usize)) {
        let start = self.first_active;
        let end = start + self.len;
        if end <= self.capacity() {
            ((start, end), (0, 0))
        } else {
            ((start, self.capacity()), (0, end - self.capacity()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{Sprite, Surface};

    struct Dot;

    impl Sprite for Dot {
        fn size(&self) -> u32 {
            30
        }
    }

    /// Records draw calls instead of rasterizing
    #[derive(Default)]
    struct Recorder {
        draws: Vec<(f64, f64, f64, f64)>,
    }

    impl Surface for Recorder {
        type Image = Dot;

        fn size(&self) -> (u32, u32) {
            (800, 600)
        }

        fn clear(&mut self) {
            self.draws.clear();
        }

        fn draw_image(&mut self, _image: &Dot, x: f64, y: f64, w: f64, _h: f64, alpha: f64) {
            self.draws.push((x, y, w, alpha));
        }
    }

    #[test]
    fn test_add_below_capacity() {
        let mut pool = ParticlePool::new(5, 2.0, -0.75);
        for _ in 0..4 {
            pool.add(0.0, 0.0, 1.0, 0.0);
        }
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.first_active(), 0);
        assert_eq!(pool.first_free(), 4);
        assert_eq!(pool.evicted(), 0);
    }

    #[test]
    fn test_fill_then_evict_oldest() {
        let mut pool = ParticlePool::new(3, 2.0, -0.75);
        for i in 0..3 {
            pool.add(i as f64, 0.0, 1.0, 0.0);
        }
        // Full: both cursors wrapped back to slot 0
        assert!(pool.is_full());
        assert_eq!(pool.first_active(), 0);
        assert_eq!(pool.first_free(), 0);

        pool.add(10.0, 0.0, 1.0, 0.0);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.first_active(), 1);
        assert_eq!(pool.first_free(), 1);
        assert_eq!(pool.evicted(), 1);

        // Slot 0's original occupant is gone, the newest is last in order
        let xs: Vec<f64> = pool.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 10.0]);
    }

    #[test]
    fn test_expired_particles_clear_pool() {
        let mut pool = ParticlePool::new(3, 2.0, -0.75);
        for _ in 0..4 {
            pool.add(0.0, 0.0, 1.0, 0.0);
        }
        pool.update(2.1);
        assert!(pool.is_empty());
        assert_eq!(pool.first_active(), pool.first_free());

        // A further update on an empty pool is a no-op
        pool.update(0.016);
        assert!(pool.is_empty());
        assert_eq!(pool.first_active(), pool.first_free());
    }

    #[test]
    fn test_retires_only_from_front() {
        let mut pool = ParticlePool::new(4, 1.0, -0.75);
        pool.add(0.0, 0.0, 1.0, 0.0);
        pool.update(0.75);
        pool.add(1.0, 0.0, 1.0, 0.0);
        pool.update(0.5);

        // First particle is 1.25s old and retired, second is 0.5s old
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.first_active(), 1);
        assert_eq!(pool.iter().next().map(|p| p.position.x), Some(1.5));
    }

    #[test]
    fn test_update_covers_wrapped_window() {
        let mut pool = ParticlePool::new(4, 10.0, 0.0);
        for _ in 0..6 {
            pool.add(0.0, 0.0, 1.0, 0.0);
        }
        let (head, tail) = pool.as_slices();
        assert_eq!(head.len() + tail.len(), 4);
        assert_eq!(tail.len(), 2);

        pool.update(1.0);
        assert!(pool.iter().all(|p| (p.age - 1.0).abs() < 1e-12));
        assert!(pool.iter().all(|p| (p.position.x - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_draw_emits_live_particles_in_order() {
        let mut pool = ParticlePool::new(3, 2.0, 0.0);
        pool.add(100.0, 100.0, 0.0, 0.0);
        pool.update(1.0);
        pool.add(200.0, 100.0, 0.0, 0.0);

        let mut surface = Recorder::default();
        pool.draw(&mut surface, &Dot);
        assert_eq!(surface.draws.len(), 2);

        // Older particle: half faded, size 30 * ease(0.5)
        let (x, _, w, alpha) = surface.draws[0];
        assert!((alpha - 0.5).abs() < 1e-12);
        assert!((w - 26.25).abs() < 1e-12);
        assert!((x - (100.0 - w / 2.0)).abs() < 1e-12);

        // Newborn particle: fully opaque, zero size
        let (_, _, w, alpha) = surface.draws[1];
        assert_eq!(alpha, 1.0);
        assert_eq!(w, 0.0);
    }

    #[test]
    fn test_clear() {
        let mut pool = ParticlePool::new(3, 2.0, -0.75);
        pool.add(0.0, 0.0, 1.0, 0.0);
        pool.add(0.0, 0.0, 1.0, 0.0);
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.first_active(), 2);
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn test_single_slot_pool() {
        let mut pool = ParticlePool::new(0, 2.0, -0.75);
        assert_eq!(pool.capacity(), 1);
        pool.add(1.0, 0.0, 1.0, 0.0);
        pool.add(2.0, 0.0, 1.0, 0.0);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.iter().next().map(|p| p.position.x), Some(2.0));
    }
}
