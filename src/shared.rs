//! Shared view of particle kinematics for the collision window.
//!
//! Collision batches running on different workers may touch the same particle
//! (straddling ids, or the `j > i` tail of a brute-force range). Positions,
//! velocities and torque are therefore held in relaxed atomics while the
//! collision phase runs. Concurrent resolutions of one particle may overwrite
//! each other, and the two components of a vector are stored separately, so a
//! position can end up with `x` from one writer and `y` from another. Each
//! component is always a value some resolution actually wrote.

use std::sync::atomic::Ordering;

use atomic_float::AtomicF32;
use glam::Vec2;

use crate::particle::Particle;

struct AtomicVec2 {
    x: AtomicF32,
    y: AtomicF32,
}

impl AtomicVec2 {
    fn new(v: Vec2) -> Self {
        Self { x: AtomicF32::new(v.x), y: AtomicF32::new(v.y) }
    }

    fn load(&self) -> Vec2 {
        Vec2::new(self.x.load(Ordering::Relaxed), self.y.load(Ordering::Relaxed))
    }

    fn store(&self, v: Vec2) {
        self.x.store(v.x, Ordering::Relaxed);
        self.y.store(v.y, Ordering::Relaxed);
    }
}

struct SharedBody {
    pos: AtomicVec2,
    vel: AtomicVec2,
    torque: AtomicF32,
    radius: f32,
    mass: f32,
}

impl SharedBody {
    fn from_particle(p: &Particle) -> Self {
        Self {
            pos: AtomicVec2::new(p.pos),
            vel: AtomicVec2::new(p.vel),
            torque: AtomicF32::new(p.torque),
            radius: p.radius,
            mass: p.mass,
        }
    }

    fn refill(&mut self, p: &Particle) {
        self.pos.store(p.pos);
        self.vel.store(p.vel);
        self.torque.store(p.torque, Ordering::Relaxed);
        self.radius = p.radius;
        self.mass = p.mass;
    }
}

/// Snapshot of the store's particles that many workers can read and write.
pub struct SharedBodies {
    bodies: Vec<SharedBody>,
}

impl Default for SharedBodies {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedBodies {
    pub fn new() -> Self {
        Self { bodies: Vec::new() }
    }

    pub fn capture(particles: &[Particle]) -> Self {
        let mut shared = Self::new();
        shared.reload(particles);
        shared
    }

    /// Copies the particles in, reusing existing slots.
    pub fn reload(&mut self, particles: &[Particle]) {
        self.bodies.truncate(particles.len());
        for (body, p) in self.bodies.iter_mut().zip(particles) {
            body.refill(p);
        }
        let reused = self.bodies.len();
        self.bodies
            .extend(particles[reused..].iter().map(SharedBody::from_particle));
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Current state of particle `id`. `acc` is not tracked here and reads as zero.
    pub fn load(&self, id: usize) -> Particle {
        let body = &self.bodies[id];
        Particle {
            id: id as u32,
            pos: body.pos.load(),
            vel: body.vel.load(),
            acc: Vec2::ZERO,
            mass: body.mass,
            radius: body.radius,
            torque: body.torque.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, p: &Particle) {
        let body = &self.bodies[p.index()];
        body.pos.store(p.pos);
        body.vel.store(p.vel);
        body.torque.store(p.torque, Ordering::Relaxed);
    }

    /// Copies positions, velocities and torque back into the store.
    pub fn write_back(&self, particles: &mut [Particle]) {
        for (p, body) in particles.iter_mut().zip(&self.bodies) {
            p.pos = body.pos.load();
            p.vel = body.vel.load();
            p.torque = body.torque.load(Ordering::Relaxed);
        }
    }
}
