//! Particle storage.
//!
//! [`ParticleStore`] keeps four containers indexed identically by particle id:
//! the physics records, render colors, render transforms and the visual spin
//! angle. Every mutation keeps them the same length and keeps `id == index`.
//! The store itself is not synchronized; the simulation wraps it in a mutex so
//! input threads can `add` while a frame is being stepped.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::config::{SimConfig, SpawnConfig};
use crate::particle::{mass_from_radius, Color, Particle};

/// Smallest radius the store accepts.
pub const MIN_RADIUS: f32 = 0.5;

/// Per-substep integration parameters derived from the [`SimConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegrationSettings {
    pub gravity: Vec2,
    pub air_resistance: f32,
    /// Viewport size when border collision is on.
    pub border: Option<Vec2>,
    pub border_energy_loss: f32,
}

impl IntegrationSettings {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            gravity: Vec2::new(0.0, -config.gravity),
            air_resistance: config.air_resistance,
            border: config.border_collision.then(|| config.viewport()),
            border_energy_loss: config.border_energy_loss,
        }
    }
}

/// Clamps one axis into `[radius, extent - radius]`, sending the velocity
/// back inward scaled by `loss`.
fn reflect_axis(pos: &mut f32, vel: &mut f32, radius: f32, extent: f32, loss: f32) {
    if *pos < radius {
        *pos = radius;
        *vel = vel.abs() * loss;
    } else if *pos > extent - radius {
        *pos = extent - radius;
        *vel = -vel.abs() * loss;
    }
}

/// Semi-implicit Euler step for a run of particles.
pub fn integrate_slice(particles: &mut [Particle], dt: f32, settings: &IntegrationSettings) {
    let drag = (settings.air_resistance * dt).min(1.0);
    for p in particles {
        p.vel += (p.acc + settings.gravity) * dt;
        p.vel -= p.vel * drag;
        p.pos += p.vel * dt;
        p.acc = Vec2::ZERO;

        if let Some(size) = settings.border {
            let loss = settings.border_energy_loss;
            reflect_axis(&mut p.pos.x, &mut p.vel.x, p.radius, size.x, loss);
            reflect_axis(&mut p.pos.y, &mut p.vel.y, p.radius, size.y, loss);
        }
    }
}

pub struct ParticleStore {
    particles: Vec<Particle>,
    colors: Vec<Color>,
    transforms: Vec<Mat4>,
    spin: Vec<f32>,
    spawn: SpawnConfig,
    rng: fastrand::Rng,
}

impl ParticleStore {
    pub fn new(spawn: SpawnConfig) -> Self {
        let rng = match spawn.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            particles: Vec::new(),
            colors: Vec::new(),
            transforms: Vec::new(),
            spin: Vec::new(),
            spawn,
            rng,
        }
    }

    /// Updates spawn settings. The RNG is reseeded only when the seed changes.
    pub fn set_spawn(&mut self, spawn: SpawnConfig) {
        if spawn.seed != self.spawn.seed {
            if let Some(seed) = spawn.seed {
                self.rng.seed(seed);
            }
        }
        self.spawn = spawn;
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    pub fn spin(&self) -> &[f32] {
        &self.spin
    }

    fn random_in(&mut self, [lo, hi]: [f32; 2]) -> f32 {
        lo + self.rng.f32() * (hi - lo)
    }

    /// Appends a particle and returns its id. Mass follows from the spawn
    /// density; the velocity is random within `force_range` if enabled.
    pub fn add(&mut self, pos: Vec2, radius: f32, color: Color) -> usize {
        let radius = if radius >= MIN_RADIUS {
            radius
        } else {
            log::warn!("Radius {} below minimum, using {}", radius, MIN_RADIUS);
            MIN_RADIUS
        };

        let id = self.particles.len();
        let mut particle = Particle::new(id, pos, radius, mass_from_radius(self.spawn.density, radius));
        if self.spawn.random_velocity {
            let range = self.spawn.force_range;
            particle.vel = Vec2::new(self.random_in(range), self.random_in(range));
        }

        self.particles.push(particle);
        self.colors.push(color);
        self.transforms.push(model_matrix(&particle, 0.0));
        self.spin.push(0.0);
        id
    }

    /// Spawns `count` particles at uniformly random positions fully inside
    /// the viewport, each with a random color. Returns the new ids.
    pub fn scatter(&mut self, count: usize, radius: f32, viewport: Vec2) -> std::ops::Range<usize> {
        let first = self.len();
        for _ in 0..count {
            let pos = Vec2::new(
                self.random_in([radius, viewport.x - radius]),
                self.random_in([radius, viewport.y - radius]),
            );
            let color = Color::rgb(self.rng.f32(), self.rng.f32(), self.rng.f32());
            self.add(pos, radius, color);
        }
        first..self.len()
    }

    pub fn integrate(&mut self, dt: f32, settings: &IntegrationSettings) {
        integrate_slice(&mut self.particles, dt, settings);
    }

    pub fn erase_all(&mut self) {
        self.particles.clear();
        self.colors.clear();
        self.transforms.clear();
        self.spin.clear();
    }

    /// Removes the given ids (duplicates and out-of-range ids are ignored)
    /// by swapping each with the last particle, highest id first, then
    /// renumbers every survivor. Ids held outside the store are stale
    /// afterwards. Returns how many particles were removed.
    pub fn remove(&mut self, ids: &[usize]) -> usize {
        let len = self.len();
        let mut doomed: Vec<usize> = ids.iter().copied().filter(|&id| id < len).collect();
        if doomed.len() != ids.len() {
            log::warn!("Ignoring {} out-of-range ids", ids.len() - doomed.len());
        }
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        doomed.dedup();

        for &id in &doomed {
            self.particles.swap_remove(id);
            self.colors.swap_remove(id);
            self.transforms.swap_remove(id);
            self.spin.swap_remove(id);
        }
        self.renumber();
        doomed.len()
    }

    fn renumber(&mut self) {
        for (i, p) in self.particles.iter_mut().enumerate() {
            p.id = i as u32;
        }
    }

    /// Advances the visual spin by `torque * dt` and rebuilds every model
    /// matrix. Called once per frame after the substeps.
    pub fn refresh_render_data(&mut self, dt: f32) {
        for ((p, spin), transform) in self
            .particles
            .iter()
            .zip(self.spin.iter_mut())
            .zip(self.transforms.iter_mut())
        {
            *spin += p.torque * dt;
            *transform = model_matrix(p, *spin);
        }
    }

    /// Replaces the contents wholesale, e.g. from a snapshot. Spin restarts at zero.
    pub fn restore(&mut self, particles: Vec<Particle>, colors: Vec<Color>, transforms: Vec<Mat4>) {
        debug_assert!(particles.len() == colors.len() && colors.len() == transforms.len());
        self.spin = vec![0.0; particles.len()];
        self.particles = particles;
        self.colors = colors;
        self.transforms = transforms;
    }
}

/// `translate(pos) * rotate_z(spin) * scale(radius)`.
pub fn model_matrix(p: &Particle, spin: f32) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::new(p.radius, p.radius, 1.0),
        Quat::from_rotation_z(spin),
        p.pos.extend(0.0),
    )
}
