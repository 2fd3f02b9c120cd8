//! Narrow phase and resolution of circle/circle collisions.
//!
//! Pair order is always `(i, j)` with `j` after `i`, either in index space
//! (brute force) or inside one partition group. Nothing is tested twice within
//! one walk.

use glam::Vec2;

use crate::config::{SimConfig, TorqueConfig};
use crate::contact::Contact;
use crate::particle::Particle;
use crate::shared::SharedBodies;
use crate::stats::CollisionTally;

/// Per-substep collision parameters derived from the [`SimConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionSettings {
    /// Scale applied to both velocities after an impulse; 1.0 is elastic.
    pub energy_loss: f32,
    /// Viewport size when border collision is on. Separation pushes that would
    /// leave `[radius, size - radius]` are dropped per axis.
    pub border: Option<Vec2>,
    /// Visual spin exchange, if enabled.
    pub torque: Option<TorqueConfig>,
}

impl CollisionSettings {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            energy_loss: config.collision_energy_loss,
            border: config.border_collision.then(|| config.viewport()),
            torque: config.torque.enabled.then(|| config.torque.clone()),
        }
    }

    pub fn elastic() -> Self {
        Self { energy_loss: 1.0, border: None, torque: None }
    }
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self::elastic()
    }
}

/// Cheap AABB rejection followed by the exact disc test. Touching discs do
/// not collide.
pub fn collision_check(a: &Particle, b: &Particle) -> bool {
    let d = b.pos - a.pos;
    let r = a.radius + b.radius;
    if d.x.abs() >= r || d.y.abs() >= r {
        return false;
    }
    d.length_squared() < r * r
}

fn clamp_push(current: Vec2, target: Vec2, radius: f32, border: Option<Vec2>) -> Vec2 {
    let Some(size) = border else {
        return target;
    };
    let axis = |cur: f32, to: f32, extent: f32| {
        if to < radius || to > extent - radius {
            cur
        } else {
            to
        }
    };
    Vec2::new(
        axis(current.x, target.x, size.x),
        axis(current.y, target.y, size.y),
    )
}

/// Pushes both particles half the penetration depth apart along the contact
/// angle. Returns `None` without touching anything when the pair is already
/// (within epsilon) just touching.
pub fn separate(a: &mut Particle, b: &mut Particle, border: Option<Vec2>) -> Option<Contact> {
    let contact = Contact::between(a, b);
    if contact.depth < f32::EPSILON {
        return None;
    }
    let push = contact.direction() * (contact.depth * 0.5);
    a.pos = clamp_push(a.pos, a.pos - push, a.radius, border);
    b.pos = clamp_push(b.pos, b.pos + push, b.radius, border);
    Some(contact)
}

/// Unequal-mass 1-D elastic exchange along the contact normal; tangential
/// components are kept. Only applied to closing pairs. Returns whether an
/// impulse was applied.
///
/// Coincident centres have no normal and produce NaN velocities.
pub fn apply_impulse(a: &mut Particle, b: &mut Particle, energy_loss: f32) -> bool {
    let contact = Contact::between(a, b);
    let vel_diff = b.vel - a.vel;
    if contact.offset.dot(vel_diff) >= f32::EPSILON {
        return false;
    }

    let normal = contact.normal();
    let tangent = normal.perp();
    let (m1, m2) = (a.mass, b.mass);

    let (v1n, v1t) = (a.vel.dot(normal), a.vel.dot(tangent));
    let (v2n, v2t) = (b.vel.dot(normal), b.vel.dot(tangent));

    let v1n_after = (v1n * (m1 - m2) + 2.0 * m2 * v2n) / (m1 + m2);
    let v2n_after = (v2n * (m2 - m1) + 2.0 * m1 * v1n) / (m1 + m2);

    a.vel = (normal * v1n_after + tangent * v1t) * energy_loss;
    b.vel = (normal * v2n_after + tangent * v2t) * energy_loss;
    true
}

/// Spin heuristic: each body picks up `friction * cross(r_hat, v_partner)`
/// minus `damping` times the partner's previous torque. Not physically
/// derived (no moment of inertia) and only ever written to `torque`.
pub fn exchange_torque(
    a: &mut Particle,
    b: &mut Particle,
    prior_vel_a: Vec2,
    prior_vel_b: Vec2,
    settings: &TorqueConfig,
) {
    let offset = b.pos - a.pos;
    let r_a = offset / offset.length();
    let r_b = -r_a;
    let (prior_a, prior_b) = (a.torque, b.torque);

    a.torque = settings.friction * r_a.perp_dot(prior_vel_b) - settings.damping * prior_b;
    b.torque = settings.friction * r_b.perp_dot(prior_vel_a) - settings.damping * prior_a;
}

/// Full resolution of an overlapping pair: separate, then impulse, then the
/// optional spin exchange. Returns false if the pair was skipped as touching.
pub fn collision_resolve(a: &mut Particle, b: &mut Particle, settings: &CollisionSettings) -> bool {
    if separate(a, b, settings.border).is_none() {
        return false;
    }
    let (prior_a, prior_b) = (a.vel, b.vel);
    if apply_impulse(a, b, settings.energy_loss) {
        if let Some(torque) = &settings.torque {
            exchange_torque(a, b, prior_a, prior_b, torque);
        }
    }
    true
}

/// Visits `(i, j)` for every `i` in `begin..end` and every `j` in `i+1..total`.
pub fn for_each_pair_in_range<F>(total: usize, begin: usize, end: usize, mut visit: F)
where
    F: FnMut(usize, usize),
{
    for i in begin..end.min(total) {
        for j in (i + 1)..total {
            visit(i, j);
        }
    }
}

/// Visits every unordered pair of ids inside one group.
pub fn for_each_pair_in_group<F>(group: &[usize], mut visit: F)
where
    F: FnMut(usize, usize),
{
    for (k, &i) in group.iter().enumerate() {
        for &j in &group[k + 1..] {
            visit(i, j);
        }
    }
}

/// Runs collision walks over a [`SharedBodies`] view. Holds only shared
/// references, so one engine can be used from every worker at once.
pub struct CollisionEngine<'a> {
    bodies: &'a SharedBodies,
    settings: &'a CollisionSettings,
}

impl<'a> CollisionEngine<'a> {
    pub fn new(bodies: &'a SharedBodies, settings: &'a CollisionSettings) -> Self {
        Self { bodies, settings }
    }

    fn test_pair(&self, i: usize, j: usize, tally: &mut CollisionTally) {
        tally.comparisons += 1;
        let mut a = self.bodies.load(i);
        let mut b = self.bodies.load(j);
        if !collision_check(&a, &b) {
            return;
        }
        tally.resolutions += 1;
        if collision_resolve(&mut a, &mut b, self.settings) {
            self.bodies.store(&a);
            self.bodies.store(&b);
        }
    }

    /// Brute force: every `i` in `begin..end` against every later index.
    pub fn collision_log_nxn(&self, begin: usize, end: usize) -> CollisionTally {
        let mut tally = CollisionTally::default();
        for_each_pair_in_range(self.bodies.len(), begin, end, |i, j| {
            self.test_pair(i, j, &mut tally)
        });
        tally
    }

    /// Partitioned: pairs inside each group only.
    pub fn collide_groups(&self, groups: &[&[usize]]) -> CollisionTally {
        let mut tally = CollisionTally::default();
        for group in groups {
            for_each_pair_in_group(group, |i, j| self.test_pair(i, j, &mut tally));
        }
        tally
    }
}

/// Single-threaded brute-force pass straight over a particle slice.
pub fn collide_all(particles: &mut [Particle], settings: &CollisionSettings) -> CollisionTally {
    let bodies = SharedBodies::capture(particles);
    let tally = CollisionEngine::new(&bodies, settings).collision_log_nxn(0, particles.len());
    bodies.write_back(particles);
    tally
}
