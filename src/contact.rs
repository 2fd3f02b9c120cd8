use glam::Vec2;

use crate::particle::Particle;

/// Geometry of an overlapping pair, measured from `a` toward `b`.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub offset: Vec2, // pos_b - pos_a
    pub distance: f32,
    pub depth: f32, // (ra + rb) - distance
    pub angle: f32, // atan2 of offset
}

impl Contact {
    pub fn between(a: &Particle, b: &Particle) -> Self {
        let offset = b.pos - a.pos;
        let distance = offset.length();
        Self {
            offset,
            distance,
            depth: (a.radius + b.radius) - distance,
            angle: offset.y.atan2(offset.x),
        }
    }

    /// Unit vector along the contact angle.
    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    /// Contact normal from `a` to `b`. Coincident centres give NaN components.
    pub fn normal(&self) -> Vec2 {
        self.offset / self.distance
    }
}
