use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// A circular body.
///
/// `id` always equals the particle's index in the owning store. The layout is
/// `#[repr(C)]` without padding so whole arrays can be dumped byte-for-byte.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub acc: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub torque: f32,
}

impl Particle {
    pub fn new(id: usize, pos: Vec2, radius: f32, mass: f32) -> Self {
        Self {
            id: id as u32,
            pos,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            mass,
            radius,
            torque: 0.0,
        }
    }

    pub fn index(&self) -> usize {
        self.id as usize
    }

    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.vel.length_squared()
    }

    pub fn momentum(&self) -> Vec2 {
        self.vel * self.mass
    }
}

/// Mass of a disc of the given radius: density * pi * r^2.
pub fn mass_from_radius(density: f32, radius: f32) -> f32 {
    density * std::f32::consts::PI * radius * radius
}

/// Linear RGBA color handed to the renderer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}
