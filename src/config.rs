//! Runtime configuration for the sandbox.
//!
//! All tunables live in [`SimConfig`], which is handed to the
//! [`Simulation`](crate::simulation::Simulation) at construction and replaced
//! through `set_config`. It deserializes from YAML; every field has a default,
//! so a file only needs the values it changes:
//!
//! ```yaml
//! viewport: [1024.0, 768.0]
//! gravity: 9.81
//! collision_energy_loss: 1.0
//! border_collision: true
//! physics_samples: 8
//! partition:
//!   kind: quadtree        # none | quadtree | grid
//!   capacity: 100
//!   max_depth: 10
//! torque:
//!   enabled: true
//! spawn:
//!   random_velocity: true
//!   force_range: [-10.0, 10.0]
//!   seed: 42
//! ```

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SandboxError};

/// Which broad-phase structure bins particles before collision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Brute force over every pair.
    None,
    #[default]
    Quadtree,
    /// Uniform grid with a fixed number of cells.
    Grid,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PartitionConfig {
    pub kind: PartitionKind,
    /// Quadtree leaf size that triggers a split.
    pub capacity: usize,
    /// Quadtree nodes at this depth never split. A clump denser than
    /// `capacity` can produce up to `4^max_depth` leaves, so keep this small.
    pub max_depth: u32,
    /// Total uniform grid cells; rounded to a square layout.
    pub cell_count: usize,
    /// Fit the partition root to the particles instead of the whole viewport.
    pub optimized_size: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            kind: PartitionKind::Quadtree,
            capacity: 100,
            max_depth: 10,
            cell_count: 64,
            optimized_size: true,
        }
    }
}

/// Visual spin. Torque never feeds back into the linear dynamics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TorqueConfig {
    pub enabled: bool,
    pub friction: f32,
    /// Fraction of the partner's previous torque taken off on contact.
    pub damping: f32,
}

impl Default for TorqueConfig {
    fn default() -> Self {
        Self { enabled: true, friction: 0.05, damping: 0.3 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpawnConfig {
    pub density: f32,
    pub random_velocity: bool,
    /// Inclusive range for each initial velocity component.
    pub force_range: [f32; 2],
    /// Seed for the store's RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            random_velocity: false,
            force_range: [-10.0, 10.0],
            seed: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub viewport: [f32; 2],
    /// Downward (-y) acceleration.
    pub gravity: f32,
    pub air_resistance: f32,
    /// Velocity scale applied after every particle/particle impulse.
    pub collision_energy_loss: f32,
    /// Velocity scale applied when a particle bounces off the border.
    pub border_energy_loss: f32,
    pub border_collision: bool,
    pub intercollision: bool,
    pub partition: PartitionConfig,
    /// Substeps per frame.
    pub physics_samples: u32,
    pub multithreading: bool,
    /// Worker pool size. `None` uses the hardware concurrency.
    pub thread_count: Option<usize>,
    pub torque: TorqueConfig,
    pub spawn: SpawnConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            viewport: [1024.0, 768.0],
            gravity: 9.81,
            air_resistance: 0.0,
            collision_energy_loss: 1.0,
            border_energy_loss: 0.9,
            border_collision: true,
            intercollision: true,
            partition: PartitionConfig::default(),
            physics_samples: 8,
            multithreading: true,
            thread_count: None,
            torque: TorqueConfig::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: SimConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&text)?;
        log::info!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn viewport(&self) -> Vec2 {
        Vec2::from(self.viewport)
    }

    /// Length of one substep for a frame of length `dt`.
    pub fn substep_dt(&self, dt: f32) -> f32 {
        dt / self.physics_samples.max(1) as f32
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(SandboxError::InvalidConfig(msg)) };

        if !(self.viewport[0] > 0.0 && self.viewport[1] > 0.0) {
            return invalid(format!("viewport must be positive, got {:?}", self.viewport));
        }
        if self.physics_samples == 0 {
            return invalid("physics_samples must be at least 1".into());
        }
        for (name, value) in [
            ("collision_energy_loss", self.collision_energy_loss),
            ("border_energy_loss", self.border_energy_loss),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return invalid(format!("{name} must be in (0, 1], got {value}"));
            }
        }
        if self.air_resistance < 0.0 {
            return invalid(format!("air_resistance must be >= 0, got {}", self.air_resistance));
        }
        if self.partition.capacity == 0 {
            return invalid("partition.capacity must be at least 1".into());
        }
        if self.partition.cell_count == 0 {
            return invalid("partition.cell_count must be at least 1".into());
        }
        if self.thread_count == Some(0) {
            return Err(SandboxError::ZeroWorkers);
        }
        if self.spawn.density <= 0.0 {
            return invalid(format!("spawn.density must be positive, got {}", self.spawn.density));
        }
        if self.spawn.force_range[0] > self.spawn.force_range[1] {
            return invalid(format!("spawn.force_range is reversed: {:?}", self.spawn.force_range));
        }
        Ok(())
    }
}
