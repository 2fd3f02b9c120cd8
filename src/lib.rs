//! Core of a real-time 2D particle sandbox.
//!
//! Thousands of discs move under gravity and collide with each other every
//! frame. The crate covers the physics only: storage, integration, broad phase
//! (quadtree or uniform grid), narrow phase and resolution, and fork-join
//! dispatch across a fixed worker pool. Windowing and rendering live
//! elsewhere and talk to the [`Simulation`] through frame deltas, the render
//! arrays of the [`ParticleStore`], neighbour queries and the debug overlay.

pub mod bounds;
pub mod collision;
pub mod config;
pub mod contact;
pub mod dispatch;
pub mod error;
pub mod grid;
pub mod particle;
pub mod partition;
pub mod quadtree;
pub mod shared;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod vtk;

pub use bounds::Rect;
pub use collision::{collision_check, collision_resolve, CollisionEngine, CollisionSettings};
pub use config::{PartitionConfig, PartitionKind, SimConfig, SpawnConfig, TorqueConfig};
pub use dispatch::Dispatcher;
pub use error::{Result, SandboxError};
pub use grid::UniformGrid;
pub use particle::{Color, Particle};
pub use partition::SpatialPartition;
pub use quadtree::Quadtree;
pub use simulation::{FrameReport, Phase, Simulation, Spawner};
pub use stats::CollisionTally;
pub use store::ParticleStore;
