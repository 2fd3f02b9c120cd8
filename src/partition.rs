//! Broad phase: binning particle ids into cells.
//!
//! Both strategies implement [`SpatialPartition`] and produce the same output
//! shape, a list of id groups. Only ids inside the same group are tested
//! against each other. A particle whose circle straddles a cell edge lands in
//! every cell it touches.
//!
//! Partitions hold plain indices into the particle slice they were fed; they
//! are rebuilt every substep and never keep a reference to the store.

use glam::Vec2;

use crate::bounds::Rect;
use crate::config::{PartitionConfig, PartitionKind};
use crate::grid::UniformGrid;
use crate::particle::Particle;
use crate::quadtree::Quadtree;

pub trait SpatialPartition: Send + Sync {
    /// Drops all contents and sets the world bounds.
    fn reset(&mut self, bounds: Rect);

    /// Inserts every particle, in index order.
    fn input(&mut self, particles: &[Particle]);

    /// All non-empty cells, one group per cell.
    fn get<'a>(&'a self, out: &mut Vec<&'a [usize]>);

    /// Non-empty cells whose bounds intersect the query circle.
    fn get_neighbours<'a>(&'a self, out: &mut Vec<&'a [usize]>, center: Vec2, radius: f32);

    /// Bounds of every occupied cell, for the debug overlay.
    fn draw_bounds(&self, out: &mut Vec<Rect>);
}

/// Builds the strategy selected by `config`, or `None` for brute force.
pub fn build_partition(config: &PartitionConfig, world: Rect) -> Option<Box<dyn SpatialPartition>> {
    match config.kind {
        PartitionKind::None => None,
        PartitionKind::Quadtree => Some(Box::new(Quadtree::new(
            world,
            config.capacity,
            config.max_depth,
        ))),
        PartitionKind::Grid => Some(Box::new(UniformGrid::new(world, config.cell_count))),
    }
}
