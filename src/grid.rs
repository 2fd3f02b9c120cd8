use glam::{IVec2, Vec2};

use crate::bounds::Rect;
use crate::particle::Particle;
use crate::partition::SpatialPartition;

/// Fixed uniform grid. `cell_count` is spread over `sqrt(cell_count)`
/// divisions per axis; cells never split.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    cell_count: usize,
    world: Rect,
    cell_size: Vec2,
    grid_dims: IVec2,
    cells: Vec<Vec<usize>>, // Stores particle indices
}

impl UniformGrid {
    pub fn new(world: Rect, cell_count: usize) -> Self {
        let mut grid = Self {
            cell_count,
            world,
            cell_size: Vec2::ONE,
            grid_dims: IVec2::ONE,
            cells: Vec::new(),
        };
        grid.reinitialize(world);
        grid
    }

    pub fn divisions(&self) -> IVec2 {
        self.grid_dims
    }

    pub fn world(&self) -> Rect {
        self.world
    }

    fn reinitialize(&mut self, world: Rect) {
        let per_axis = ((self.cell_count as f32).sqrt() as i32).max(1);
        self.world = world;
        self.grid_dims = IVec2::splat(per_axis);
        // Degenerate worlds (all particles on one line) still get finite cells
        self.cell_size = (world.size() / per_axis as f32).max(Vec2::splat(f32::MIN_POSITIVE));
        self.cells = vec![Vec::new(); (per_axis * per_axis) as usize];
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    fn cell_index(&self, coords: IVec2) -> usize {
        (coords.x + coords.y * self.grid_dims.x) as usize
    }

    fn cell_bounds(&self, coords: IVec2) -> Rect {
        let min = self.world.min + coords.as_vec2() * self.cell_size;
        Rect::new(min, min + self.cell_size)
    }

    /// Inclusive range of cell coordinates touched by the circle's bounding
    /// box, or `None` if it misses the grid entirely.
    fn covered_cells(&self, center: Vec2, radius: f32) -> Option<(IVec2, IVec2)> {
        if !self.world.contains_circle(center, radius) {
            return None;
        }
        let max_coord = self.grid_dims - IVec2::ONE;
        let lo = ((center - radius - self.world.min) / self.cell_size)
            .floor()
            .as_ivec2()
            .clamp(IVec2::ZERO, max_coord);
        let hi = ((center + radius - self.world.min) / self.cell_size)
            .floor()
            .as_ivec2()
            .clamp(IVec2::ZERO, max_coord);
        Some((lo, hi))
    }

    pub fn insert(&mut self, id: usize, particle: &Particle) {
        let Some((lo, hi)) = self.covered_cells(particle.pos, particle.radius) else {
            return;
        };
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                let idx = self.cell_index(IVec2::new(x, y));
                self.cells[idx].push(id);
            }
        }
    }

    fn occupied(&self) -> impl Iterator<Item = (IVec2, &Vec<usize>)> {
        let width = self.grid_dims.x;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(move |(i, cell)| (IVec2::new(i as i32 % width, i as i32 / width), cell))
    }
}

impl SpatialPartition for UniformGrid {
    /// Clears in place when the bounds are unchanged, rebuilds the cell layout
    /// otherwise.
    fn reset(&mut self, bounds: Rect) {
        if bounds == self.world {
            self.clear();
        } else {
            self.reinitialize(bounds);
        }
    }

    fn input(&mut self, particles: &[Particle]) {
        for (id, p) in particles.iter().enumerate() {
            self.insert(id, p);
        }
    }

    fn get<'a>(&'a self, out: &mut Vec<&'a [usize]>) {
        out.extend(self.occupied().map(|(_, cell)| cell.as_slice()));
    }

    fn get_neighbours<'a>(&'a self, out: &mut Vec<&'a [usize]>, center: Vec2, radius: f32) {
        let Some((lo, hi)) = self.covered_cells(center, radius) else {
            return;
        };
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                let coords = IVec2::new(x, y);
                let cell = &self.cells[self.cell_index(coords)];
                if !cell.is_empty() && self.cell_bounds(coords).intersects_circle(center, radius) {
                    out.push(cell);
                }
            }
        }
    }

    fn draw_bounds(&self, out: &mut Vec<Rect>) {
        out.extend(self.occupied().map(|(coords, _)| self.cell_bounds(coords)));
    }
}
