//! Region quadtree over particle circles.
//!
//! Nodes live in one arena and refer to their children by index. A node is
//! either a leaf holding ids or an internal node with exactly four children;
//! a leaf splits once when it holds more than `capacity` ids and sits above
//! `max_depth`. There is no merging: the tree is reset and refilled every
//! substep.
//!
//! A cluster of more than `capacity` particles whose circles all cover the
//! centre of a node (typical for a tight clump under a fitted root) lands in
//! all four children at every level. Such a clump grows the tree to
//! `4^max_depth` leaves that each hold the whole clump, so `max_depth` is the
//! only bound on that cost.

use glam::Vec2;

use crate::bounds::Rect;
use crate::particle::Particle;
use crate::partition::SpatialPartition;

#[derive(Debug, Clone)]
struct Node {
    bounds: Rect,
    depth: u32,
    children: Option<[usize; 4]>,
    ids: Vec<usize>,
}

impl Node {
    fn leaf(bounds: Rect, depth: u32) -> Self {
        Self { bounds, depth, children: None, ids: Vec::new() }
    }
}

#[derive(Debug, Clone)]
pub struct Quadtree {
    nodes: Vec<Node>,
    capacity: usize,
    max_depth: u32,
}

impl Quadtree {
    pub fn new(bounds: Rect, capacity: usize, max_depth: u32) -> Self {
        Self {
            nodes: vec![Node::leaf(bounds, 0)],
            capacity: capacity.max(1),
            max_depth,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.children.is_none()).count()
    }

    /// Deepest node currently in the tree.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn insert(&mut self, id: usize, particles: &[Particle]) {
        self.insert_at(0, id, particles);
    }

    fn insert_at(&mut self, node: usize, id: usize, particles: &[Particle]) {
        if let Some(children) = self.nodes[node].children {
            let p = &particles[id];
            for child in children {
                if self.nodes[child].bounds.contains_circle(p.pos, p.radius) {
                    self.insert_at(child, id, particles);
                }
            }
            return;
        }

        let leaf = &mut self.nodes[node];
        leaf.ids.push(id);
        if leaf.ids.len() > self.capacity && leaf.depth < self.max_depth {
            self.split(node, particles);
        }
    }

    fn split(&mut self, node: usize, particles: &[Particle]) {
        let depth = self.nodes[node].depth + 1;
        let quadrants = self.nodes[node].bounds.quadrants();

        let first = self.nodes.len();
        self.nodes
            .extend(quadrants.into_iter().map(|bounds| Node::leaf(bounds, depth)));
        let children = [first, first + 1, first + 2, first + 3];

        let ids = std::mem::take(&mut self.nodes[node].ids);
        self.nodes[node].children = Some(children);
        for id in ids {
            self.insert_at(node, id, particles);
        }
    }

    fn collect_leaves<'a>(&'a self, node: usize, out: &mut Vec<&'a [usize]>) {
        let n = &self.nodes[node];
        match n.children {
            Some(children) => {
                for child in children {
                    self.collect_leaves(child, out);
                }
            }
            None if !n.ids.is_empty() => out.push(&n.ids),
            None => {}
        }
    }

    fn collect_near<'a>(&'a self, node: usize, out: &mut Vec<&'a [usize]>, center: Vec2, radius: f32) {
        let n = &self.nodes[node];
        if !n.bounds.intersects_circle(center, radius) {
            return;
        }
        match n.children {
            Some(children) => {
                for child in children {
                    self.collect_near(child, out, center, radius);
                }
            }
            None if !n.ids.is_empty() => out.push(&n.ids),
            None => {}
        }
    }
}

impl SpatialPartition for Quadtree {
    fn reset(&mut self, bounds: Rect) {
        self.nodes.clear();
        self.nodes.push(Node::leaf(bounds, 0));
    }

    fn input(&mut self, particles: &[Particle]) {
        for id in 0..particles.len() {
            self.insert(id, particles);
        }
    }

    fn get<'a>(&'a self, out: &mut Vec<&'a [usize]>) {
        self.collect_leaves(0, out);
    }

    fn get_neighbours<'a>(&'a self, out: &mut Vec<&'a [usize]>, center: Vec2, radius: f32) {
        self.collect_near(0, out, center, radius);
    }

    fn draw_bounds(&self, out: &mut Vec<Rect>) {
        out.extend(
            self.nodes
                .iter()
                .filter(|n| n.children.is_none() && !n.ids.is_empty())
                .map(|n| n.bounds),
        );
    }
}
