//! Frame orchestration.
//!
//! One frame runs `physics_samples` substeps of
//! integrate -> partition rebuild -> collide, then refreshes render data.
//! Integration and collision fan out over the [`Dispatcher`] when
//! multithreading is on; the partition is always rebuilt on the calling
//! thread.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use parking_lot::{Mutex, MutexGuard};

use crate::bounds::Rect;
use crate::collision::{CollisionEngine, CollisionSettings};
use crate::config::SimConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::particle::{Color, Particle};
use crate::partition::{build_partition, SpatialPartition};
use crate::shared::SharedBodies;
use crate::stats::{CollisionStats, CollisionTally};
use crate::store::{integrate_slice, IntegrationSettings, ParticleStore};

/// Stage of a frame, reported to the observer passed to
/// [`Simulation::step_observed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Integrating,
    PartitionRebuild,
    Colliding,
}

/// What one call to [`Simulation::step`] did.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameReport {
    pub substeps: u32,
    pub collisions: CollisionTally,
    pub elapsed: Duration,
}

/// Cloneable handle for adding particles from another thread.
#[derive(Clone)]
pub struct Spawner {
    store: Arc<Mutex<ParticleStore>>,
}

impl Spawner {
    pub fn add(&self, pos: Vec2, radius: f32, color: Color) -> usize {
        self.store.lock().add(pos, radius, color)
    }
}

pub struct Simulation {
    config: SimConfig,
    store: Arc<Mutex<ParticleStore>>,
    partition: Option<Box<dyn SpatialPartition>>,
    dispatcher: Dispatcher,
    shared: SharedBodies,
    stats: CollisionStats,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let dispatcher = match config.thread_count {
            Some(workers) => Dispatcher::new(workers)?,
            None => Dispatcher::with_hardware_concurrency()?,
        };
        let partition = build_partition(&config.partition, Rect::from_size(config.viewport()));
        log::info!(
            "Simulation {}x{} with {:?} partition, {} substeps",
            config.viewport[0],
            config.viewport[1],
            config.partition.kind,
            config.physics_samples
        );

        Ok(Self {
            store: Arc::new(Mutex::new(ParticleStore::new(config.spawn.clone()))),
            partition,
            dispatcher,
            shared: SharedBodies::new(),
            stats: CollisionStats::new(),
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Swaps in a new configuration. The partition strategy is re-selected
    /// only if its settings changed. The worker pool is fixed for the life of
    /// the simulation, so a new thread count is ignored.
    pub fn set_config(&mut self, config: SimConfig) -> Result<()> {
        config.validate()?;
        if config.thread_count != self.config.thread_count {
            log::warn!(
                "Worker pool is fixed at {} threads; ignoring thread_count {:?}",
                self.dispatcher.worker_count(),
                config.thread_count
            );
        }
        if config.partition != self.config.partition || config.viewport != self.config.viewport {
            self.partition = build_partition(&config.partition, Rect::from_size(config.viewport()));
            log::info!("Switched to {:?} partition", config.partition.kind);
        }
        self.store.lock().set_spawn(config.spawn.clone());
        self.config = config;
        Ok(())
    }

    pub fn spawner(&self) -> Spawner {
        Spawner { store: Arc::clone(&self.store) }
    }

    pub fn add_particle(&self, pos: Vec2, radius: f32, color: Color) -> usize {
        self.store.lock().add(pos, radius, color)
    }

    /// Spawns `count` particles at random positions inside the viewport.
    pub fn scatter(&self, count: usize, radius: f32) -> Range<usize> {
        self.store.lock().scatter(count, radius, self.config.viewport())
    }

    pub fn remove_particles(&self, ids: &[usize]) -> usize {
        self.store.lock().remove(ids)
    }

    pub fn erase_all(&self) {
        self.store.lock().erase_all();
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locks the store for direct access (rendering, save/load).
    pub fn store(&self) -> MutexGuard<'_, ParticleStore> {
        self.store.lock()
    }

    /// Cumulative counters since construction or the last `reset_stats`.
    pub fn stats(&self) -> CollisionTally {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn worker_count(&self) -> usize {
        self.dispatcher.worker_count()
    }

    /// Advances one rendered frame of length `dt`.
    pub fn step(&mut self, dt: f32) -> FrameReport {
        self.step_observed(dt, |_| {})
    }

    /// Same as [`step`](Self::step), calling `observer` on every phase
    /// transition. A frame always ends with [`Phase::Idle`].
    pub fn step_observed<F>(&mut self, dt: f32, mut observer: F) -> FrameReport
    where
        F: FnMut(Phase),
    {
        let start = Instant::now();
        let store = Arc::clone(&self.store);
        let mut store = store.lock();

        let substeps = self.config.physics_samples;
        let sub_dt = self.config.substep_dt(dt);
        let mut collisions = CollisionTally::default();
        for _ in 0..substeps {
            collisions.merge(self.substep(&mut store, sub_dt, &mut observer));
        }
        store.refresh_render_data(dt);
        observer(Phase::Idle);

        let report = FrameReport { substeps, collisions, elapsed: start.elapsed() };
        log::debug!(
            "Frame: {} particles, {} substeps, {} comparisons, {} resolutions in {:?}",
            store.len(),
            substeps,
            collisions.comparisons,
            collisions.resolutions,
            report.elapsed
        );
        report
    }

    fn substep<F>(&mut self, store: &mut ParticleStore, dt: f32, observer: &mut F) -> CollisionTally
    where
        F: FnMut(Phase),
    {
        observer(Phase::Integrating);
        self.integrate(store.particles_mut(), dt);

        if !self.config.intercollision || store.is_empty() {
            return CollisionTally::default();
        }

        observer(Phase::PartitionRebuild);
        self.rebuild_partition(store.particles());

        observer(Phase::Colliding);
        self.collide(store.particles_mut())
    }

    fn integrate(&self, particles: &mut [Particle], dt: f32) {
        let settings = IntegrationSettings::from_config(&self.config);
        if self.config.multithreading {
            self.dispatcher
                .parallel_for_each_mut(particles, |_, chunk| integrate_slice(chunk, dt, &settings));
        } else {
            integrate_slice(particles, dt, &settings);
        }
    }

    fn rebuild_partition(&mut self, particles: &[Particle]) {
        let viewport = Rect::from_size(self.config.viewport());
        let optimized = self.config.partition.optimized_size;
        let Some(partition) = self.partition.as_mut() else {
            return;
        };
        let bounds = if optimized {
            Rect::enclosing(particles.iter().map(|p| p.pos)).unwrap_or(viewport)
        } else {
            viewport
        };
        partition.reset(bounds);
        partition.input(particles);
    }

    fn collide(&mut self, particles: &mut [Particle]) -> CollisionTally {
        self.shared.reload(particles);
        let settings = CollisionSettings::from_config(&self.config);
        let engine = CollisionEngine::new(&self.shared, &settings);
        let parallel = self.config.multithreading;

        let tally = match &self.partition {
            None if parallel => {
                let batch = CollisionStats::new();
                self.dispatcher.parallel_for_each(self.shared.len(), |begin, end| {
                    batch.add(engine.collision_log_nxn(begin, end))
                });
                batch.snapshot()
            }
            None => engine.collision_log_nxn(0, self.shared.len()),
            Some(partition) => {
                let mut groups = Vec::new();
                partition.get(&mut groups);
                if parallel {
                    let batch = CollisionStats::new();
                    self.dispatcher.parallel_for_each(groups.len(), |begin, end| {
                        batch.add(engine.collide_groups(&groups[begin..end]))
                    });
                    batch.snapshot()
                } else {
                    engine.collide_groups(&groups)
                }
            }
        };

        self.stats.add(tally);
        self.shared.write_back(particles);
        tally
    }

    /// The partition as of the last substep, if collisions are using one.
    fn active_partition(&self) -> Option<&dyn SpatialPartition> {
        if self.config.intercollision {
            self.partition.as_deref()
        } else {
            None
        }
    }

    /// Ids of particles whose circles overlap the query circle, ascending.
    /// Uses the partition from the previous substep, so cells may be one
    /// substep stale; falls back to brute force without a partition.
    pub fn get_particles_in_circle(&self, center: Vec2, radius: f32) -> Vec<usize> {
        let store = self.store.lock();
        let particles = store.particles();
        let overlaps = |id: usize| {
            particles.get(id).is_some_and(|p| {
                let reach = p.radius + radius;
                p.pos.distance_squared(center) < reach * reach
            })
        };

        let mut ids: Vec<usize> = match self.active_partition() {
            Some(partition) => {
                let mut cells = Vec::new();
                partition.get_neighbours(&mut cells, center, radius);
                cells
                    .iter()
                    .flat_map(|cell| cell.iter().copied())
                    .filter(|&id| overlaps(id))
                    .collect()
            }
            None => (0..particles.len()).filter(|&id| overlaps(id)).collect(),
        };
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Gravity well: accelerates every particle in the query circle toward
    /// its centre. The acceleration is consumed by the next integration.
    /// Returns how many particles were pulled.
    pub fn attract(&self, center: Vec2, radius: f32, strength: f32) -> usize {
        let ids = self.get_particles_in_circle(center, radius);
        let mut store = self.store.lock();
        let particles = store.particles_mut();
        for &id in &ids {
            let p = &mut particles[id];
            let to_center = center - p.pos;
            let distance = to_center.length();
            if distance > f32::EPSILON {
                p.acc += to_center / distance * strength;
            }
        }
        ids.len()
    }

    /// Bounds of every occupied partition cell, for the debug overlay.
    pub fn partition_bounds(&self) -> Vec<Rect> {
        let mut out = Vec::new();
        if let Some(partition) = self.active_partition() {
            partition.draw_bounds(&mut out);
        }
        out
    }
}
