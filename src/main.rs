use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use rusty_sandbox::vtk::write_vtk;
use rusty_sandbox::{snapshot, SimConfig, Simulation};

/// Headless particle sandbox runner.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of particles to scatter
    #[arg(short = 'n', long, default_value_t = 5000)]
    count: usize,

    /// Particle radius
    #[arg(short, long, default_value_t = 5.0)]
    radius: f32,

    /// Frames to simulate
    #[arg(short, long, default_value_t = 600)]
    frames: usize,

    /// Frame length in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Output directory for VTK frames and the final snapshot
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Write a VTK frame every N frames (0 disables)
    #[arg(long, default_value_t = 10)]
    vtk_interval: usize,

    /// Resume from a snapshot instead of scattering particles
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimConfig::load(path).with_context(|| format!("loading {:?}", path))?,
        None => SimConfig::default(),
    };
    let mut sim = Simulation::new(config)?;

    match &args.resume {
        Some(path) => snapshot::load(path, &mut sim.store())
            .with_context(|| format!("resuming from {:?}", path))?,
        None => {
            sim.scatter(args.count, args.radius);
        }
    }
    log::info!("Running {} particles on {} workers", sim.len(), sim.worker_count());

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {:?}", args.output))?;

    let bar = ProgressBar::new(args.frames as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    for frame in 0..args.frames {
        let report = sim.step(args.dt);
        bar.set_message(format!("{} hits", report.collisions.resolutions));

        if args.vtk_interval > 0 && frame % args.vtk_interval == 0 {
            let path = args.output.join(format!("frame_{:05}.vtk", frame));
            let store = sim.store();
            if let Err(e) = write_vtk(&path, store.particles(), store.colors()) {
                log::error!("Error writing {:?}: {}", path, e);
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("done");

    let stats = sim.stats();
    log::info!(
        "Finished: {} comparisons, {} resolutions",
        stats.comparisons,
        stats.resolutions
    );

    let final_state = args.output.join("final.snapshot");
    snapshot::save(&final_state, &sim.store())
        .with_context(|| format!("writing {:?}", final_state))?;
    Ok(())
}
