//! vidpat - Entry Point
//!
//! Builds a pattern engine from a configuration file and command-line
//! overrides, runs it headless for a number of frames, and optionally
//! writes the last frame out as a PNG or shows it in a window.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::info;

use vidpat::config::{Config, PatternKind};

/// Video test-pattern generator
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pattern to run (bars, configurable-bars, color-bars, tilemap,
    /// sprite, bouncing-sprite, logo)
    #[arg(short, long)]
    pattern: Option<String>,

    /// Video mode preset, e.g. 640x480@60Hz
    #[arg(short, long)]
    timing: Option<String>,

    /// Frames to run headless
    #[arg(short, long, default_value = "2")]
    frames: u32,

    /// Tilemap generation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the last completed frame to this PNG file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Show the output in a window (needs the `ui` feature)
    #[arg(long)]
    window: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(name) = &args.pattern {
        config.pattern = PatternKind::from_name(name)
            .ok_or_else(|| anyhow!("unknown pattern {:?}", name))?;
    }
    if let Some(timing) = &args.timing {
        config.timing = timing.clone();
        config.custom_timing = None;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("invalid configuration")?;

    let mut system = config.build_system().context("building pattern")?;

    if args.window {
        return run_window(&mut system);
    }

    for _ in 0..args.frames {
        if !system.run_frame() {
            bail!("pattern produced no frame; is it enabled?");
        }
    }
    let frames = system
        .read_frames()
        .ok_or_else(|| anyhow!("frame counter read timed out"))?;
    info!(
        "{} frames completed, {} discarded",
        frames, system.sink.torn_frames
    );

    if let Some(path) = &args.snapshot {
        system
            .sink
            .save_png(path)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
    }

    Ok(())
}

#[cfg(feature = "ui")]
fn run_window(system: &mut vidpat::system::VideoSystem) -> Result<()> {
    let mut ui = vidpat::ui::Ui::new(system.sink.width(), system.sink.height())
        .map_err(|e| anyhow!("opening window: {}", e))?;
    ui.run(system).map_err(|e| anyhow!("viewer: {}", e))
}

#[cfg(not(feature = "ui"))]
fn run_window(_system: &mut vidpat::system::VideoSystem) -> Result<()> {
    bail!("built without the `ui` feature")
}
