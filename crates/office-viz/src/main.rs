//! Office Simulation Viewer
//!
//! Run with: cargo run -p office-viz
//!
//! Examples:
//!   cargo run -p office-viz -- --seed 7 --characters 12
//!   cargo run -p office-viz -- --config office.toml --tick-interval-ms 250

use bevy::prelude::*;
use clap::Parser;
use office_core::SimConfig;
use office_viz::live::LaunchSettings;
use office_viz::{OfficeVizPlugin, ViewerConfig};
use std::path::{Path, PathBuf};

/// Office Simulation Viewer
#[derive(Parser, Debug)]
#[command(name = "office-viz")]
#[command(about = "Live viewer for the office simulation")]
struct Args {
    /// Simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewer config (JSON)
    #[arg(long)]
    viewer_config: Option<PathBuf>,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Number of characters, overrides the config
    #[arg(long)]
    characters: Option<usize>,

    /// Milliseconds between ticks, overrides the config
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Most dialogue bubbles shown at once
    #[arg(long)]
    max_bubbles: Option<usize>,
}

fn load_viewer_config(path: &Path) -> Result<ViewerConfig, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();

    let mut sim = match &args.config {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        sim.clock.seed = seed;
    }
    if let Some(count) = args.characters {
        sim.clock.character_count = count;
    }
    if let Some(ms) = args.tick_interval_ms {
        sim.clock.tick_interval_ms = ms;
    }

    let mut viewer = match &args.viewer_config {
        Some(path) => match load_viewer_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => ViewerConfig::default(),
    };
    if let Some(max) = args.max_bubbles {
        viewer.max_bubbles = max;
    }

    App::new()
        .insert_resource(LaunchSettings { sim })
        .insert_resource(viewer)
        .add_plugins(OfficeVizPlugin)
        .run();
}
