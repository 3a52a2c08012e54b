//! Office Simulation
//!
//! Headless runner. Steps the simulation as fast as possible (or on the
//! wall clock with `--realtime`), answers generator requests with canned
//! replies and prints the event stream.

use clap::Parser;
use office_core::{CannedGenerator, SimConfig, Simulation};
use office_events::{EventKind, SimEvent};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "office-sim")]
#[command(about = "A tile-based office life simulation")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Random seed for reproducibility (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of characters (overrides the config file)
    #[arg(long)]
    characters: Option<usize>,

    /// Tuning file; defaults to office.toml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tick interval for --realtime runs
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Pace ticks on the wall clock through the async runtime
    #[arg(long)]
    realtime: bool,

    /// Print every event as one JSON object per line
    #[arg(long)]
    jsonl: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::load_or_default(),
    };
    if let Some(seed) = args.seed {
        config.clock.seed = seed;
    }
    if let Some(count) = args.characters {
        config.clock.character_count = count;
    }
    if let Some(ms) = args.tick_interval_ms {
        config.clock.tick_interval_ms = ms.max(1);
    }
    Ok(config)
}

/// Prints one event, or folds it into the per-kind tally
fn report(event: &SimEvent, jsonl: bool, tally: &mut BTreeMap<String, usize>) {
    if jsonl {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!(error = %e, "could not encode event"),
        }
        return;
    }
    *tally.entry(format!("{:?}", event.kind())).or_default() += 1;
    match event {
        SimEvent::DialogueLine(line) => {
            println!("[tick {:>5}] {}: {}", line.tick, line.speaker_name, line.text);
        }
        SimEvent::TaskCompleted { tick, task } => {
            println!("[tick {:>5}] finished {} ({})", tick, task.name, task.participants.join(", "));
        }
        SimEvent::TaskInterrupted { tick, task, reason } => {
            println!("[tick {:>5}] interrupted {}: {}", tick, task.name, reason);
        }
        SimEvent::TickState(snapshot) if snapshot.tick % 100 == 0 => {
            println!(
                "[tick {:>5}] {} with {} tasks and {} conversations",
                snapshot.tick,
                snapshot.sim_time,
                snapshot.tasks.len(),
                snapshot.encounters.len()
            );
        }
        _ => {}
    }
}

fn run_headless(config: SimConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut sim = Simulation::new(config)?;
    let mut tally = BTreeMap::new();
    report(&sim.world_init_event(), args.jsonl, &mut tally);

    for _ in 0..args.ticks {
        for event in sim.step() {
            report(&event, args.jsonl, &mut tally);
        }
        // Replies land before the next tick, like a generator that is never late.
        for request in sim.drain_generation_requests() {
            let reply = CannedGenerator::respond(&request);
            sim.apply_generation(request.request_id, Ok(reply));
        }
        for event in sim.drain_events() {
            report(&event, args.jsonl, &mut tally);
        }
    }
    sim.stop();
    for event in sim.drain_events() {
        report(&event, args.jsonl, &mut tally);
    }

    if !args.jsonl {
        println!();
        println!("Simulation complete. Ran {} ticks (run {}).", sim.tick(), sim.run_id());
        for (kind, count) in &tally {
            println!("  {:<16} {}", kind, count);
        }
    }
    Ok(())
}

async fn run_realtime(config: SimConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let (handle, init) = office_core::start(config, Arc::new(CannedGenerator))?;
    let mut events = handle.subscribe().await?;
    let mut tally = BTreeMap::new();
    report(&init, args.jsonl, &mut tally);

    while let Some(event) = events.recv().await {
        // The subscription repeats the WorldInit already reported.
        if event.kind() == EventKind::WorldInit {
            continue;
        }
        let done = matches!(&event, SimEvent::TickState(s) if s.tick >= args.ticks);
        report(&event, args.jsonl, &mut tally);
        if done {
            break;
        }
    }
    handle.stop().await?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing();

    if args.print_default_config {
        match SimConfig::default().to_toml() {
            Ok(text) => print!("{}", text),
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let result = if args.realtime {
        match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime.block_on(run_realtime(config, &args)),
            Err(e) => Err(e.into()),
        }
    } else {
        run_headless(config, &args)
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
