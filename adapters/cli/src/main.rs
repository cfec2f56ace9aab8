#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Hashguard sessions headlessly.

mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashguard_core::{BalanceConfig, Event};
use hashguard_simulation::{SessionRecord, Simulation};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(
    name = "hashguard",
    author,
    version,
    about = "Runs Hashguard tower-defense sessions without a renderer"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulates a scenario for a fixed number of ticks and prints its record.
    Run {
        /// Path to the TOML scenario file.
        scenario: PathBuf,

        /// Number of ticks to simulate.
        #[arg(short, long, default_value_t = 600)]
        ticks: u32,

        /// Game time covered by each tick, in milliseconds.
        #[arg(short, long, default_value_t = 100)]
        step_ms: u64,

        /// File holding an encoded session record to resume from.
        #[arg(short, long)]
        resume: Option<PathBuf>,

        /// Seconds spent away, credited as offline earnings before the first tick.
        #[arg(long)]
        offline_secs: Option<u64>,
    },
    /// Prints the default balance configuration as TOML.
    Balance,
}

/// Entry point for the Hashguard command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Commands::Run {
            scenario,
            ticks,
            step_ms,
            resume,
            offline_secs,
        } => {
            let options = RunOptions {
                ticks,
                step: Duration::from_millis(step_ms),
                offline: offline_secs.map(Duration::from_secs),
            };
            run(&scenario, resume.as_deref(), &options)
        }
        Commands::Balance => {
            let rendered = toml::to_string(&BalanceConfig::default())
                .context("failed to render balance configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

struct RunOptions {
    ticks: u32,
    step: Duration,
    offline: Option<Duration>,
}

fn run(path: &Path, resume: Option<&Path>, options: &RunOptions) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut simulation = match resume {
        Some(record_path) => {
            let encoded = fs::read_to_string(record_path)
                .with_context(|| format!("failed to read record {}", record_path.display()))?;
            let record = SessionRecord::decode(&encoded)
                .with_context(|| format!("failed to decode record {}", record_path.display()))?;
            info!(tick = record.tick_index(), hash = record.hash(), "resuming session");
            Simulation::resume(scenario.session, record)
                .context("record does not belong to this scenario")?
        }
        None => {
            let mut simulation =
                Simulation::create(scenario.session).context("failed to create session")?;
            for placement in &scenario.placements {
                simulation.execute(placement.command()).with_context(|| {
                    format!(
                        "failed to place {} on slot {}",
                        placement.protocol,
                        placement.slot.get()
                    )
                })?;
            }
            simulation
        }
    };

    if let Some(elapsed) = options.offline {
        let _ = simulation.credit_offline(elapsed);
    }

    let mut tally = Tally::default();
    tally.observe_all(&simulation.take_events());
    for _ in 0..options.ticks {
        tally.observe_all(&simulation.advance(options.step));
        tally.observe_all(&simulation.take_events());
    }

    let snapshot = simulation.snapshot();
    println!(
        "tick {} | hash {}/{} | power {}/{} | efficiency {:.1}{}",
        snapshot.tick_index,
        snapshot.hash,
        snapshot.hash_capacity,
        snapshot.power_used,
        snapshot.power_capacity,
        snapshot.efficiency,
        if snapshot.frozen { " (frozen)" } else { "" },
    );
    println!(
        "wave {} ({:?}) | towers {} | enemies {} | killed {} | breached {}",
        snapshot.waves.wave,
        snapshot.waves.phase,
        snapshot.towers.len(),
        snapshot.enemies.len(),
        tally.kills,
        tally.breaches,
    );
    println!("boss {:?}", snapshot.boss);

    let record = simulation
        .record()
        .context("session is not settled")?
        .encode()
        .context("failed to encode session record")?;
    println!("{record}");
    Ok(())
}

#[derive(Debug, Default)]
struct Tally {
    kills: u32,
    breaches: u32,
}

impl Tally {
    fn observe_all(&mut self, events: &[Event]) {
        for event in events {
            self.observe(event);
        }
    }

    fn observe(&mut self, event: &Event) {
        match event {
            Event::EnemyKilled { .. } => self.kills += 1,
            Event::EnemyBreached { boss, .. } => {
                self.breaches += 1;
                if *boss {
                    warn!("boss breached the core");
                }
            }
            Event::SystemFrozen => warn!("system frozen"),
            Event::BossAlerted { sector } => info!(%sector, "boss alert"),
            Event::SectorUnlocked { sector } => info!(%sector, "sector unlocked"),
            Event::TimeAdvanced { .. } => {}
            _ => debug!(?event, "event"),
        }
    }
}
