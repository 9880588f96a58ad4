//! Headless scenario runner
//!
//! Generates a synthetic seeded scenario, resolves a number of turns and
//! prints per-turn summaries or a final JSON snapshot. Supply and overrun
//! inputs are synthesized deterministically from the same seed, so two runs
//! with identical arguments produce identical output.

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use salient::core::error::Result;
use salient::core::EngineConfig;
use salient::turn::{run_turn, TurnReport};
use salient::world::generate::{generate_world, synthetic_turn_inputs, ScenarioParams};
use salient::world::WorldState;

/// Headless turn resolution runner
#[derive(Parser, Debug)]
#[command(name = "salient")]
#[command(about = "Resolve turns of a synthetic territorial conflict scenario")]
struct Args {
    /// Random seed for scenario generation and synthetic inputs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of turns to resolve
    #[arg(long, default_value_t = 12)]
    turns: u32,

    /// Number of municipalities in the generated scenario
    #[arg(long, default_value_t = 8)]
    municipalities: usize,

    /// Optional TOML file overriding engine tunables
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct RunOutput {
    seed: u64,
    turns: u32,
    world: WorldState,
    reports: Vec<TurnReport>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "salient=info".to_string()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let params = ScenarioParams {
        municipalities: args.municipalities,
        ..ScenarioParams::default()
    };
    let mut world = generate_world(&params, args.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed ^ 0x7ea7);

    tracing::info!(
        seed = args.seed,
        settlements = world.settlements.len(),
        formations = world.formations.len(),
        "scenario generated"
    );

    let mut reports = Vec::new();
    for turn in 1..=args.turns {
        world.turn = turn;
        let inputs = synthetic_turn_inputs(&world, &mut rng);
        let report = run_turn(&mut world, &config, &inputs);

        if args.format == "text" {
            print_turn_summary(&report, &world);
        }
        reports.push(report);
    }

    if args.format == "json" {
        let output = RunOutput {
            seed: args.seed,
            turns: args.turns,
            world,
            reports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "resolved {} turns: {} control events, {} open holdouts",
            args.turns,
            world.events.len(),
            world.holdouts.len()
        );
    }

    Ok(())
}

fn print_turn_summary(report: &TurnReport, world: &WorldState) {
    let active: u32 = report.lifecycle.by_faction.iter().map(|f| f.active).sum();
    let effective: u32 = report
        .commitment
        .by_faction
        .iter()
        .map(|f| f.total_effective_weight)
        .sum();
    println!(
        "turn {:>3}: {} formations ({} active), effective weight {}, {} control events, {} holdouts open",
        report.turn,
        report.lifecycle.by_formation.len(),
        active,
        effective,
        report.control.events.len(),
        world.holdouts.len()
    );
}
