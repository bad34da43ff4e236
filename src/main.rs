//! Headless Skirmish Runner
//!
//! Runs the skirmish AI against a scripted sandbox opponent and prints a
//! JSON summary of what it did.

use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use skirmish_ai::ai::{Commander, CommanderStats, Posture};
use skirmish_ai::core::config::{NoScripting, TomlTunables, Tunables};
use skirmish_ai::core::error::Result;
use skirmish_ai::core::types::distance_2d;
use skirmish_ai::core::UnitCatalog;
use skirmish_ai::host::{Allegiance, Host};
use skirmish_ai::influence::{InfluenceMap, UnitWeights};
use skirmish_ai::sandbox::{Sandbox, SandboxEvent};

const MAP_SIZE: f32 = 4096.0;
const SIGHT_RADIUS: f32 = 600.0;
const LOS_INTERVAL: u64 = 30;

/// Headless Skirmish Runner - scheduler smoke runs
#[derive(Parser, Debug)]
#[command(name = "skirmish_runner")]
#[command(about = "Run the skirmish AI in a sandbox and output a JSON summary")]
struct Args {
    /// Ticks to simulate (30 ticks per second of game time)
    #[arg(long, default_value_t = 6000)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Flat TOML table of tunables; defaults are used when absent
    #[arg(long)]
    tunables: Option<PathBuf>,

    /// Unit catalog TOML
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Influence weights JSON
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Number of resource sites scattered on the map
    #[arg(long, default_value_t = 6)]
    sites: usize,
}

/// JSON output structure
#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    posture: Posture,
    goals_created: u64,
    live_goals: usize,
    orders_issued: usize,
    friendly_units: usize,
    enemy_units: usize,
    stats: CommanderStats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skirmish_ai=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let tunables: Box<dyn Tunables> = match &args.tunables {
        Some(path) => Box::new(TomlTunables::load(path)?),
        None => Box::new(NoScripting),
    };
    let catalog = match &args.catalog {
        Some(path) => UnitCatalog::load(path)?,
        None => UnitCatalog::default(),
    };
    let weights = match &args.weights {
        Some(path) => UnitWeights::load(path)?,
        None => UnitWeights::default(),
    };

    let sandbox = build_skirmish(&mut rng, args.sites);
    let influence = InfluenceMap::new(MAP_SIZE, MAP_SIZE, 64.0, weights);
    let mut commander =
        Commander::with_seed(sandbox, tunables, catalog, Box::new(influence), seed)?;

    for id in commander.host().units(Allegiance::Friendly) {
        commander.on_actor_created(id);
        commander.on_actor_finished(id);
    }
    tracing::info!(seed, ticks = args.ticks, "skirmish started");

    for _ in 0..args.ticks {
        let events = commander.host_mut().step();
        for event in events {
            dispatch(&mut commander, event);
        }
        if commander.host().current_tick() % LOS_INTERVAL == 0 {
            update_line_of_sight(&mut commander);
        }
        commander.on_tick();
    }

    let host = commander.host();
    let summary = RunSummary {
        seed,
        ticks: host.current_tick(),
        posture: commander.posture(),
        goals_created: commander.registry().created(),
        live_goals: commander.registry().len(),
        orders_issued: host.orders().len(),
        friendly_units: host.units(Allegiance::Friendly).len(),
        enemy_units: host.units(Allegiance::Enemy).len(),
        stats: commander.stats().clone(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// One base and one builder per side, a handful of escorts, resource sites
/// scattered in between
fn build_skirmish(rng: &mut StdRng, sites: usize) -> Sandbox {
    let mut sb = Sandbox::new();

    let home = Vec3::new(300.0, 0.0, 300.0);
    sb.spawn_with(Allegiance::Friendly, "kernel", home, 3000.0, true);
    sb.spawn(Allegiance::Friendly, "assembler", home + Vec3::new(80.0, 0.0, 0.0));
    for n in 0..6 {
        let id = sb.spawn(
            Allegiance::Friendly,
            "bug",
            home + Vec3::new(40.0 * n as f32, 0.0, 120.0),
        );
        sb.arm(id, 2.0);
    }

    let away = Vec3::new(MAP_SIZE - 300.0, 0.0, MAP_SIZE - 300.0);
    sb.spawn_with(Allegiance::Enemy, "hole", away, 3000.0, true);
    for n in 0..8 {
        let id = sb.spawn(
            Allegiance::Enemy,
            "bit",
            away - Vec3::new(40.0 * n as f32, 0.0, 150.0),
        );
        sb.arm(id, 1.5);
    }

    for _ in 0..sites {
        let x = rng.gen_range(400.0..MAP_SIZE - 400.0);
        let z = rng.gen_range(400.0..MAP_SIZE - 400.0);
        sb.add_feature("geovent", Vec3::new(x, 0.0, z));
    }
    sb
}

fn dispatch(commander: &mut Commander<Sandbox>, event: SandboxEvent) {
    match event {
        SandboxEvent::Created(id) => commander.on_actor_created(id),
        SandboxEvent::Finished(id) => commander.on_actor_finished(id),
        SandboxEvent::Idle(id) => commander.on_actor_idle(id),
        SandboxEvent::Damaged {
            victim,
            attacker,
            damage,
        } => commander.on_actor_damaged(victim, Some(attacker), damage),
        SandboxEvent::Destroyed { unit, attacker } => commander.on_actor_destroyed(unit, attacker),
        SandboxEvent::EnemyDestroyed { enemy, attacker } => {
            commander.on_enemy_destroyed(enemy, Some(attacker))
        }
    }
}

/// Enemies near any friendly unit are visible; everything else drops out
fn update_line_of_sight(commander: &mut Commander<Sandbox>) {
    let host = commander.host();
    let friendly: Vec<Vec3> = host
        .units(Allegiance::Friendly)
        .into_iter()
        .filter_map(|id| host.unit(id))
        .map(|u| u.pos)
        .collect();
    let (seen, unseen): (Vec<_>, Vec<_>) = host
        .units(Allegiance::Enemy)
        .into_iter()
        .filter_map(|id| host.unit(id))
        .partition(|e| friendly.iter().any(|f| distance_2d(*f, e.pos) <= SIGHT_RADIUS));

    for enemy in seen {
        commander.on_enemy_enter_los(enemy.id);
    }
    for enemy in unseen {
        if commander.known_enemies().contains(&enemy.id) {
            commander.on_enemy_leave_los(enemy.id);
        }
    }
}
