//! # sim_demo
//!
//! Host application for the simulation ECS. Builds a scheduler with a small
//! drone pipeline, runs it at a fixed rate and prints the final world as
//! JSON.
//!
//! Configure with `RUST_LOG`, `SIM_TICK_RATE` and `SIM_MAX_TICKS`.

mod driver;
mod snapshot;
mod systems;

use anyhow::Result;
use components::{Info, Position, Speed};
use sim_component::Bundle;
use sim_runtime::{Scheduled, Scheduler, SchedulerConfig, SystemBag};
use tracing::info;
use tracing_subscriber::EnvFilter;

use driver::DemoConfig;
use snapshot::Snapshot;
use systems::{Bounds, Census, Move, Spawner};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sim_demo=info".parse()?))
        .init();

    let config = DemoConfig::from_env()?;
    info!(?config, "sim demo starting");

    let mut scheduler = Scheduler::new(
        SchedulerConfig::default()
            .with_name("demo")
            .with_tick_budget(config.tick_duration()),
    );
    let spawner =
        Scheduled::new(Spawner::new(config.spawn_limit)).at_interval(config.spawn_interval);
    let physics = SystemBag::new("physics")
        .with(Move)
        .with(Bounds::new(config.arena_radius));
    scheduler
        .add_scheduled(spawner)?
        .add_bag(physics)?
        .add_system(Census)?;
    info!(systems = ?scheduler.system_names(), "pipeline ready");

    scheduler.create_all([
        Bundle::new().with(Position::default()).with(Info::new("beacon")),
        Bundle::new()
            .with(Position::new(-2.0, 0.0, 0.0))
            .with(Speed::new(0.5, 0.0, 0.0))
            .with(Info::new("scout")),
    ]);

    let summary = driver::run(&mut scheduler, &config);
    info!(?summary, alive = scheduler.database().entity_count(), "sim demo finished");

    println!("{}", serde_json::to_string_pretty(&Snapshot::capture(&scheduler))?);
    Ok(())
}
