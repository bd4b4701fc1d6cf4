//! Fixed-step driver for the demo scheduler.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sim_runtime::{Scheduler, TickReport};
use tracing::{info, warn};

/// Environment variable overriding [`DemoConfig::max_ticks`].
const MAX_TICKS_ENV: &str = "SIM_MAX_TICKS";

/// Environment variable overriding [`DemoConfig::tick_rate`].
const TICK_RATE_ENV: &str = "SIM_TICK_RATE";

/// Configuration for the demo loop.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Drones the spawner creates before stopping.
    pub spawn_limit: u32,
    /// Seconds between two spawns.
    pub spawn_interval: f64,
    /// Radius of the arena; drones beyond it are destroyed.
    pub arena_radius: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20.0,
            max_ticks: 60,
            spawn_limit: 5,
            spawn_interval: 0.25,
            arena_radius: 10.0,
        }
    }
}

impl DemoConfig {
    /// Defaults overridden by `SIM_TICK_RATE` and `SIM_MAX_TICKS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse, or the tick
    /// rate is not positive.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(TICK_RATE_ENV) {
            config.tick_rate = raw
                .parse()
                .with_context(|| format!("{TICK_RATE_ENV}={raw} is not a number"))?;
        }
        if let Ok(raw) = std::env::var(MAX_TICKS_ENV) {
            config.max_ticks = raw
                .parse()
                .with_context(|| format!("{MAX_TICKS_ENV}={raw} is not a tick count"))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the tick rate is not a positive number.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick rate must be positive, got {}",
            self.tick_rate
        );
        Ok(())
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }
}

/// Per-run totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub ticks: u64,
    pub born: usize,
    pub died: usize,
    pub failures: usize,
}

impl Summary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.born += report.born.len();
        self.died += report.died.len();
        self.failures += report.failures.len();
    }
}

/// Run `scheduler` at a fixed rate until `max_ticks` is reached.
pub fn run(scheduler: &mut Scheduler, config: &DemoConfig) -> Summary {
    let tick_duration = config.tick_duration();
    let dt = tick_duration.as_secs_f64();
    let mut summary = Summary::default();

    info!(
        tick_rate = config.tick_rate,
        max_ticks = config.max_ticks,
        "starting tick loop"
    );

    loop {
        let start = Instant::now();

        let report = scheduler.tick(dt);
        for failure in &report.failures {
            warn!(tick_id = report.tick_id, %failure, "system failure");
        }
        summary.record(&report);

        if config.max_ticks > 0 && summary.ticks >= config.max_ticks {
            info!(ticks = summary.ticks, "tick loop complete");
            break;
        }

        let elapsed = start.elapsed();
        if elapsed < tick_duration {
            std::thread::sleep(tick_duration - elapsed);
        }
    }
    summary
}
