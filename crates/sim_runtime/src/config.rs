//! Scheduler configuration.

use std::time::Duration;

/// Configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Name used in log output.
    pub name: String,
    /// Wall-clock budget for one tick. Ticks running longer log a warning.
    pub tick_budget: Option<Duration>,
}

impl SchedulerConfig {
    /// Set the name, builder style.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the tick budget, builder style.
    #[must_use]
    pub fn with_tick_budget(mut self, budget: Duration) -> Self {
        self.tick_budget = Some(budget);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "sim".to_string(),
            tick_budget: None,
        }
    }
}
