//! Per-tick outcome reporting.

use std::fmt;

use sim_component::Entity;

/// The system hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    Single,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "update_before",
            Self::Single => "update_single",
            Self::After => "update_after",
        };
        f.write_str(name)
    }
}

/// One isolated system failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFailure {
    /// Name of the failing system.
    pub system: String,
    /// The hook that returned the error.
    pub phase: Phase,
    /// The entity being updated, for per-entity failures.
    pub entity: Option<Entity>,
    /// The error with its context chain.
    pub message: String,
}

impl fmt::Display for SystemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed in {}", self.system, self.phase)?;
        if let Some(entity) = self.entity {
            write!(f, " on {entity}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick counter after this tick.
    pub tick_id: u64,
    /// Systems that were due and ran, in pipeline order.
    pub ran: Vec<String>,
    /// Systems skipped because their period had not elapsed.
    pub skipped: Vec<String>,
    /// Failures isolated during the tick.
    pub failures: Vec<SystemFailure>,
    /// Entities that became alive at the end of the tick.
    pub born: Vec<Entity>,
    /// Entities that stopped being alive at the end of the tick.
    pub died: Vec<Entity>,
}

impl TickReport {
    #[must_use]
    pub fn new(tick_id: u64) -> Self {
        Self {
            tick_id,
            ..Self::default()
        }
    }

    /// Returns `true` if no system failed during the tick.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
