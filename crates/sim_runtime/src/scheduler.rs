//! The tick loop.
//!
//! A [`Scheduler`] owns the [`Database`], an ordered pipeline of systems and
//! a clock. Each call to [`Scheduler::tick`] runs:
//!
//! 1. Every due system in pipeline order, all three phases. Composite bags
//!    are flattened into their leaves.
//! 2. One demography application merging the host-staged changes and every
//!    fragment the systems returned. `unregister` fires for entities leaving
//!    a system (deaths, detaches) before removal, `register` for entities
//!    entering one (births, attaches) after insertion.
//! 3. The tick counter advances.
//!
//! Structural changes are invisible until step 2, so every system in a tick
//! sees the same set of entities.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use sim_component::{Bundle, ComponentTypeId, Entity, Targets};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::SchedulerConfig;
use crate::database::Database;
use crate::demography::{Applied, Demography};
use crate::error::ConfigError;
use crate::report::TickReport;
use crate::system::{AnySystem, Scheduled, System, SystemBag};

/// The runtime: database, pipeline and clock.
#[derive(Debug)]
pub struct Scheduler {
    /// Completed tick counter.
    tick_id: u64,
    /// Scheduler configuration.
    config: SchedulerConfig,
    /// The component store.
    db: Database,
    /// Pipeline steps, in insertion order.
    systems: Vec<Box<dyn AnySystem>>,
    /// Time source for periodicity.
    clock: Box<dyn Clock>,
}

impl Scheduler {
    /// Create a scheduler with an empty database and pipeline.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        info!(name = %config.name, budget = ?config.tick_budget, "scheduler created");
        Self {
            tick_id: 0,
            config,
            db: Database::new(),
            systems: Vec::new(),
            clock: Box::new(MonotonicClock::new()),
        }
    }

    /// Replace the time source, builder style.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Append a system to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the system declaration is invalid; the
    /// pipeline is left unchanged.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<&mut Self, ConfigError> {
        self.add_scheduled(Scheduled::new(system))
    }

    /// Append a system with its own timing to the pipeline.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::add_system`].
    pub fn add_scheduled<S: System>(
        &mut self,
        slot: Scheduled<S>,
    ) -> Result<&mut Self, ConfigError> {
        slot.validate()?;
        info!(
            system = slot.name(),
            filter = ?slot.filter(),
            interval = ?slot.interval(),
            "system added"
        );
        self.systems.push(Box::new(slot));
        Ok(self)
    }

    /// Append a composite bag to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] among the bag's children.
    pub fn add_bag(&mut self, bag: SystemBag) -> Result<&mut Self, ConfigError> {
        self.add_system(bag)
    }

    /// Stage entity creation. See [`Database::create_all`].
    pub fn create_all<B: Into<Bundle>>(
        &mut self,
        bundles: impl IntoIterator<Item = B>,
    ) -> Vec<Entity> {
        self.db.create_all(bundles)
    }

    /// Stage entity destruction. See [`Database::destroy_all`].
    pub fn destroy_all<T: Targets + ?Sized>(&mut self, targets: &T) {
        self.db.destroy_all(targets);
    }

    /// Stage a batch for the end of the next tick. See [`Database::stage`].
    pub fn stage(&mut self, batch: Demography) {
        self.db.stage(batch);
    }

    /// Returns the number of completed ticks.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    /// Names of the flattened pipeline, in run order.
    #[must_use]
    pub fn system_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(&self.systems, &mut names);
        names
    }

    /// Run one tick with time step `dt`.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let start = Instant::now();
        let tick_id = self.tick_id + 1;
        let mut report = TickReport::new(tick_id);

        let mut leaves = Vec::new();
        collect_leaves(&mut self.systems, &mut leaves);
        debug!(tick_id, dt, systems = leaves.len(), "tick start");

        let mut batch = Demography::new();
        for system in &mut leaves {
            let now = self.clock.now();
            if !system.is_due(now) {
                trace!(system = system.name(), "not due, skipping");
                report.skipped.push(system.name().to_string());
                continue;
            }
            system.mark_run(now);
            let status = system.run(&mut self.db, dt, &mut report.failures);
            batch.merge(status);
            report.ran.push(system.name().to_string());
        }

        // Host-staged changes go first so their births keep creation order.
        let mut pending = self.db.take_pending();
        pending.merge(batch);
        let applied = apply(&mut self.db, &mut leaves, pending);
        report.born = applied.born;
        report.died = applied.died;

        self.tick_id = tick_id;

        let elapsed = start.elapsed();
        if let Some(budget) = self.config.tick_budget.filter(|budget| elapsed > *budget) {
            warn!(
                tick_id,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "tick exceeded time budget"
            );
        }
        debug!(
            tick_id,
            ran = report.ran.len(),
            failures = report.failures.len(),
            born = report.born.len(),
            died = report.died.len(),
            "tick complete"
        );
        report
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Apply `batch`, firing lifecycle hooks around it.
///
/// An entity leaves a system when it dies or when its detaches stop the
/// system from selecting it; `unregister` fires for those while their
/// components still exist. An entity enters a system when it is born or
/// when an attach makes it selectable; `register` fires for those after
/// insertion.
fn apply(
    db: &mut Database,
    leaves: &mut [&mut Box<dyn AnySystem>],
    batch: Demography,
) -> Applied {
    let dying: BTreeSet<Entity> = batch
        .deaths()
        .iter()
        .copied()
        .filter(|entity| db.is_alive(*entity))
        .collect();
    let mut detached: BTreeMap<Entity, Vec<ComponentTypeId>> = BTreeMap::new();
    for (entity, ty) in batch.detaches() {
        if db.is_alive(*entity) && !dying.contains(entity) {
            detached.entry(*entity).or_default().push(*ty);
        }
    }
    let attached: BTreeSet<Entity> = batch
        .attaches()
        .iter()
        .map(|(entity, _)| *entity)
        .filter(|entity| db.is_alive(*entity) && !dying.contains(entity))
        .collect();

    // Attach targets each system does not hold once the leavers are gone.
    let mut outsiders = Vec::with_capacity(leaves.len());
    for system in leaves.iter_mut() {
        let mut leaving: BTreeSet<Entity> = dying
            .iter()
            .copied()
            .filter(|entity| system.selects(db, *entity, &[]))
            .collect();
        for (entity, types) in &detached {
            if system.selects(db, *entity, &[]) && !system.selects(db, *entity, types) {
                leaving.insert(*entity);
            }
        }
        let outside: BTreeSet<Entity> = attached
            .iter()
            .copied()
            .filter(|entity| leaving.contains(entity) || !system.selects(db, *entity, &[]))
            .collect();
        if !leaving.is_empty() {
            system.notify_unregister(db, &leaving);
        }
        outsiders.push(outside);
    }

    let applied = batch.apply(db);

    for (system, mut entering) in leaves.iter_mut().zip(outsiders) {
        entering.extend(applied.born.iter().copied());
        entering.retain(|entity| system.selects(db, *entity, &[]));
        if !entering.is_empty() {
            system.notify_register(db, &entering);
        }
    }
    applied
}

fn collect_leaves<'a>(
    systems: &'a mut [Box<dyn AnySystem>],
    out: &mut Vec<&'a mut Box<dyn AnySystem>>,
) {
    for system in systems {
        if system.is_composite() {
            if let Some(children) = system.steps_mut() {
                collect_leaves(children, out);
            }
        } else {
            out.push(system);
        }
    }
}

fn collect_names(systems: &[Box<dyn AnySystem>], out: &mut Vec<String>) {
    for system in systems {
        match system.steps() {
            Some(children) => collect_names(children, out),
            None => out.push(system.name().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sim_component::{Component, Raw};

    use super::*;
    use crate::clock::ManualClock;
    use crate::system::{Outcome, View};

    #[derive(Debug, Clone)]
    struct Counter {
        hits: u32,
    }

    impl Component for Counter {}

    struct Count;

    impl System for Count {
        type Signature = (Counter,);

        fn update_single(&mut self, (counter,): View<'_, Self>, _dt: f64) -> Outcome {
            counter.hits += 1;
            Ok(Demography::new())
        }
    }

    struct Untyped;

    impl System for Untyped {
        type Signature = Raw;
    }

    fn counter() -> Bundle {
        Bundle::new().with(Counter { hits: 0 })
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut scheduler = Scheduler::default();
        assert_eq!(scheduler.tick_id(), 0);
        let report = scheduler.tick(0.1);
        assert_eq!(report.tick_id, 1);
        assert_eq!(scheduler.tick_id(), 1);
    }

    #[test]
    fn test_created_entities_appear_after_tick() {
        let mut scheduler = Scheduler::default();
        scheduler.add_system(Count).unwrap();
        let ids = scheduler.create_all([counter()]);
        let report = scheduler.tick(0.1);
        assert_eq!(report.born, ids);
        // Not visible to systems during the tick it was created in.
        assert_eq!(scheduler.database().get::<Counter>(ids[0]).unwrap().hits, 0);
        scheduler.tick(0.1);
        assert_eq!(scheduler.database().get::<Counter>(ids[0]).unwrap().hits, 1);
    }

    #[test]
    fn test_invalid_system_is_rejected() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.add_system(Untyped).is_err());
        assert!(scheduler.system_names().is_empty());
    }

    #[test]
    fn test_bags_are_flattened() {
        let mut scheduler = Scheduler::default();
        scheduler
            .add_bag(
                SystemBag::new("outer")
                    .with(Count)
                    .with(SystemBag::new("inner").with(Count)),
            )
            .unwrap();
        assert_eq!(scheduler.system_names(), vec!["Count", "Count"]);
        let ids = scheduler.create_all([counter()]);
        scheduler.tick(0.1);
        let report = scheduler.tick(0.1);
        assert_eq!(report.ran, vec!["Count", "Count"]);
        assert_eq!(scheduler.database().get::<Counter>(ids[0]).unwrap().hits, 2);
    }

    #[test]
    fn test_periodic_system_skips_until_due() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::default().with_clock(clock.clone());
        scheduler
            .add_scheduled(Scheduled::new(Count).at_interval(1.0))
            .unwrap();

        assert_eq!(scheduler.tick(0.1).ran, vec!["Count"]);
        clock.advance(Duration::from_millis(500));
        assert_eq!(scheduler.tick(0.1).skipped, vec!["Count"]);
        clock.advance(Duration::from_millis(500));
        assert_eq!(scheduler.tick(0.1).ran, vec!["Count"]);
    }
}
