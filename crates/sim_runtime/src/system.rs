//! Systems: per-tick units of logic over matching entities.
//!
//! A [`System`] declares a [`Signature`], a [`FilterStrategy`] and a
//! periodicity, and implements any of three hooks:
//!
//! 1. `update_before`: once per tick, before the per-entity pass.
//! 2. `update_single`: once per eligible entity, with a mutable view.
//! 3. `update_after`: once per tick, after the per-entity pass.
//!
//! Every hook returns an [`Outcome`]: a demography fragment describing the
//! births and deaths it wants, or an error. Errors are isolated per hook and
//! per entity, so one failure never stops the rest of the tick.
//!
//! The scheduler drives systems through the object-safe [`AnySystem`] trait,
//! implemented by the [`Scheduled`] slot that wraps each system together with
//! its timing state.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use sim_component::{ComponentTypeId, Entity, Raw, Signature};
use tracing::{error, trace};

use crate::database::Database;
use crate::demography::Demography;
use crate::error::ConfigError;
use crate::report::{Phase, SystemFailure};
use crate::strategy::FilterStrategy;

/// The result of a system hook.
pub type Outcome = anyhow::Result<Demography>;

/// The mutable view a system `S` receives per entity.
pub type View<'a, S> = <<S as System>::Signature as Signature>::View<'a>;

/// A scheduled unit of logic.
///
/// Only `Signature` is required; every hook defaults to doing nothing.
///
/// # Examples
///
/// ```rust
/// use sim_component::Component;
/// use sim_runtime::{Demography, Outcome, System, View};
///
/// #[derive(Debug, Clone)]
/// struct Position(f32);
/// impl Component for Position {}
///
/// #[derive(Debug, Clone)]
/// struct Speed(f32);
/// impl Component for Speed {}
///
/// struct Move;
///
/// impl System for Move {
///     type Signature = (Position, Speed);
///
///     fn update_single(&mut self, (position, speed): View<'_, Self>, dt: f64) -> Outcome {
///         position.0 += speed.0 * dt as f32;
///         Ok(Demography::new())
///     }
/// }
/// ```
pub trait System: 'static {
    /// The component types this system reads and writes per entity.
    type Signature: Signature;

    /// Name used in logs and reports. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// How eligible entities are selected.
    fn filter(&self) -> FilterStrategy {
        FilterStrategy::RequiresAll
    }

    /// Minimum wall-clock time between two runs. Zero runs every tick.
    fn periodicity(&self) -> Duration {
        Duration::ZERO
    }

    /// Whole-database work before the per-entity pass.
    fn update_before(&mut self, _db: &mut Database, _dt: f64) -> Outcome {
        Ok(Demography::new())
    }

    /// Per-entity work on a mutable view of the entity's components.
    fn update_single(&mut self, _item: View<'_, Self>, _dt: f64) -> Outcome {
        Ok(Demography::new())
    }

    /// Whole-database work after the per-entity pass.
    fn update_after(&mut self, _db: &mut Database, _dt: f64) -> Outcome {
        Ok(Demography::new())
    }

    /// Called when an entity enters this system's selection: it was born,
    /// or an attach made its view cast.
    fn register(&mut self, _item: View<'_, Self>) {}

    /// Called when an entity leaves this system's selection, while its
    /// components still exist: it is dying, or a detach will stop its view
    /// from casting.
    fn unregister(&mut self, _item: View<'_, Self>) {}

    /// Child systems, for composites.
    fn steps(&self) -> Option<&[Box<dyn AnySystem>]> {
        None
    }

    /// Mutable child systems, for composites.
    fn steps_mut(&mut self) -> Option<&mut Vec<Box<dyn AnySystem>>> {
        None
    }
}

/// `a::b::Foo<c::Bar>` becomes `Foo<c::Bar>`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.find('<').map_or(full, |end| &full[..end]);
    let start = head.rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

/// Object-safe interface the scheduler uses to drive systems.
pub trait AnySystem {
    fn name(&self) -> &str;

    fn filter(&self) -> FilterStrategy;

    /// Effective period between runs.
    fn interval(&self) -> Duration;

    /// Declaration-time checks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the signature is malformed or the filter
    /// strategy needs a signature the system does not declare.
    fn validate(&self) -> Result<(), ConfigError>;

    fn steps(&self) -> Option<&[Box<dyn AnySystem>]>;

    fn steps_mut(&mut self) -> Option<&mut Vec<Box<dyn AnySystem>>>;

    fn is_composite(&self) -> bool {
        self.steps().is_some()
    }

    /// Returns `true` if the system should run at `now`.
    fn is_due(&self, now: Duration) -> bool;

    /// Record that the system ran at `now`.
    fn mark_run(&mut self, now: Duration);

    /// Run all three phases and return the merged demography fragments.
    fn run(
        &mut self,
        db: &mut Database,
        dt: f64,
        failures: &mut Vec<SystemFailure>,
    ) -> Demography;

    /// Run `update_single` over every eligible entity.
    fn update_all(
        &mut self,
        db: &mut Database,
        dt: f64,
        failures: &mut Vec<SystemFailure>,
    ) -> Demography;

    /// Returns `true` if the system would select `entity` and its view would
    /// cast, ignoring any records of the `without` types.
    fn selects(&self, db: &mut Database, entity: Entity, without: &[ComponentTypeId]) -> bool;

    /// Fire `register` for each of `entering` whose view casts.
    fn notify_register(&mut self, db: &mut Database, entering: &BTreeSet<Entity>);

    /// Fire `unregister` for each of `leaving` whose view casts.
    fn notify_unregister(&mut self, db: &mut Database, leaving: &BTreeSet<Entity>);
}

impl fmt::Debug for dyn AnySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name())
            .field("filter", &self.filter())
            .field("interval", &self.interval())
            .finish()
    }
}

/// A system together with its timing state.
pub struct Scheduled<S> {
    system: S,
    interval: Option<Duration>,
    last_run: Option<Duration>,
}

impl<S: System> Scheduled<S> {
    #[must_use]
    pub fn new(system: S) -> Self {
        Self {
            system,
            interval: None,
            last_run: None,
        }
    }

    /// Override the system's periodicity with `seconds`. Negative or
    /// non-finite values run every tick.
    #[must_use]
    pub fn at_interval(mut self, seconds: f64) -> Self {
        self.interval = Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO));
        self
    }

    #[must_use]
    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    /// When the system last ran, if ever.
    #[must_use]
    pub fn last_run(&self) -> Option<Duration> {
        self.last_run
    }

    fn fields() -> Option<Vec<ComponentTypeId>> {
        S::Signature::fields()
    }

    fn isolate(
        &self,
        phase: Phase,
        entity: Option<Entity>,
        outcome: Outcome,
        status: &mut Demography,
        failures: &mut Vec<SystemFailure>,
    ) {
        match outcome {
            Ok(fragment) => {
                status.merge(fragment);
            }
            Err(err) => {
                let system = self.system.name();
                error!(system, %phase, entity = ?entity, error = ?err, "system failed");
                failures.push(SystemFailure {
                    system: system.to_string(),
                    phase,
                    entity,
                    message: format!("{err:#}"),
                });
            }
        }
    }
}

impl<S: System> From<S> for Scheduled<S> {
    fn from(system: S) -> Self {
        Self::new(system)
    }
}

impl<S: System> fmt::Debug for Scheduled<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduled")
            .field("system", &self.system.name())
            .field("interval", &self.interval())
            .field("last_run", &self.last_run)
            .finish()
    }
}

impl<S: System> AnySystem for Scheduled<S> {
    fn name(&self) -> &str {
        self.system.name()
    }

    fn filter(&self) -> FilterStrategy {
        self.system.filter()
    }

    fn interval(&self) -> Duration {
        self.interval.unwrap_or_else(|| self.system.periodicity())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(steps) = self.system.steps() {
            return steps.iter().try_for_each(|step| step.validate());
        }
        S::Signature::validate().map_err(|source| ConfigError::Signature {
            system: self.system.name().to_string(),
            source,
        })?;
        let strategy = self.system.filter();
        if strategy.requires_signature() && Self::fields().is_none() {
            return Err(ConfigError::MissingSignature {
                system: self.system.name().to_string(),
                strategy,
            });
        }
        Ok(())
    }

    fn steps(&self) -> Option<&[Box<dyn AnySystem>]> {
        self.system.steps()
    }

    fn steps_mut(&mut self) -> Option<&mut Vec<Box<dyn AnySystem>>> {
        self.system.steps_mut()
    }

    fn is_due(&self, now: Duration) -> bool {
        let interval = self.interval();
        match self.last_run {
            Some(last) if !interval.is_zero() => now.saturating_sub(last) >= interval,
            _ => true,
        }
    }

    fn mark_run(&mut self, now: Duration) {
        self.last_run = Some(now);
    }

    fn run(
        &mut self,
        db: &mut Database,
        dt: f64,
        failures: &mut Vec<SystemFailure>,
    ) -> Demography {
        let mut status = Demography::new();

        let before = self.system.update_before(db, dt);
        self.isolate(Phase::Before, None, before, &mut status, failures);

        let each = self.update_all(db, dt, failures);
        status.merge(each);

        let after = self.system.update_after(db, dt);
        self.isolate(Phase::After, None, after, &mut status, failures);

        status
    }

    fn update_all(
        &mut self,
        db: &mut Database,
        dt: f64,
        failures: &mut Vec<SystemFailure>,
    ) -> Demography {
        let mut status = Demography::new();

        if let Some(steps) = self.system.steps_mut() {
            for step in steps.iter_mut() {
                status.merge(step.run(db, dt, failures));
            }
            return status;
        }

        let fields = Self::fields();
        let selection = self.system.filter().select(db, fields.as_deref());
        trace!(
            system = self.system.name(),
            entities = selection.entities.len(),
            "dispatching"
        );
        for entity in selection.entities {
            let items = db.active_components_mut(entity, &selection.types);
            let Some(view) = S::Signature::cast_mut(items) else {
                trace!(%entity, "view did not cast, skipping");
                continue;
            };
            let outcome = self.system.update_single(view, dt);
            self.isolate(Phase::Single, Some(entity), outcome, &mut status, failures);
        }
        status
    }

    fn selects(&self, db: &mut Database, entity: Entity, without: &[ComponentTypeId]) -> bool {
        if self.is_composite() {
            return false;
        }
        let strategy = self.system.filter();
        let fields = Self::fields();
        let mut owned = db.component_types_of(entity);
        owned.retain(|ty| !without.contains(ty));
        if !strategy.admits(&owned, fields.as_deref()) {
            return false;
        }
        let types = strategy.view_types(db, fields.as_deref());
        let mut items = db.active_components_mut(entity, &types);
        items.retain(|record| !without.contains(&record.component_type()));
        S::Signature::cast_mut(items).is_some()
    }

    fn notify_register(&mut self, db: &mut Database, entering: &BTreeSet<Entity>) {
        if self.is_composite() {
            return;
        }
        let types = self.system.filter().view_types(db, Self::fields().as_deref());
        for entity in entering {
            let items = db.active_components_mut(*entity, &types);
            if let Some(view) = S::Signature::cast_mut(items) {
                trace!(system = self.system.name(), %entity, "register");
                self.system.register(view);
            }
        }
    }

    fn notify_unregister(&mut self, db: &mut Database, leaving: &BTreeSet<Entity>) {
        if self.is_composite() {
            return;
        }
        let types = self.system.filter().view_types(db, Self::fields().as_deref());
        for entity in leaving {
            let items = db.active_components_mut(*entity, &types);
            if let Some(view) = S::Signature::cast_mut(items) {
                trace!(system = self.system.name(), %entity, "unregister");
                self.system.unregister(view);
            }
        }
    }
}

/// A named, ordered group of systems run as one pipeline step.
///
/// A bag selects nothing itself. The scheduler flattens bags into their
/// leaves, so each child keeps its own filter and periodicity.
#[derive(Debug, Default)]
pub struct SystemBag {
    name: String,
    steps: Vec<Box<dyn AnySystem>>,
}

impl SystemBag {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a system, builder style.
    #[must_use]
    pub fn with<S: System>(self, system: S) -> Self {
        self.with_scheduled(Scheduled::new(system))
    }

    /// Append a system with its own timing, builder style.
    #[must_use]
    pub fn with_scheduled<S: System>(mut self, slot: Scheduled<S>) -> Self {
        self.steps.push(Box::new(slot));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl System for SystemBag {
    type Signature = Raw;

    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self) -> FilterStrategy {
        FilterStrategy::MatchNone
    }

    fn steps(&self) -> Option<&[Box<dyn AnySystem>]> {
        Some(self.steps.as_slice())
    }

    fn steps_mut(&mut self) -> Option<&mut Vec<Box<dyn AnySystem>>> {
        Some(&mut self.steps)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use sim_component::{Bundle, Component, SignatureError};

    use super::*;

    #[derive(Debug, Clone)]
    struct Position {
        x: f32,
    }

    impl Component for Position {}

    #[derive(Debug, Clone)]
    struct Speed {
        x: f32,
    }

    impl Component for Speed {}

    struct Move;

    impl System for Move {
        type Signature = (Position, Speed);

        fn update_single(&mut self, (position, speed): View<'_, Self>, dt: f64) -> Outcome {
            position.x += speed.x * dt as f32;
            Ok(Demography::new())
        }
    }

    struct Slow;

    impl System for Slow {
        type Signature = (Position,);

        fn periodicity(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    struct Untyped;

    impl System for Untyped {
        type Signature = Raw;
    }

    struct Twice;

    impl System for Twice {
        type Signature = (Position, Position);
    }

    struct FailOnFirst;

    impl System for FailOnFirst {
        type Signature = (Position,);

        fn update_single(&mut self, (position,): View<'_, Self>, _dt: f64) -> Outcome {
            if position.entity() == Entity(1) {
                bail!("cannot move {}", position.entity());
            }
            position.x = 10.0;
            Ok(Demography::new())
        }
    }

    fn populated(bundles: Vec<Bundle>) -> Database {
        let mut db = Database::new();
        db.create_all(bundles);
        let pending = db.take_pending();
        db.update_demography(pending);
        db
    }

    #[test]
    fn test_default_name_is_short_type_name() {
        assert_eq!(Move.name(), "Move");
        assert_eq!(SystemBag::new("physics").name(), "physics");
    }

    #[test]
    fn test_short_type_name_keeps_generics() {
        assert_eq!(
            short_type_name::<Scheduled<Move>>(),
            "Scheduled<sim_runtime::system::tests::Move>"
        );
    }

    #[test]
    fn test_first_encounter_is_due() {
        let slot = Scheduled::new(Slow);
        assert!(slot.is_due(Duration::ZERO));
    }

    #[test]
    fn test_periodicity_gates_runs() {
        let mut slot = Scheduled::new(Slow);
        slot.mark_run(Duration::from_millis(100));
        assert!(!slot.is_due(Duration::from_millis(600)));
        assert!(slot.is_due(Duration::from_millis(1100)));
    }

    #[test]
    fn test_at_interval_overrides_periodicity() {
        let mut slot = Scheduled::new(Slow).at_interval(0.25);
        assert_eq!(slot.interval(), Duration::from_millis(250));
        slot.mark_run(Duration::ZERO);
        assert!(slot.is_due(Duration::from_millis(250)));
        assert_eq!(Scheduled::new(Move).at_interval(-1.0).interval(), Duration::ZERO);
    }

    #[test]
    fn test_validate_rejects_missing_signature() {
        let err = Scheduled::new(Untyped).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSignature {
                strategy: FilterStrategy::RequiresAll,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_fields() {
        let err = Scheduled::new(Twice).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Signature {
                source: SignatureError::DuplicateField { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_validate_recurses_into_bags() {
        assert!(Scheduled::new(SystemBag::new("ok").with(Move)).validate().is_ok());
        let bag = SystemBag::new("bad").with(Move).with(Untyped);
        assert!(Scheduled::new(bag).validate().is_err());
    }

    #[test]
    fn test_update_all_mutates_in_place() {
        let mut db = populated(vec![
            Bundle::new().with(Position { x: 0.0 }).with(Speed { x: 2.0 }),
            Bundle::new().with(Position { x: 0.0 }),
        ]);
        let mut slot = Scheduled::new(Move);
        let mut failures = Vec::new();
        let status = slot.update_all(&mut db, 1.0, &mut failures);
        assert!(status.is_empty());
        assert!(failures.is_empty());
        assert_eq!(db.get::<Position>(Entity(1)).unwrap().x, 2.0);
        assert_eq!(db.get::<Position>(Entity(2)).unwrap().x, 0.0);
    }

    #[test]
    fn test_update_all_isolates_entity_failures() {
        let mut db = populated(vec![
            Bundle::new().with(Position { x: 0.0 }),
            Bundle::new().with(Position { x: 0.0 }),
        ]);
        let mut slot = Scheduled::new(FailOnFirst);
        let mut failures = Vec::new();
        slot.run(&mut db, 1.0, &mut failures);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].entity, Some(Entity(1)));
        assert_eq!(failures[0].phase, Phase::Single);
        assert_eq!(failures[0].message, "cannot move Entity(1)");
        assert_eq!(db.get::<Position>(Entity(2)).unwrap().x, 10.0);
    }

    #[test]
    fn test_bag_runs_children_in_order() {
        let mut db = populated(vec![
            Bundle::new().with(Position { x: 0.0 }).with(Speed { x: 1.0 }),
        ]);
        let mut bag = Scheduled::new(SystemBag::new("twice").with(Move).with(Move));
        assert!(bag.is_composite());
        let mut failures = Vec::new();
        bag.run(&mut db, 1.0, &mut failures);
        assert_eq!(db.get::<Position>(Entity(1)).unwrap().x, 2.0);
    }
}
