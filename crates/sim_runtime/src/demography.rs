//! The deferred creation/destruction ledger.
//!
//! A [`Demography`] is a command buffer of structural changes: births
//! (bundles for new entities), deaths (entity ids), and single-component
//! detaches and attaches on live entities. Systems return demography
//! fragments from their hooks; the scheduler merges every fragment of a
//! tick and applies the result once, after all due systems have run. Hosts
//! hand their own batches to [`crate::Scheduler::stage`].
//!
//! Merging is associative: death sets are unioned, every other list is
//! concatenated in order.

use std::collections::BTreeSet;

use sim_component::{Bundle, Component, ComponentTypeId, Entity, Targets};

use crate::database::Database;

/// Batched pending births and deaths.
#[derive(Debug, Clone, Default)]
pub struct Demography {
    births: Vec<Bundle>,
    deaths: BTreeSet<Entity>,
    detaches: Vec<(Entity, ComponentTypeId)>,
    attaches: Vec<(Entity, Bundle)>,
}

/// The structural changes produced by one demography application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Newly live entities, in birth order.
    pub born: Vec<Entity>,
    /// Entities that stopped being alive, in ascending id order for deaths
    /// followed by entities that lost their last component.
    pub died: Vec<Entity>,
}

impl Demography {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger holding one birth per bundle.
    #[must_use]
    pub fn add<B: Into<Bundle>>(bundles: impl IntoIterator<Item = B>) -> Self {
        let mut demography = Self::new();
        for bundle in bundles {
            demography.push_birth(bundle.into());
        }
        demography
    }

    /// A ledger holding the deaths of every entity owning `targets`.
    #[must_use]
    pub fn remove<T: Targets + ?Sized>(targets: &T) -> Self {
        Self::new().with_death(targets)
    }

    /// Add a birth, builder style.
    #[must_use]
    pub fn with_birth(mut self, bundle: impl Into<Bundle>) -> Self {
        self.push_birth(bundle.into());
        self
    }

    /// Add the owners of `targets` to the death set, builder style.
    #[must_use]
    pub fn with_death<T: Targets + ?Sized>(mut self, targets: &T) -> Self {
        targets.collect_entities(&mut self.deaths);
        self
    }

    /// Add raw entity ids to the death set, builder style.
    #[must_use]
    pub fn with_death_ids(mut self, ids: impl IntoIterator<Item = Entity>) -> Self {
        self.deaths.extend(ids.into_iter().filter(|id| id.is_valid()));
        self
    }

    /// Remove the `C` component from `entity`. The entity dies if that was
    /// its last component.
    #[must_use]
    pub fn with_detach<C: Component>(mut self, entity: Entity) -> Self {
        self.detaches.push((entity, C::component_type_id()));
        self
    }

    /// Add components to a live `entity`, replacing records of the same
    /// types. Ignored if the entity is not alive when applied.
    #[must_use]
    pub fn with_attach(mut self, entity: Entity, bundle: impl Into<Bundle>) -> Self {
        self.attaches.push((entity, bundle.into()));
        self
    }

    /// Append a birth in place.
    pub fn push_birth(&mut self, bundle: Bundle) {
        self.births.push(bundle);
    }

    /// Add the owners of `targets` to the death set in place.
    pub fn push_deaths<T: Targets + ?Sized>(&mut self, targets: &T) {
        targets.collect_entities(&mut self.deaths);
    }

    /// Fold `other` into this ledger.
    pub fn merge(&mut self, other: Demography) -> &mut Self {
        self.deaths.extend(other.deaths);
        self.births.extend(other.births);
        self.detaches.extend(other.detaches);
        self.attaches.extend(other.attaches);
        self
    }

    /// Pending birth bundles, in order.
    #[must_use]
    pub fn births(&self) -> &[Bundle] {
        &self.births
    }

    /// Pending deaths.
    #[must_use]
    pub fn deaths(&self) -> &BTreeSet<Entity> {
        &self.deaths
    }

    /// Pending component detaches.
    #[must_use]
    pub fn detaches(&self) -> &[(Entity, ComponentTypeId)] {
        &self.detaches
    }

    /// Pending component attaches.
    #[must_use]
    pub fn attaches(&self) -> &[(Entity, Bundle)] {
        &self.attaches
    }

    /// Returns `true` if applying this ledger would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.births.is_empty()
            && self.deaths.is_empty()
            && self.detaches.is_empty()
            && self.attaches.is_empty()
    }

    /// Drop every pending change.
    pub fn clear(&mut self) {
        self.births.clear();
        self.deaths.clear();
        self.detaches.clear();
        self.attaches.clear();
    }

    /// Apply this ledger to `db`. Only the scheduler does this, once per tick.
    pub(crate) fn apply(self, db: &mut Database) -> Applied {
        db.update_demography(self)
    }

    pub(crate) fn into_parts(self) -> Parts {
        Parts {
            births: self.births,
            deaths: self.deaths,
            detaches: self.detaches,
            attaches: self.attaches,
        }
    }
}

pub(crate) struct Parts {
    pub(crate) births: Vec<Bundle>,
    pub(crate) deaths: BTreeSet<Entity>,
    pub(crate) detaches: Vec<(Entity, ComponentTypeId)>,
    pub(crate) attaches: Vec<(Entity, Bundle)>,
}

impl Extend<Demography> for Demography {
    fn extend<I: IntoIterator<Item = Demography>>(&mut self, iter: I) {
        for other in iter {
            self.merge(other);
        }
    }
}

impl FromIterator<Demography> for Demography {
    fn from_iter<I: IntoIterator<Item = Demography>>(iter: I) -> Self {
        let mut demography = Demography::new();
        demography.extend(iter);
        demography
    }
}
