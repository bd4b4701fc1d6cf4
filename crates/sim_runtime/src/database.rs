//! Entity and component storage for the scheduler.
//!
//! The [`Database`] owns the entity allocator, the registry of per-type
//! tables and the set of live entities. It is the single source of truth for
//! component data.
//!
//! Host-side [`Database::create_all`] and [`Database::destroy_all`] calls are
//! *staged*: they only record intent in a pending [`Demography`], which the
//! scheduler applies at the end of the next tick. Tables change shape only
//! when the scheduler applies a batch.

use std::collections::{BTreeSet, HashMap};
use std::mem;

use sim_component::{
    AnyRecord, AnyTable, Bundle, Component, ComponentTypeId, Entity, EntityAllocator, Record,
    Table, Targets,
};
use tracing::{debug, warn};

use crate::demography::{Applied, Demography};

/// The canonical component store.
#[derive(Debug)]
pub struct Database {
    /// Entity ID allocator.
    allocator: EntityAllocator,
    /// One table per component type, created on first use.
    tables: HashMap<ComponentTypeId, Box<dyn AnyTable>>,
    /// Entities that currently own at least one component.
    entities: BTreeSet<Entity>,
    /// Ids handed out by `create_all` whose births are not applied yet.
    reserved: BTreeSet<Entity>,
    /// Host-staged changes awaiting the next tick.
    pending: Demography,
}

impl Database {
    /// Create a new empty database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            tables: HashMap::new(),
            entities: BTreeSet::new(),
            reserved: BTreeSet::new(),
            pending: Demography::new(),
        }
    }

    /// Stage the creation of one entity per bundle.
    ///
    /// Ids are allocated now and returned in input order, but the entities
    /// only become visible to queries after the next demography application.
    /// An empty bundle still consumes an id and never becomes alive.
    pub fn create_all<B: Into<Bundle>>(
        &mut self,
        bundles: impl IntoIterator<Item = B>,
    ) -> Vec<Entity> {
        let mut ids = Vec::new();
        for bundle in bundles {
            let mut bundle = bundle.into();
            let entity = self.allocator.allocate();
            bundle.stamp(entity);
            self.reserved.insert(entity);
            debug!(%entity, components = bundle.len(), "staged entity creation");
            self.pending.push_birth(bundle);
            ids.push(entity);
        }
        ids
    }

    /// Stage the destruction of every entity owning `targets`.
    pub fn destroy_all<T: Targets + ?Sized>(&mut self, targets: &T) {
        self.pending.push_deaths(targets);
    }

    /// Stage an arbitrary batch (attaches, detaches, ...) for the next tick.
    pub fn stage(&mut self, batch: Demography) {
        self.pending.merge(batch);
    }

    /// Host-staged changes not yet applied.
    #[must_use]
    pub fn pending(&self) -> &Demography {
        &self.pending
    }

    /// Remove and return the host-staged changes.
    pub fn take_pending(&mut self) -> Demography {
        mem::take(&mut self.pending)
    }

    /// Apply a demography: deaths first, then detaches, attaches and births.
    ///
    /// A birth keeps its id only if `create_all` reserved it; every other
    /// birth gets a fresh one here. Tables are created lazily for component
    /// types seen for the first time.
    pub(crate) fn update_demography(&mut self, batch: Demography) -> Applied {
        let parts = batch.into_parts();
        let mut applied = Applied::default();

        if !parts.deaths.is_empty() {
            for table in self.tables.values_mut() {
                table.destroy_all(&parts.deaths);
            }
            for entity in &parts.deaths {
                if self.entities.remove(entity) {
                    applied.died.push(*entity);
                }
            }
        }

        for (entity, ty) in parts.detaches {
            if let Some(table) = self.tables.get_mut(&ty) {
                table.destroy(entity);
            }
            if self.entities.contains(&entity) && !self.owns_any(entity) {
                self.entities.remove(&entity);
                applied.died.push(entity);
            }
        }

        for (entity, mut bundle) in parts.attaches {
            if !self.entities.contains(&entity) {
                warn!(%entity, "attach to an entity that is not alive, ignoring");
                continue;
            }
            bundle.stamp(entity);
            self.insert_bundle(bundle);
        }

        for mut bundle in parts.births {
            let reserved = self.reserved.remove(&bundle.entity());
            if bundle.is_empty() {
                continue;
            }
            let entity = if reserved {
                bundle.entity()
            } else {
                let entity = self.allocator.allocate();
                if bundle.entity().is_valid() {
                    warn!(
                        stale = %bundle.entity(),
                        %entity,
                        "birth carries an unreserved id, reallocating"
                    );
                }
                bundle.stamp(entity);
                entity
            };
            self.insert_bundle(bundle);
            self.entities.insert(entity);
            applied.born.push(entity);
        }

        debug!(
            born = applied.born.len(),
            died = applied.died.len(),
            alive = self.entities.len(),
            "applied demography"
        );
        applied
    }

    fn insert_bundle(&mut self, bundle: Bundle) {
        for record in bundle.into_records() {
            let ty = record.component_type();
            let table = self
                .tables
                .entry(ty)
                .or_insert_with(|| record.empty_table());
            if let Err(err) = table.insert(record) {
                warn!(%err, "dropping component record");
            }
        }
    }

    fn owns_any(&self, entity: Entity) -> bool {
        self.tables.values().any(|table| table.contains(entity))
    }

    /// The typed table for `T`, if any record of `T` was ever stored.
    #[must_use]
    pub fn table<T: Component>(&self) -> Option<&Table<T>> {
        self.tables
            .get(&T::component_type_id())?
            .as_any()
            .downcast_ref::<Table<T>>()
    }

    /// Mutable access to the typed table for `T`.
    ///
    /// Mutating component values is fine; adding or removing records here
    /// bypasses the live-entity bookkeeping.
    #[must_use]
    pub fn table_mut<T: Component>(&mut self) -> Option<&mut Table<T>> {
        self.tables
            .get_mut(&T::component_type_id())?
            .as_any_mut()
            .downcast_mut::<Table<T>>()
    }

    /// The `T` record owned by `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&Record<T>> {
        self.table::<T>()?.read(entity)
    }

    /// The `T` record owned by `entity`, for in-place mutation.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut Record<T>> {
        self.table_mut::<T>()?.read_mut(entity)
    }

    /// Live entities, in ascending id order.
    #[must_use]
    pub fn entities(&self) -> &BTreeSet<Entity> {
        &self.entities
    }

    /// Returns `true` if `entity` currently owns at least one component.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Component types `entity` owns a record of, active or not.
    #[must_use]
    pub fn component_types_of(&self, entity: Entity) -> Vec<ComponentTypeId> {
        let mut types: Vec<ComponentTypeId> = self
            .tables
            .iter()
            .filter(|(_, table)| table.contains(entity))
            .map(|(ty, _)| *ty)
            .collect();
        types.sort();
        types
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Every registered component type, in ascending id order.
    #[must_use]
    pub fn component_types(&self) -> Vec<ComponentTypeId> {
        let mut types: Vec<ComponentTypeId> = self.tables.keys().copied().collect();
        types.sort();
        types
    }

    /// Entities owning at least one of `types`.
    #[must_use]
    pub fn union_entities(&self, types: &[ComponentTypeId]) -> BTreeSet<Entity> {
        types
            .iter()
            .filter_map(|ty| self.tables.get(ty))
            .flat_map(|table| table.entities())
            .collect()
    }

    /// Entities owning every one of `types`. Empty when `types` is empty or
    /// any type has no table yet.
    #[must_use]
    pub fn intersect_entities(&self, types: &[ComponentTypeId]) -> BTreeSet<Entity> {
        let mut sets = Vec::with_capacity(types.len());
        for ty in types {
            let Some(table) = self.tables.get(ty) else {
                return BTreeSet::new();
            };
            sets.push(table.entities());
        }
        // Start from the smallest owner set.
        sets.sort_by_key(BTreeSet::len);
        let mut sets = sets.into_iter();
        let Some(mut result) = sets.next() else {
            return BTreeSet::new();
        };
        for set in sets {
            result.retain(|entity| set.contains(entity));
        }
        result
    }

    /// Entities owning a record in any table.
    #[must_use]
    pub fn all_entities(&self) -> BTreeSet<Entity> {
        self.tables
            .values()
            .flat_map(|table| table.entities())
            .collect()
    }

    /// A `T` record whose owner also owns every type in `having`, picking the
    /// lowest entity id. Useful for singleton-like components.
    #[must_use]
    pub fn find_any<T: Component>(&self, having: &[ComponentTypeId]) -> Option<&Record<T>> {
        let table = self.table::<T>()?;
        if having.is_empty() {
            return table.read_any();
        }
        let mut types = having.to_vec();
        types.push(T::component_type_id());
        let entity = self.intersect_entities(&types).into_iter().next()?;
        table.read(entity)
    }

    /// Erased records of `types` owned by `entity`, in the order of `types`.
    #[must_use]
    pub fn components_of(&self, entity: Entity, types: &[ComponentTypeId]) -> Vec<&dyn AnyRecord> {
        types
            .iter()
            .filter_map(|ty| self.tables.get(ty)?.get(entity))
            .collect()
    }

    /// Mutable erased records of `types` owned by `entity`, in the order of
    /// `types`. Inactive records are left out.
    pub fn active_components_mut(
        &mut self,
        entity: Entity,
        types: &[ComponentTypeId],
    ) -> Vec<&mut dyn AnyRecord> {
        let mut found: Vec<(usize, &mut dyn AnyRecord)> = self
            .tables
            .iter_mut()
            .filter_map(|(ty, table)| {
                let slot = types.iter().position(|t| t == ty)?;
                let record = table.get_mut(entity)?;
                record.is_active().then_some((slot, record))
            })
            .collect();
        found.sort_by_key(|(slot, _)| *slot);
        found.into_iter().map(|(_, record)| record).collect()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
