//! Per-component-type storage.
//!
//! A [`Table`] maps each owning [`Entity`] to the single [`Record`] of one
//! component type that entity owns. The set of keys is the table's *owner
//! set*, which query strategies intersect and union.
//!
//! The database keeps tables behind the object-safe [`AnyTable`] trait so a
//! registry keyed by [`ComponentTypeId`] can hold every type at once.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};

use crate::component::{AnyRecord, Component, ComponentTypeId, Record};
use crate::entity::Entity;
use crate::error::StorageError;

/// Storage for every record of a single component type.
#[derive(Debug, Clone)]
pub struct Table<T> {
    by_entity: HashMap<Entity, Record<T>>,
}

impl<T: Component> Table<T> {
    /// Create a new, empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_entity: HashMap::new(),
        }
    }

    /// Insert a record under its entity id, replacing any previous record
    /// for that entity. Returns the replaced record.
    pub fn create(&mut self, record: Record<T>) -> Option<Record<T>> {
        self.by_entity.insert(record.entity(), record)
    }

    /// Returns the record owned by `entity`, if any.
    #[must_use]
    pub fn read(&self, entity: Entity) -> Option<&Record<T>> {
        self.by_entity.get(&entity)
    }

    /// Returns the record owned by `entity` for in-place mutation.
    #[must_use]
    pub fn read_mut(&mut self, entity: Entity) -> Option<&mut Record<T>> {
        self.by_entity.get_mut(&entity)
    }

    /// Returns the record with the lowest entity id, if the table is not empty.
    #[must_use]
    pub fn read_any(&self) -> Option<&Record<T>> {
        self.by_entity
            .iter()
            .min_by_key(|(entity, _)| **entity)
            .map(|(_, record)| record)
    }

    /// Remove the record owned by `entity`. No-op if absent.
    pub fn destroy(&mut self, entity: Entity) -> Option<Record<T>> {
        self.by_entity.remove(&entity)
    }

    /// Remove the records owned by every entity in `entities`.
    pub fn destroy_all<'a>(&mut self, entities: impl IntoIterator<Item = &'a Entity>) {
        for entity in entities {
            self.by_entity.remove(entity);
        }
    }

    /// Snapshot copies of the stored records, ordered by entity id.
    ///
    /// With `Some(entities)` only those ids are materialised, in the given
    /// order; ids the table does not contain are skipped.
    #[must_use]
    pub fn list_all(&self, entities: Option<&[Entity]>) -> Vec<Record<T>> {
        match entities {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.by_entity.get(id))
                .cloned()
                .collect(),
            None => {
                let mut records: Vec<Record<T>> = self.by_entity.values().cloned().collect();
                records.sort_by_key(Record::entity);
                records
            }
        }
    }

    /// The owner set of this table.
    #[must_use]
    pub fn entities(&self) -> BTreeSet<Entity> {
        self.by_entity.keys().copied().collect()
    }

    /// Returns `true` if `entity` owns a record in this table.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.by_entity.contains_key(&entity)
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    /// Returns `true` if the table stores no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}

impl<T: Component> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe interface over a [`Table`] of any component type.
pub trait AnyTable: Any + std::fmt::Debug {
    /// The component type stored in this table.
    fn component_type(&self) -> ComponentTypeId;

    /// Human-readable name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// The owner set of this table.
    fn entities(&self) -> BTreeSet<Entity>;

    fn contains(&self, entity: Entity) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Erased read access to the record owned by `entity`.
    fn get(&self, entity: Entity) -> Option<&dyn AnyRecord>;

    /// Erased write access to the record owned by `entity`.
    fn get_mut(&mut self, entity: Entity) -> Option<&mut dyn AnyRecord>;

    /// Insert an erased record under its entity id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TypeMismatch`] if the record does not hold
    /// this table's component type.
    fn insert(&mut self, record: Box<dyn AnyRecord>) -> Result<(), StorageError>;

    /// Remove the record owned by `entity`. Returns `true` if one existed.
    fn destroy(&mut self, entity: Entity) -> bool;

    /// Remove the records owned by every entity in `entities`.
    fn destroy_all(&mut self, entities: &BTreeSet<Entity>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyTable for Table<T> {
    fn component_type(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn entities(&self) -> BTreeSet<Entity> {
        Table::entities(self)
    }

    fn contains(&self, entity: Entity) -> bool {
        Table::contains(self, entity)
    }

    fn len(&self) -> usize {
        Table::len(self)
    }

    fn get(&self, entity: Entity) -> Option<&dyn AnyRecord> {
        self.by_entity
            .get(&entity)
            .map(|record| record as &dyn AnyRecord)
    }

    fn get_mut(&mut self, entity: Entity) -> Option<&mut dyn AnyRecord> {
        self.by_entity
            .get_mut(&entity)
            .map(|record| record as &mut dyn AnyRecord)
    }

    fn insert(&mut self, record: Box<dyn AnyRecord>) -> Result<(), StorageError> {
        let found = record.type_name();
        match record.into_any().downcast::<Record<T>>() {
            Ok(record) => {
                self.create(*record);
                Ok(())
            }
            Err(_) => Err(StorageError::TypeMismatch {
                expected: T::type_name(),
                found,
            }),
        }
    }

    fn destroy(&mut self, entity: Entity) -> bool {
        Table::destroy(self, entity).is_some()
    }

    fn destroy_all(&mut self, entities: &BTreeSet<Entity>) {
        Table::destroy_all(self, entities);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
    }

    impl Component for Position {}

    #[derive(Debug, Clone)]
    struct Speed {
        x: f32,
    }

    impl Component for Speed {}

    fn stamped(x: f32, entity: u64) -> Record<Position> {
        let mut record = Record::new(Position { x });
        record.stamp(Entity(entity));
        record
    }

    #[test]
    fn test_create_and_read() {
        let mut table = Table::new();
        table.create(stamped(3.0, 1));
        assert_eq!(table.read(Entity(1)).unwrap().x, 3.0);
        assert!(table.read(Entity(2)).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_create_overwrites_same_entity() {
        let mut table = Table::new();
        table.create(stamped(3.0, 1));
        let replaced = table.create(stamped(4.0, 1));
        assert_eq!(replaced.unwrap().x, 3.0);
        assert_eq!(table.read(Entity(1)).unwrap().x, 4.0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_destroy_is_noop_when_absent() {
        let mut table: Table<Position> = Table::new();
        assert!(table.destroy(Entity(9)).is_none());
        table.create(stamped(1.0, 1));
        table.create(stamped(2.0, 2));
        table.destroy_all(&[Entity(1), Entity(5)]);
        assert_eq!(table.entities(), BTreeSet::from([Entity(2)]));
    }

    #[test]
    fn test_list_all_is_a_snapshot() {
        let mut table = Table::new();
        table.create(stamped(2.0, 2));
        table.create(stamped(1.0, 1));
        let snapshot = table.list_all(None);
        table.read_mut(Entity(1)).unwrap().x = 100.0;
        assert_eq!(
            snapshot.iter().map(|r| r.x).collect::<Vec<_>>(),
            vec![1.0, 2.0]
        );
    }

    #[test]
    fn test_list_all_subset_skips_missing() {
        let mut table = Table::new();
        table.create(stamped(1.0, 1));
        table.create(stamped(2.0, 2));
        let subset = table.list_all(Some(&[Entity(2), Entity(3)]));
        assert_eq!(subset.len(), 1);
        assert_eq!(subset[0].entity(), Entity(2));
    }

    #[test]
    fn test_read_any_picks_lowest_entity() {
        let mut table = Table::new();
        assert!(table.read_any().is_none());
        table.create(stamped(5.0, 5));
        table.create(stamped(2.0, 2));
        assert_eq!(table.read_any().unwrap().entity(), Entity(2));
    }

    #[test]
    fn test_erased_insert_keys_by_record_entity() {
        let mut table: Box<dyn AnyTable> = Box::new(Table::<Position>::new());
        let record: Box<dyn AnyRecord> = Box::new(stamped(1.0, 4));
        table.insert(record).unwrap();
        let stored = table.get(Entity(4)).unwrap();
        assert_eq!(stored.entity(), Entity(4));
        assert_eq!(table.component_type(), Position::component_type_id());
    }

    #[test]
    fn test_erased_insert_rejects_wrong_type() {
        let mut table: Box<dyn AnyTable> = Box::new(Table::<Position>::new());
        let record: Box<dyn AnyRecord> = Box::new(Record::new(Speed { x: 1.0 }));
        let err = table.insert(record).unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_erased_destroy_all() {
        let mut table: Box<dyn AnyTable> = Box::new(Table::<Position>::new());
        table.insert(Box::new(stamped(1.0, 1))).unwrap();
        table.insert(Box::new(stamped(2.0, 2))).unwrap();
        table.destroy_all(&BTreeSet::from([Entity(1)]));
        assert!(!table.contains(Entity(1)));
        assert!(table.destroy(Entity(2)));
        assert!(!table.destroy(Entity(2)));
    }
}
