//! Birth bundles: the components destined for one new entity.

use tracing::warn;

use crate::component::{AnyRecord, Component, ComponentTypeId, Record};
use crate::entity::Entity;
use crate::signature::Signature;

/// An ordered list of component records that will share one entity id.
///
/// A bundle holds at most one record per component type: the first record
/// of a type wins and later duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    records: Vec<Box<dyn AnyRecord>>,
}

impl Bundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component value, builder style.
    #[must_use]
    pub fn with<T: Component>(self, value: T) -> Self {
        self.with_record(Record::new(value))
    }

    /// Add an existing record (for example an inactive one), builder style.
    #[must_use]
    pub fn with_record<T: Component>(mut self, record: Record<T>) -> Self {
        self.push(Box::new(record));
        self
    }

    /// Flatten a filled signature instance into a bundle.
    #[must_use]
    pub fn from_instance<S: Signature>(instance: S::Instance) -> Self {
        Self::from_records(S::to_components(instance))
    }

    /// Build a bundle from erased records, applying the duplicate policy.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = Box<dyn AnyRecord>>) -> Self {
        let mut bundle = Self::new();
        for record in records {
            bundle.push(record);
        }
        bundle
    }

    /// Append an erased record. A record whose component type is already
    /// present is dropped.
    pub fn push(&mut self, record: Box<dyn AnyRecord>) {
        let ty = record.component_type();
        if self.contains_type(ty) {
            warn!(
                component = record.type_name(),
                "duplicate component type in bundle, keeping the first"
            );
            return;
        }
        // A bundle always shares a single entity id.
        let mut record = record;
        record.stamp(self.entity());
        self.records.push(record);
    }

    /// Returns `true` if the bundle already holds a record of type `ty`.
    #[must_use]
    pub fn contains_type(&self, ty: ComponentTypeId) -> bool {
        self.records.iter().any(|r| r.component_type() == ty)
    }

    /// The entity id stamped on this bundle, or [`Entity::INVALID`].
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.records
            .first()
            .map_or(Entity::INVALID, |record| record.entity())
    }

    /// Stamp `entity` onto every record of the bundle.
    pub fn stamp(&mut self, entity: Entity) {
        for record in &mut self.records {
            record.stamp(entity);
        }
    }

    /// The component types in bundle order.
    #[must_use]
    pub fn component_types(&self) -> Vec<ComponentTypeId> {
        self.records.iter().map(|r| r.component_type()).collect()
    }

    /// Iterate the records of the bundle.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyRecord> {
        self.records.iter().map(|r| &**r)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the bundle holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the bundle, yielding its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Box<dyn AnyRecord>> {
        self.records
    }
}

impl<T: Component> From<Record<T>> for Bundle {
    fn from(record: Record<T>) -> Self {
        Bundle::new().with_record(record)
    }
}

impl From<Vec<Box<dyn AnyRecord>>> for Bundle {
    fn from(records: Vec<Box<dyn AnyRecord>>) -> Self {
        Bundle::from_records(records)
    }
}

#[cfg(test)]
mod tests {
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

    #[test]
    fn test_builder_keeps_order() {
        let bundle = Bundle::new().with(Position { x: 0.0 }).with(Speed { x: 2.0 });
        assert_eq!(
            bundle.component_types(),
            vec![Position::component_type_id(), Speed::component_type_id()]
        );
        assert_eq!(bundle.entity(), Entity::INVALID);
    }

    #[test]
    fn test_duplicate_type_first_wins() {
        let bundle = Bundle::new()
            .with(Position { x: 1.0 })
            .with(Position { x: 2.0 });
        assert_eq!(bundle.len(), 1);
        let first = bundle.iter().next().unwrap();
        let position = first.as_any().downcast_ref::<Record<Position>>().unwrap();
        assert_eq!(position.x, 1.0);
    }

    #[test]
    fn test_stamp_reaches_every_record() {
        let mut bundle = Bundle::new().with(Position { x: 0.0 }).with(Speed { x: 0.0 });
        bundle.stamp(Entity(12));
        assert_eq!(bundle.entity(), Entity(12));
        assert!(bundle.iter().all(|r| r.entity() == Entity(12)));
    }

    #[test]
    fn test_push_after_stamp_inherits_entity() {
        let mut bundle = Bundle::new().with(Position { x: 0.0 });
        bundle.stamp(Entity(3));
        bundle.push(Box::new(Record::new(Speed { x: 1.0 })));
        assert!(bundle.iter().all(|r| r.entity() == Entity(3)));
    }

    #[test]
    fn test_from_instance_flattens_signature() {
        let instance = (Record::new(Position { x: 1.0 }), Record::new(Speed { x: 2.0 }));
        let bundle = Bundle::from_instance::<(Position, Speed)>(instance);
        assert_eq!(bundle.len(), 2);
        assert!(bundle.contains_type(Speed::component_type_id()));
    }
}
