//! Core [`Component`] trait, component records and type identity.
//!
//! A component value lives inside a [`Record`], which adds the bookkeeping
//! every stored component carries: its own [`ComponentId`], the owning
//! [`Entity`] and an activity flag. Tables and bundles hold records through
//! the object-safe [`AnyRecord`] trait so heterogeneous lists can be built.
//!
//! Type ids hash the component's type name, so they are the same in every
//! run and build, and a component can pin its id by overriding the name.

use std::any::Any;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entity::Entity;
use crate::table::{AnyTable, Table};

/// Identity of a component type: the 64-bit FNV-1a hash of
/// [`Component::type_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

impl ComponentTypeId {
    /// Hash `name` into a type id.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(name.bytes().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        }))
    }

    #[must_use]
    pub fn of<T: Component>() -> Self {
        T::component_type_id()
    }
}

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one component record, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl ComponentId {
    /// Draws the next component id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The core component trait.
///
/// Any plain `'static` data type can be a component. The only requirements
/// are `Clone` (tables hand out snapshot copies) and `Debug` (records show
/// up in logs).
///
/// # Examples
///
/// ```rust
/// use sim_component::Component;
///
/// #[derive(Debug, Clone)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Any + Clone + Debug {
    /// A human-readable name for this component type.
    ///
    /// Defaults to the fully qualified Rust type name, which keeps the
    /// derived [`ComponentTypeId`] unique per type.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

/// A component value together with its record header.
///
/// `entity` is [`Entity::INVALID`] until the record is stamped by a bundle
/// or inserted into a table, after which it always equals the key the record
/// is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    id: ComponentId,
    entity: Entity,
    active: bool,
    /// The component data.
    pub value: T,
}

impl<T: Component> Record<T> {
    /// Wraps a component value in a fresh, active, unstamped record.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            id: ComponentId::next(),
            entity: Entity::INVALID,
            active: true,
            value,
        }
    }

    /// Sets the activity flag, builder style.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns this record's component id.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Returns the owning entity.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Returns `true` if the record takes part in per-tick queries.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggles whether the record takes part in per-tick queries.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Unwraps the component value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Object-safe view of a [`Record`] of any component type.
pub trait AnyRecord: Any + Debug {
    /// The component type of the wrapped value.
    fn component_type(&self) -> ComponentTypeId;

    /// Human-readable name of the component type.
    fn type_name(&self) -> &'static str;

    /// This record's component id.
    fn component_id(&self) -> ComponentId;

    /// The owning entity.
    fn entity(&self) -> Entity;

    /// Assigns the owning entity.
    fn stamp(&mut self, entity: Entity);

    /// Whether the record takes part in per-tick queries.
    fn is_active(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Creates an empty table able to store records of this type.
    fn empty_table(&self) -> Box<dyn AnyTable>;

    fn clone_boxed(&self) -> Box<dyn AnyRecord>;
}

impl<T: Component> AnyRecord for Record<T> {
    fn component_type(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn component_id(&self) -> ComponentId {
        self.id
    }

    fn entity(&self) -> Entity {
        self.entity
    }

    fn stamp(&mut self, entity: Entity) {
        self.entity = entity;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn empty_table(&self) -> Box<dyn AnyTable> {
        Box::new(Table::<T>::new())
    }

    fn clone_boxed(&self) -> Box<dyn AnyRecord> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn AnyRecord> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl dyn AnyRecord {
    /// Downcasts to a typed record.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&Record<T>> {
        self.as_any().downcast_ref::<Record<T>>()
    }

    /// Downcasts to a typed mutable record.
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut Record<T>> {
        self.as_any_mut().downcast_mut::<Record<T>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {}

    #[derive(Debug, Clone)]
    struct Velocity {
        x: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_component_type_id_is_stable() {
        assert_eq!(Health::component_type_id(), Health::component_type_id());
        assert_eq!(ComponentTypeId::of::<Health>(), Health::component_type_id());
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(
            Velocity::component_type_id(),
            ComponentTypeId::from_name("Velocity")
        );
    }

    #[test]
    fn test_component_type_id_differs_between_types() {
        assert_ne!(Health::component_type_id(), Velocity::component_type_id());
    }

    #[test]
    fn test_type_id_reference_values() {
        assert_eq!(ComponentTypeId::from_name("").0, 0xcbf2_9ce4_8422_2325);
        assert_eq!(ComponentTypeId::from_name("a").0, 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_component_ids_are_unique() {
        let a = Record::new(Velocity { x: 1.0 });
        let b = Record::new(Velocity { x: 1.0 });
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_record_defaults() {
        let r = Record::new(Health {
            current: 5.0,
            max: 10.0,
        });
        assert_eq!(r.entity(), Entity::INVALID);
        assert!(r.is_active());
        assert_eq!(r.current, 5.0);
        assert!(!r.clone().with_active(false).is_active());
    }

    #[test]
    fn test_record_deref_mut() {
        let mut r = Record::new(Velocity { x: 1.0 });
        r.x += 2.0;
        assert_eq!(r.into_inner().x, 3.0);
    }

    #[test]
    fn test_erased_record_downcast() {
        let mut erased: Box<dyn AnyRecord> = Box::new(Record::new(Velocity { x: 4.0 }));
        erased.stamp(Entity(7));
        assert_eq!(erased.entity(), Entity(7));
        assert_eq!(erased.type_name(), "Velocity");
        assert!(erased.downcast_ref::<Health>().is_none());
        erased.downcast_mut::<Velocity>().unwrap().x = 9.0;
        assert_eq!(erased.downcast_ref::<Velocity>().unwrap().x, 9.0);
    }

    #[test]
    fn test_boxed_clone_keeps_header() {
        let mut erased: Box<dyn AnyRecord> = Box::new(Record::new(Velocity { x: 4.0 }));
        erased.stamp(Entity(3));
        let copy = erased.clone();
        assert_eq!(copy.entity(), Entity(3));
        assert_eq!(copy.component_id(), erased.component_id());
    }
}
