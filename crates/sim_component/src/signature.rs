//! Signatures: declared, fixed-arity tuples of component types.
//!
//! A [`Signature`] is declared once per system or query as a tuple of
//! component types, e.g. `(Position, Speed)`. It has two instance shapes:
//!
//! - an owned [`Signature::Instance`] (`(Record<Position>, Record<Speed>)`)
//!   used for birth bundles and destroy targets;
//! - a borrowed [`Signature::View`] (`(&mut Record<Position>, &mut Record<Speed>)`)
//!   handed to systems so they mutate components in place.
//!
//! Both are produced by *casting* an unordered list of records: each record
//! is matched against the first unfilled field of its type. The cast
//! succeeds only when every field is filled exactly once.
//!
//! ## Tie-break
//!
//! If the input holds two records of the same declared type, the first one
//! encountered fills the field and the later one is ignored. Records of
//! undeclared types are ignored as well.
//!
//! [`Raw`] is the signature of systems that take whatever heterogeneous
//! record list the selection strategy produces. [`AnyOf`] declares fields
//! like a tuple but casts whenever at least one of them is present.

use std::collections::HashSet;
use std::marker::PhantomData;

use crate::component::{AnyRecord, Component, ComponentTypeId, Record};
use crate::entity::Entity;
use crate::error::SignatureError;

/// A declared, ordered, fixed set of component types.
pub trait Signature: 'static {
    /// Owned, filled instance.
    type Instance;

    /// Borrowed, filled instance over records stored in tables.
    type View<'a>;

    /// Declared component types in canonical (declaration) order, or `None`
    /// for [`Raw`].
    fn fields() -> Option<Vec<ComponentTypeId>>;

    /// Declared component type names, parallel to [`Signature::fields`].
    fn field_names() -> Vec<&'static str>;

    /// Build an owned instance from an unordered list of records.
    fn cast(items: Vec<Box<dyn AnyRecord>>) -> Option<Self::Instance>;

    /// Build a borrowed view from an unordered list of records.
    fn cast_mut<'a>(items: Vec<&'a mut dyn AnyRecord>) -> Option<Self::View<'a>>;

    /// Decompose an owned instance back into its records (inverse of
    /// [`Signature::cast`]).
    fn to_components(instance: Self::Instance) -> Vec<Box<dyn AnyRecord>>;

    /// The entity owning an owned instance, read off its first field.
    fn entity_of(instance: &Self::Instance) -> Entity;

    /// Declaration-time validation.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::DuplicateField`] when a component type is
    /// declared more than once; such a signature could never be filled.
    fn validate() -> Result<(), SignatureError> {
        let Some(fields) = Self::fields() else {
            return Ok(());
        };
        let mut seen = HashSet::new();
        for (ty, name) in fields.into_iter().zip(Self::field_names()) {
            if !seen.insert(ty) {
                return Err(SignatureError::DuplicateField { field: name });
            }
        }
        Ok(())
    }
}

macro_rules! impl_signature {
    ($($ty:ident => $slot:ident),+) => {
        impl<$($ty: Component),+> Signature for ($($ty,)+) {
            type Instance = ($(Record<$ty>,)+);
            type View<'a> = ($(&'a mut Record<$ty>,)+);

            fn fields() -> Option<Vec<ComponentTypeId>> {
                Some(vec![$($ty::component_type_id()),+])
            }

            fn field_names() -> Vec<&'static str> {
                vec![$($ty::type_name()),+]
            }

            fn cast(items: Vec<Box<dyn AnyRecord>>) -> Option<Self::Instance> {
                $(let mut $slot: Option<Record<$ty>> = None;)+
                for item in items {
                    let ty = item.component_type();
                    $(
                        if ty == $ty::component_type_id() {
                            if $slot.is_none() {
                                $slot = item.into_any().downcast::<Record<$ty>>().ok().map(|r| *r);
                            }
                            continue;
                        }
                    )+
                }
                Some(($($slot?,)+))
            }

            fn cast_mut<'a>(items: Vec<&'a mut dyn AnyRecord>) -> Option<Self::View<'a>> {
                $(let mut $slot: Option<&'a mut Record<$ty>> = None;)+
                for item in items {
                    let ty = item.component_type();
                    $(
                        if ty == $ty::component_type_id() {
                            if $slot.is_none() {
                                $slot = item.as_any_mut().downcast_mut::<Record<$ty>>();
                            }
                            continue;
                        }
                    )+
                }
                Some(($($slot?,)+))
            }

            fn to_components(instance: Self::Instance) -> Vec<Box<dyn AnyRecord>> {
                let ($($slot,)+) = instance;
                vec![$(Box::new($slot) as Box<dyn AnyRecord>),+]
            }

            fn entity_of(instance: &Self::Instance) -> Entity {
                instance.0.entity()
            }
        }
    };
}

impl_signature!(A => a);
impl_signature!(A => a, B => b);
impl_signature!(A => a, B => b, C => c);
impl_signature!(A => a, B => b, C => c, D => d);
impl_signature!(A => a, B => b, C => c, D => d, E => e);
impl_signature!(A => a, B => b, C => c, D => d, E => e, F => f);

/// Signature of systems without declared fields.
///
/// A raw view is every record the selection strategy found for one entity,
/// in registry order. It casts whenever at least one record is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Signature for Raw {
    type Instance = Vec<Box<dyn AnyRecord>>;
    type View<'a> = Vec<&'a mut dyn AnyRecord>;

    fn fields() -> Option<Vec<ComponentTypeId>> {
        None
    }

    fn field_names() -> Vec<&'static str> {
        Vec::new()
    }

    fn cast(items: Vec<Box<dyn AnyRecord>>) -> Option<Self::Instance> {
        (!items.is_empty()).then_some(items)
    }

    fn cast_mut<'a>(items: Vec<&'a mut dyn AnyRecord>) -> Option<Self::View<'a>> {
        (!items.is_empty()).then_some(items)
    }

    fn to_components(instance: Self::Instance) -> Vec<Box<dyn AnyRecord>> {
        instance
    }

    fn entity_of(instance: &Self::Instance) -> Entity {
        instance
            .first()
            .map_or(Entity::INVALID, |record| record.entity())
    }
}

/// Signature over the declared fields of `S` where any non-empty subset
/// casts.
///
/// The view holds the present fields in the order of the input list; records
/// of undeclared types are dropped. Used by systems selecting with a
/// "requires any" strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyOf<S>(PhantomData<fn() -> S>);

impl<S: Signature> AnyOf<S> {
    fn declared(ty: ComponentTypeId) -> bool {
        S::fields().is_some_and(|fields| fields.contains(&ty))
    }
}

impl<S: Signature> Signature for AnyOf<S> {
    type Instance = Vec<Box<dyn AnyRecord>>;
    type View<'a> = Vec<&'a mut dyn AnyRecord>;

    fn fields() -> Option<Vec<ComponentTypeId>> {
        S::fields()
    }

    fn field_names() -> Vec<&'static str> {
        S::field_names()
    }

    fn cast(items: Vec<Box<dyn AnyRecord>>) -> Option<Self::Instance> {
        let mut seen = HashSet::new();
        let kept: Vec<_> = items
            .into_iter()
            .filter(|item| {
                let ty = item.component_type();
                Self::declared(ty) && seen.insert(ty)
            })
            .collect();
        (!kept.is_empty()).then_some(kept)
    }

    fn cast_mut<'a>(items: Vec<&'a mut dyn AnyRecord>) -> Option<Self::View<'a>> {
        let mut seen = HashSet::new();
        let kept: Vec<_> = items
            .into_iter()
            .filter(|item| {
                let ty = item.component_type();
                Self::declared(ty) && seen.insert(ty)
            })
            .collect();
        (!kept.is_empty()).then_some(kept)
    }

    fn to_components(instance: Self::Instance) -> Vec<Box<dyn AnyRecord>> {
        instance
    }

    fn entity_of(instance: &Self::Instance) -> Entity {
        instance
            .first()
            .map_or(Entity::INVALID, |record| record.entity())
    }

    fn validate() -> Result<(), SignatureError> {
        S::validate()
    }
}
