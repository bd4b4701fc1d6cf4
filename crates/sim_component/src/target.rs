//! Destroy targets.
//!
//! Entities are destroyed by pointing at something they own: a record, a
//! filled signature instance or view, a bundle, or a list of those. The
//! owning entity id is read off the target itself. A bare [`Entity`] is not
//! a target.

use std::collections::BTreeSet;

use crate::bundle::Bundle;
use crate::component::{AnyRecord, Component, Record};
use crate::entity::Entity;

/// Something whose owning entities can be resolved.
pub trait Targets {
    /// Adds every owning entity to `out`. Unstamped records contribute
    /// nothing.
    fn collect_entities(&self, out: &mut BTreeSet<Entity>);

    /// The owning entities as a fresh set.
    fn target_entities(&self) -> BTreeSet<Entity> {
        let mut out = BTreeSet::new();
        self.collect_entities(&mut out);
        out
    }
}

fn insert_valid(out: &mut BTreeSet<Entity>, entity: Entity) {
    if entity.is_valid() {
        out.insert(entity);
    }
}

impl<T: Component> Targets for Record<T> {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        insert_valid(out, self.entity());
    }
}

impl<'r> Targets for dyn AnyRecord + 'r {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        insert_valid(out, self.entity());
    }
}

impl Targets for Bundle {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        insert_valid(out, self.entity());
    }
}

impl<T: Targets + ?Sized> Targets for &T {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        (**self).collect_entities(out);
    }
}

impl<T: Targets + ?Sized> Targets for &mut T {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        (**self).collect_entities(out);
    }
}

impl<T: Targets + ?Sized> Targets for Box<T> {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        (**self).collect_entities(out);
    }
}

impl<T: Targets> Targets for [T] {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        for target in self {
            target.collect_entities(out);
        }
    }
}

impl<T: Targets> Targets for Vec<T> {
    fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
        self.as_slice().collect_entities(out);
    }
}

macro_rules! impl_targets_tuple {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty: Targets),+> Targets for ($($ty,)+) {
            fn collect_entities(&self, out: &mut BTreeSet<Entity>) {
                $(self.$idx.collect_entities(out);)+
            }
        }
    };
}

impl_targets_tuple!(A => 0);
impl_targets_tuple!(A => 0, B => 1);
impl_targets_tuple!(A => 0, B => 1, C => 2);
impl_targets_tuple!(A => 0, B => 1, C => 2, D => 3);
impl_targets_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_targets_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
