//! Entity ids.
//!
//! An [`Entity`] is a bare `u64`. Whether it is alive is decided by the
//! database (it owns at least one component), not by the id itself.

use std::fmt;

/// Id of a simulated entity. `0` is reserved for [`Entity::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub u64);

impl Entity {
    /// Carried by records and bundles nobody has stamped yet.
    pub const INVALID: Entity = Entity(0);

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Hands out entity ids in issue order.
///
/// Ids are never recycled: once [`EntityAllocator::allocate`] has returned an
/// id, no later call returns it again, even after the entity died. A stale id
/// therefore can only ever refer to a dead entity, never to a newer one.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Highest id issued so far; `0` before the first allocation.
    last: u64,
}

impl EntityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id.
    pub fn allocate(&mut self) -> Entity {
        self.last += 1;
        Entity(self.last)
    }

    /// How many ids have been issued.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.last
    }

    /// Returns `true` if `entity` came out of this allocator at some point.
    #[must_use]
    pub fn has_issued(&self, entity: Entity) -> bool {
        entity.is_valid() && entity.0 <= self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        assert!(!Entity::INVALID.is_valid());
        assert!(Entity(7).is_valid());
        assert_eq!(Entity(7).raw(), 7);
        assert_eq!(Entity(7).to_string(), "Entity(7)");
    }

    #[test]
    fn test_first_id_skips_sentinel() {
        let mut ids = EntityAllocator::new();
        assert_eq!(ids.issued(), 0);
        assert_eq!(ids.allocate(), Entity(1));
    }

    #[test]
    fn test_ids_never_repeat() {
        let mut ids = EntityAllocator::new();
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..256 {
            assert!(seen.insert(ids.allocate()));
        }
        assert_eq!(ids.issued(), 256);
    }

    #[test]
    fn test_has_issued() {
        let mut ids = EntityAllocator::new();
        let first = ids.allocate();
        assert!(ids.has_issued(first));
        assert!(!ids.has_issued(Entity(2)));
        assert!(!ids.has_issued(Entity::INVALID));
    }
}
