//! Filter strategies: how a system's set of eligible entities is derived.

use std::collections::BTreeSet;

use sim_component::{ComponentTypeId, Entity};

use crate::database::Database;

/// How a system selects the entities it updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterStrategy {
    /// Entities owning every declared signature field.
    #[default]
    RequiresAll,
    /// Entities owning at least one declared signature field.
    RequiresAny,
    /// Every entity owning any component; views span every registered type.
    MatchAll,
    /// No entities. The per-entity update never runs.
    MatchNone,
}

/// The outcome of a strategy: which component types to materialise and for
/// which entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Component types to gather per entity, in view order.
    pub types: Vec<ComponentTypeId>,
    /// Eligible entities, ascending.
    pub entities: BTreeSet<Entity>,
}

impl FilterStrategy {
    /// Returns `true` if the strategy derives its match set from declared
    /// signature fields.
    #[must_use]
    pub fn requires_signature(self) -> bool {
        matches!(self, Self::RequiresAll | Self::RequiresAny)
    }

    /// Resolve the strategy against `db`. `fields` is the declared signature,
    /// `None` for systems without one.
    #[must_use]
    pub fn select(self, db: &Database, fields: Option<&[ComponentTypeId]>) -> Selection {
        match self {
            Self::RequiresAll => {
                let types = fields.map(<[_]>::to_vec).unwrap_or_default();
                let entities = db.intersect_entities(&types);
                Selection { types, entities }
            }
            Self::RequiresAny => {
                let types = fields.map(<[_]>::to_vec).unwrap_or_default();
                let entities = db.union_entities(&types);
                Selection { types, entities }
            }
            Self::MatchAll => Selection {
                types: db.component_types(),
                entities: db.all_entities(),
            },
            Self::MatchNone => Selection::default(),
        }
    }

    /// Component types a view is built from under this strategy.
    #[must_use]
    pub fn view_types(
        self,
        db: &Database,
        fields: Option<&[ComponentTypeId]>,
    ) -> Vec<ComponentTypeId> {
        match self {
            Self::RequiresAll | Self::RequiresAny => {
                fields.map(<[_]>::to_vec).unwrap_or_default()
            }
            Self::MatchAll => db.component_types(),
            Self::MatchNone => Vec::new(),
        }
    }

    /// Returns `true` if an entity owning exactly `owned` would be selected.
    /// Per-entity counterpart of [`FilterStrategy::select`].
    #[must_use]
    pub fn admits(self, owned: &[ComponentTypeId], fields: Option<&[ComponentTypeId]>) -> bool {
        let fields = fields.unwrap_or_default();
        match self {
            Self::RequiresAll => !fields.is_empty() && fields.iter().all(|ty| owned.contains(ty)),
            Self::RequiresAny => fields.iter().any(|ty| owned.contains(ty)),
            Self::MatchAll => !owned.is_empty(),
            Self::MatchNone => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use sim_component::{Bundle, Component};

    use super::*;

    #[derive(Debug, Clone)]
    struct Position;

    impl Component for Position {}

    #[derive(Debug, Clone)]
    struct Speed;

    impl Component for Speed {}

    #[derive(Debug, Clone)]
    struct Info;

    impl Component for Info {}

    fn populated() -> (Database, Vec<Entity>) {
        let mut db = Database::new();
        let ids = db.create_all([
            Bundle::new().with(Position).with(Speed),
            Bundle::new().with(Position),
            Bundle::new().with(Info),
        ]);
        let pending = db.take_pending();
        db.update_demography(pending);
        (db, ids)
    }

    fn movable() -> Vec<ComponentTypeId> {
        vec![Position::component_type_id(), Speed::component_type_id()]
    }

    #[test]
    fn test_default_is_requires_all() {
        assert_eq!(FilterStrategy::default(), FilterStrategy::RequiresAll);
    }

    #[test]
    fn test_requires_all_intersects() {
        let (db, ids) = populated();
        let fields = movable();
        let selection = FilterStrategy::RequiresAll.select(&db, Some(&fields));
        assert_eq!(selection.entities, BTreeSet::from([ids[0]]));
        assert_eq!(selection.types, fields);
    }

    #[test]
    fn test_requires_any_unions() {
        let (db, ids) = populated();
        let selection = FilterStrategy::RequiresAny.select(&db, Some(&movable()));
        assert_eq!(selection.entities, BTreeSet::from([ids[0], ids[1]]));
    }

    #[test]
    fn test_match_all_spans_every_table() {
        let (db, ids) = populated();
        let selection = FilterStrategy::MatchAll.select(&db, None);
        assert_eq!(selection.entities, ids.iter().copied().collect());
        assert_eq!(selection.types.len(), 3);
    }

    #[test]
    fn test_match_none_is_empty() {
        let (db, _) = populated();
        assert_eq!(
            FilterStrategy::MatchNone.select(&db, Some(&movable())),
            Selection::default()
        );
    }

    #[test]
    fn test_admits_agrees_with_select() {
        let (db, ids) = populated();
        let fields = movable();
        for strategy in [
            FilterStrategy::RequiresAll,
            FilterStrategy::RequiresAny,
            FilterStrategy::MatchAll,
            FilterStrategy::MatchNone,
        ] {
            let selected = strategy.select(&db, Some(&fields)).entities;
            for entity in &ids {
                let owned = db.component_types_of(*entity);
                assert_eq!(
                    strategy.admits(&owned, Some(&fields)),
                    selected.contains(entity),
                    "{strategy:?} on {entity}"
                );
            }
        }
    }

    #[test]
    fn test_admits_without_detached_type() {
        let fields = movable();
        let owned = [Position::component_type_id()];
        assert!(!FilterStrategy::RequiresAll.admits(&owned, Some(&fields)));
        assert!(FilterStrategy::RequiresAny.admits(&owned, Some(&fields)));
        assert!(!FilterStrategy::MatchAll.admits(&[], None));
    }

    #[test]
    fn test_requires_signature() {
        assert!(FilterStrategy::RequiresAll.requires_signature());
        assert!(FilterStrategy::RequiresAny.requires_signature());
        assert!(!FilterStrategy::MatchAll.requires_signature());
        assert!(!FilterStrategy::MatchNone.requires_signature());
    }
}
