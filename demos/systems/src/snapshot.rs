//! JSON dump of the world state.

use components::{Info, Position, Speed};
use serde::Serialize;
use sim_runtime::Scheduler;

/// One entity with the demo components it owns.
#[derive(Debug, Serialize)]
pub struct EntitySnapshot {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
}

/// The live world after a given tick.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub tick_id: u64,
    pub entities: Vec<EntitySnapshot>,
}

impl Snapshot {
    /// Copy every live entity's demo components out of the database.
    #[must_use]
    pub fn capture(scheduler: &Scheduler) -> Self {
        let db = scheduler.database();
        let entities = db
            .entities()
            .iter()
            .map(|&entity| EntitySnapshot {
                id: entity.raw(),
                position: db.get::<Position>(entity).map(|r| r.value),
                speed: db.get::<Speed>(entity).map(|r| r.value),
                info: db.get::<Info>(entity).map(|r| r.value.clone()),
            })
            .collect();
        Self {
            tick_id: scheduler.tick_id(),
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use sim_component::Bundle;
    use sim_runtime::SchedulerConfig;

    use super::*;

    #[test]
    fn test_capture_lists_live_entities() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.create_all([
            Bundle::new().with(Position::new(1.0, 0.0, 0.0)),
            Bundle::new().with(Info::new("tag")),
        ]);
        scheduler.tick(0.1);

        let snapshot = Snapshot::capture(&scheduler);
        assert_eq!(snapshot.tick_id, 1);
        assert_eq!(snapshot.entities.len(), 2);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["entities"][1]["info"]["label"], "tag");
        assert!(json["entities"][1].get("position").is_none());
    }
}
