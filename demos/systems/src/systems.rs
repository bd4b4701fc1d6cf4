//! Example systems.
//!
//! - [`Move`] integrates speed into position.
//! - [`Spawner`] emits a new drone per run until its limit is reached.
//! - [`Bounds`] destroys drones that leave the arena.
//! - [`Census`] logs every entity with all of its components.

use components::{Info, Position, Speed};
use sim_component::Bundle;
use sim_runtime::{Database, Demography, FilterStrategy, Outcome, System, View};
use tracing::{debug, info};

/// Moves every entity that has both a position and a speed.
pub struct Move;

impl System for Move {
    type Signature = (Position, Speed);

    fn update_single(&mut self, (position, speed): View<'_, Self>, dt: f64) -> Outcome {
        position.advance(speed, dt as f32);
        Ok(Demography::new())
    }
}

/// Spawns drones, one per run.
pub struct Spawner {
    spawned: u32,
    limit: u32,
}

impl Spawner {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self { spawned: 0, limit }
    }

    fn drone(n: u32) -> Bundle {
        let heading = n as f32 * std::f32::consts::FRAC_PI_3;
        let speed = 1.0 + n as f32;
        Bundle::new()
            .with(Position::default())
            .with(Speed::new(heading.cos() * speed, heading.sin() * speed, 0.0))
            .with(Info::new(format!("drone-{n}")))
    }
}

impl System for Spawner {
    type Signature = (Info,);

    fn update_before(&mut self, _db: &mut Database, _dt: f64) -> Outcome {
        if self.spawned >= self.limit {
            return Ok(Demography::new());
        }
        let n = self.spawned;
        self.spawned += 1;
        debug!(n, "spawning drone");
        Ok(Demography::add([Self::drone(n)]))
    }

    fn register(&mut self, (info,): View<'_, Self>) {
        info!(entity = %info.entity(), label = %info.label, "drone online");
    }
}

/// Destroys entities whose position leaves a sphere around the origin.
pub struct Bounds {
    radius: f32,
}

impl Bounds {
    #[must_use]
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl System for Bounds {
    type Signature = (Position,);

    fn update_single(&mut self, item: View<'_, Self>, _dt: f64) -> Outcome {
        if item.0.point.length() > self.radius {
            return Ok(Demography::remove(&item));
        }
        Ok(Demography::new())
    }

    fn unregister(&mut self, (position,): View<'_, Self>) {
        info!(entity = %position.entity(), at = ?position.point, "left the arena");
    }
}

/// Logs every entity with the names of its components.
pub struct Census;

impl System for Census {
    type Signature = sim_component::Raw;

    fn filter(&self) -> FilterStrategy {
        FilterStrategy::MatchAll
    }

    fn update_single(&mut self, item: View<'_, Self>, _dt: f64) -> Outcome {
        let Some(first) = item.first() else {
            return Ok(Demography::new());
        };
        let components: Vec<&str> = item.iter().map(|record| record.type_name()).collect();
        debug!(entity = %first.entity(), ?components, "census");
        Ok(Demography::new())
    }
}

#[cfg(test)]
mod tests {
    use sim_runtime::{Scheduler, SchedulerConfig};

    use super::*;

    #[test]
    fn test_spawner_stops_at_limit() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler.add_system(Spawner::new(2)).unwrap();
        for _ in 0..4 {
            scheduler.tick(0.1);
        }
        assert_eq!(scheduler.database().entity_count(), 2);
        let labels: Vec<String> = scheduler
            .database()
            .table::<Info>()
            .unwrap()
            .list_all(None)
            .into_iter()
            .map(|record| record.into_inner().label)
            .collect();
        assert_eq!(labels, vec!["drone-0", "drone-1"]);
    }

    #[test]
    fn test_bounds_destroys_escaped_entities() {
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        scheduler
            .add_system(Move)
            .unwrap()
            .add_system(Bounds::new(5.0))
            .unwrap()
            .add_system(Census)
            .unwrap();
        let ids = scheduler.create_all([
            Bundle::new()
                .with(Position::default())
                .with(Speed::new(4.0, 0.0, 0.0)),
            Bundle::new().with(Position::new(1.0, 0.0, 0.0)),
        ]);
        scheduler.tick(1.0);
        scheduler.tick(1.0);
        assert!(scheduler.database().is_alive(ids[0]));

        let report = scheduler.tick(1.0);
        assert_eq!(report.died, vec![ids[0]]);
        assert!(scheduler.database().is_alive(ids[1]));
    }
}
