//! # sim_runtime
//!
//! The "S" of the simulation ECS: the component database, deferred
//! structural changes, systems and the tick loop that drives them.
//!
//! - [`Database`]: per-type tables, live entity set, set algebra.
//! - [`Demography`]: mergeable ledger of births, deaths, attaches and
//!   detaches, applied once per tick.
//! - [`FilterStrategy`]: how a system's eligible entities are selected.
//! - [`System`], [`Scheduled`], [`SystemBag`]: units of per-tick logic.
//! - [`Scheduler`]: the runtime facade.
//!
//! ```rust
//! use sim_component::{Bundle, Component};
//! use sim_runtime::{Demography, Outcome, Scheduler, SchedulerConfig, System, View};
//!
//! #[derive(Debug, Clone)]
//! struct Position(f32);
//! impl Component for Position {}
//!
//! #[derive(Debug, Clone)]
//! struct Speed(f32);
//! impl Component for Speed {}
//!
//! struct Move;
//!
//! impl System for Move {
//!     type Signature = (Position, Speed);
//!
//!     fn update_single(&mut self, (position, speed): View<'_, Self>, dt: f64) -> Outcome {
//!         position.0 += speed.0 * dt as f32;
//!         Ok(Demography::new())
//!     }
//! }
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::default());
//! scheduler.add_system(Move).unwrap();
//! let ids = scheduler.create_all([Bundle::new().with(Position(0.0)).with(Speed(2.0))]);
//! scheduler.tick(1.0); // entity becomes visible
//! scheduler.tick(1.0); // entity moves
//! assert_eq!(scheduler.database().get::<Position>(ids[0]).unwrap().0, 2.0);
//! ```

pub mod clock;
pub mod config;
pub mod database;
pub mod demography;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod strategy;
pub mod system;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::SchedulerConfig;
pub use database::Database;
pub use demography::{Applied, Demography};
pub use error::ConfigError;
pub use report::{Phase, SystemFailure, TickReport};
pub use scheduler::Scheduler;
pub use strategy::{FilterStrategy, Selection};
pub use system::{AnySystem, Outcome, Scheduled, System, SystemBag, View};
