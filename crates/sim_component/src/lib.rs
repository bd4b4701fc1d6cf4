//! # sim_component
//!
//! The "E" and "C" of the simulation ECS: what an entity is, what a
//! component record carries, how component types are grouped into
//! signatures, and how records of one type are stored.
//!
//! This crate provides:
//!
//! - [`Entity`] / [`EntityAllocator`]: never-reused `u64` identifiers.
//! - [`Component`] trait, [`Record`] and the erased [`AnyRecord`].
//! - [`Bundle`]: the records destined for one new entity.
//! - [`Signature`]: declared tuples of component types, with [`Raw`] for
//!   systems that take heterogeneous record lists and [`AnyOf`] for partial
//!   matches.
//! - [`Targets`]: resolves destroy targets to their owning entities.
//! - [`Table`] / [`AnyTable`]: per-type storage keyed by entity.

pub mod bundle;
pub mod component;
pub mod entity;
pub mod error;
pub mod signature;
pub mod table;
pub mod target;

pub use bundle::Bundle;
pub use component::{AnyRecord, Component, ComponentId, ComponentTypeId, Record};
pub use entity::{Entity, EntityAllocator};
pub use error::{SignatureError, StorageError};
pub use signature::{AnyOf, Raw, Signature};
pub use table::{AnyTable, Table};
pub use target::Targets;
