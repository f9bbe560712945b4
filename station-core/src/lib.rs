//! Deterministic, engine-agnostic simulation kernel primitives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod entity;
pub mod layer;
pub mod math;
pub mod tick;

pub use entity::{EntityId, EntityKind, EntityRegistry, EntitySnapshot, WorldState};
pub use math::{Aabb, Vec2};
pub use tick::TickContext;
