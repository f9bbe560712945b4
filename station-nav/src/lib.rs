//! Grid A* pathfinding over the collision world.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod planner;

pub use planner::{NavConfig, NavPlanner, PathResult};
