//! Layered AABB collision world.
//!
//! Broad phase runs over an interchangeable spatial index (hash grid or
//! quadtree); every query re-tests candidates exactly before reporting them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod layer_matrix;
pub mod movement;
pub mod raycast;
pub mod resolve;
pub mod shape;
pub mod spatial;
pub mod world;

pub use layer_matrix::LayerMatrix;
pub use movement::{compute_move, MoveMode, MovementResult};
pub use raycast::RaycastHit;
pub use resolve::{
    NullPairSink, PairEvent, PairEventSink, PairKind, Resolution, Resolver, ResolverConfig,
    ResolverStats, VecPairSink,
};
pub use shape::{Collider, ColliderShape, Shape};
pub use spatial::{HashGrid, IndexEntry, IndexKind, QuadTree, QuadTreeStats, SpatialIndex};
pub use world::{CollisionConfig, CollisionWorld, Contact, ProfileStats};
