//! Broad-phase spatial indices.
//!
//! Both implementations answer the same candidate queries over `(id, bounds)`
//! snapshot entries. The collision world treats them as a rebuildable derived
//! view: cleared and re-populated on every collider mutation. Results are
//! unordered candidate sets; callers must re-test exactly.

mod grid;
mod quadtree;

pub use grid::HashGrid;
pub use quadtree::{QuadTree, QuadTreeStats};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use station_core::{Aabb, EntityId, Vec2};

use crate::raycast;

/// One indexed collider: its owner and world bounds at rebuild time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub id: EntityId,
    pub bounds: Aabb,
}

pub trait SpatialIndex {
    fn clear(&mut self);

    fn insert(&mut self, entry: IndexEntry);

    fn remove(&mut self, id: EntityId);

    /// Candidates whose bounds may overlap `bounds`, deduplicated by id.
    fn query_aabb(&self, bounds: Aabb) -> Vec<EntityId>;

    /// Candidates near the segment `p0 -> p1`, deduplicated by id.
    fn query_segment(&self, p0: Vec2, p1: Vec2) -> Vec<EntityId>;

    /// Structure counters; only the quadtree has any to report.
    fn tree_stats(&self) -> Option<QuadTreeStats> {
        None
    }
}

/// Which index implementation the collision world builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndexKind {
    #[default]
    HashGrid,
    QuadTree,
}

/// Segment/rect overlap including full containment, for pruning.
pub(crate) fn segment_touches_rect(p0: Vec2, p1: Vec2, rect: Aabb) -> bool {
    rect.contains_point(p0)
        || rect.contains_point(p1)
        || raycast::segment_intersects_rect(p0, p1, rect).is_some()
}
