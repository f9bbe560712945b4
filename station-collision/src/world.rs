use std::cell::Cell;
use std::collections::BTreeMap;

use station_core::{layer, Aabb, EntityId, EntitySnapshot, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::layer_matrix::LayerMatrix;
use crate::raycast::{self, RaycastHit};
use crate::shape::{Collider, ColliderShape};
use crate::spatial::{HashGrid, IndexEntry, IndexKind, QuadTree, QuadTreeStats, SpatialIndex};

/// One overlap between two colliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
    pub intersection: Aabb,
    /// Unit vector from `a`'s center toward `b`'s center.
    pub normal: Vec2,
    pub is_trigger: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    pub index: IndexKind,
    pub grid_cell_size: f32,
    pub quadtree_region: Aabb,
    pub quadtree_max_depth: u32,
    pub quadtree_max_objects: usize,
    pub enable_profiling: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            index: IndexKind::HashGrid,
            grid_cell_size: HashGrid::DEFAULT_CELL_SIZE,
            quadtree_region: Aabb::new(Vec2::ZERO, Vec2::splat(2048.0)),
            quadtree_max_depth: QuadTree::DEFAULT_MAX_DEPTH,
            quadtree_max_objects: QuadTree::DEFAULT_MAX_OBJECTS,
            enable_profiling: false,
        }
    }
}

/// Query counters, populated only when profiling is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub total_queries: u64,
    pub broad_phase_tests: u64,
    pub narrow_phase_tests: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total_queries: Cell<u64>,
    broad_phase_tests: Cell<u64>,
    narrow_phase_tests: Cell<u64>,
}

impl Counters {
    fn query(&self, broad: usize) {
        self.total_queries.set(self.total_queries.get() + 1);
        self.broad_phase_tests
            .set(self.broad_phase_tests.get() + broad as u64);
    }

    fn narrow(&self, tests: usize) {
        self.narrow_phase_tests
            .set(self.narrow_phase_tests.get() + tests as u64);
    }
}

/// Owns every collider, keyed by entity handle, plus the broad-phase index.
///
/// The index is rebuilt from the collider map on every mutation, so all
/// spatial queries observe the latest state within a tick.
pub struct CollisionWorld {
    config: CollisionConfig,
    colliders: BTreeMap<EntityId, Collider>,
    index: Box<dyn SpatialIndex>,
    matrix: LayerMatrix,
    counters: Counters,
}

impl CollisionWorld {
    pub fn new(config: CollisionConfig) -> Self {
        let index: Box<dyn SpatialIndex> = match config.index {
            IndexKind::HashGrid => Box::new(HashGrid::new(config.grid_cell_size)),
            IndexKind::QuadTree => Box::new(QuadTree::new(
                config.quadtree_region,
                config.quadtree_max_depth,
                config.quadtree_max_objects,
            )),
        };
        Self {
            config,
            colliders: BTreeMap::new(),
            index,
            matrix: LayerMatrix::default(),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn collider(&self, id: EntityId) -> Option<&Collider> {
        self.colliders.get(&id)
    }

    pub fn set_layer_rule(&mut self, layer_a: u32, layer_b: u32, collides: bool) {
        self.matrix.set(layer_a, layer_b, collides);
    }

    pub fn layer_collides(&self, layer_a: u32, layer_b: u32) -> bool {
        self.matrix.collides(layer_a, layer_b)
    }

    /// Upsert the legacy single-rectangle collider for an entity. The layer is
    /// copied from the snapshot.
    pub fn upsert_bounds(&mut self, snapshot: &EntitySnapshot, bounds: Aabb) {
        self.colliders
            .insert(snapshot.id, Collider::from_bounds(snapshot, bounds));
        self.rebuild();
    }

    /// Upsert a multi-shape collider anchored at the snapshot position.
    pub fn upsert_shapes(&mut self, snapshot: &EntitySnapshot, shapes: Vec<ColliderShape>) {
        self.colliders
            .insert(snapshot.id, Collider::from_shapes(snapshot, shapes));
        self.rebuild();
    }

    /// Shift a collider without changing its shape set.
    pub fn translate(&mut self, id: EntityId, delta: Vec2) {
        if let Some(collider) = self.colliders.get_mut(&id) {
            collider.position += delta;
            self.rebuild();
        }
    }

    pub fn remove(&mut self, id: EntityId) {
        if self.colliders.remove(&id).is_some() {
            self.rebuild();
        }
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.index.clear();
        for (id, collider) in &self.colliders {
            self.index.insert(IndexEntry {
                id: *id,
                bounds: collider.bounds(),
            });
        }
    }

    /// Quadtree structure counters, when that index is active.
    pub fn index_stats(&self) -> Option<QuadTreeStats> {
        self.index.tree_stats()
    }

    pub fn profile(&self) -> ProfileStats {
        ProfileStats {
            total_queries: self.counters.total_queries.get(),
            broad_phase_tests: self.counters.broad_phase_tests.get(),
            narrow_phase_tests: self.counters.narrow_phase_tests.get(),
        }
    }

    pub fn reset_profile(&mut self) {
        self.counters = Counters::default();
    }

    fn mask_excludes(collider_layer: u32, mask: u32) -> bool {
        mask != layer::ALL && (collider_layer & mask) == 0
    }

    /// Entities overlapping `id`'s collider, after layer-matrix filtering.
    pub fn check(&self, id: EntityId) -> Vec<EntityId> {
        let Some(subject) = self.colliders.get(&id) else {
            return Vec::new();
        };
        let bounds = subject.bounds();
        let candidates = self.index.query_aabb(bounds);
        if self.config.enable_profiling {
            self.counters.query(candidates.len());
        }

        let mut out = Vec::new();
        let mut narrow = 0usize;
        for cand in candidates {
            if cand == id {
                continue;
            }
            let Some(other) = self.colliders.get(&cand) else {
                continue;
            };
            if !self.matrix.collides(subject.layer, other.layer) {
                continue;
            }
            narrow += 1;
            if bounds.intersects(other.bounds()) {
                out.push(cand);
            }
        }
        if self.config.enable_profiling {
            self.counters.narrow(narrow);
        }
        out
    }

    /// Like `check`, with intersection geometry and trigger flags.
    pub fn check_detailed(&self, id: EntityId) -> Vec<Contact> {
        let Some(subject) = self.colliders.get(&id) else {
            return Vec::new();
        };
        let bounds = subject.bounds();
        let candidates = self.index.query_aabb(bounds);
        if self.config.enable_profiling {
            self.counters.query(candidates.len());
        }

        let mut out = Vec::new();
        for cand in candidates {
            if cand == id {
                continue;
            }
            let Some(other) = self.colliders.get(&cand) else {
                continue;
            };
            if !self.matrix.collides(subject.layer, other.layer) {
                continue;
            }
            let other_bounds = other.bounds();
            let Some(intersection) = bounds.intersection(other_bounds) else {
                continue;
            };
            out.push(Contact {
                a: id,
                b: cand,
                intersection,
                normal: (other_bounds.center() - bounds.center()).normalize_or_zero(),
                is_trigger: subject.is_trigger_for(&intersection)
                    || other.is_trigger_for(&intersection),
            });
        }
        out
    }

    /// First broad-phase candidate intersecting `bounds` under the mask.
    pub fn first_for_bounds(
        &self,
        bounds: Aabb,
        exclude: Option<EntityId>,
        mask: u32,
    ) -> Option<EntityId> {
        let candidates = self.index.query_aabb(bounds);
        if self.config.enable_profiling {
            self.counters.query(candidates.len());
        }
        for cand in candidates {
            if Some(cand) == exclude {
                continue;
            }
            let Some(other) = self.colliders.get(&cand) else {
                continue;
            };
            if Self::mask_excludes(other.layer, mask) {
                continue;
            }
            if bounds.intersects(other.bounds()) {
                return Some(cand);
            }
        }
        None
    }

    /// Nearest hit along `origin + direction * max_distance`.
    ///
    /// `direction` is expected to be normalized.
    pub fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        exclude: Option<EntityId>,
        mask: u32,
    ) -> RaycastHit {
        self.segment_hit(origin, origin + direction * max_distance, exclude, mask)
    }

    /// Nearest hit along the segment `p0 -> p1`.
    pub fn segment_hit(
        &self,
        p0: Vec2,
        p1: Vec2,
        exclude: Option<EntityId>,
        mask: u32,
    ) -> RaycastHit {
        let candidates = self.index.query_segment(p0, p1);
        if self.config.enable_profiling {
            self.counters.query(candidates.len());
        }

        let mut closest = RaycastHit::miss();
        for cand in candidates {
            if Some(cand) == exclude {
                continue;
            }
            let Some(other) = self.colliders.get(&cand) else {
                continue;
            };
            if Self::mask_excludes(other.layer, mask) {
                continue;
            }
            if let Some(hit) = raycast::segment_intersects_rect(p0, p1, other.bounds()) {
                if hit.distance < closest.distance {
                    closest = hit;
                    closest.entity = Some(cand);
                }
            }
        }
        closest
    }

    pub fn segment_intersects_any(
        &self,
        p0: Vec2,
        p1: Vec2,
        exclude: Option<EntityId>,
        mask: u32,
    ) -> bool {
        self.segment_hit(p0, p1, exclude, mask).valid
    }

    /// Contacts `mover` would touch while displacing by `velocity * dt`.
    ///
    /// `bounds` is the mover's current box; it is enlarged along the
    /// displacement to form the swept box.
    pub fn sweep(
        &self,
        mover: EntityId,
        bounds: Aabb,
        velocity: Vec2,
        dt: f32,
        mask: u32,
    ) -> Vec<Contact> {
        let swept = bounds.expanded_toward(velocity * dt);
        let candidates = self.index.query_aabb(swept);
        if self.config.enable_profiling {
            self.counters.query(candidates.len());
        }

        let mut out = Vec::new();
        for cand in candidates {
            if cand == mover {
                continue;
            }
            let Some(other) = self.colliders.get(&cand) else {
                continue;
            };
            if Self::mask_excludes(other.layer, mask) {
                continue;
            }
            let other_bounds = other.bounds();
            let Some(intersection) = swept.intersection(other_bounds) else {
                continue;
            };
            out.push(Contact {
                a: mover,
                b: cand,
                intersection,
                normal: (other_bounds.center() - swept.center()).normalize_or_zero(),
                is_trigger: other.is_trigger_for(&intersection),
            });
        }
        out
    }
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}
