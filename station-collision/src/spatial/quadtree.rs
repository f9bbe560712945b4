use std::collections::BTreeMap;

use station_core::{Aabb, EntityId, Vec2};

use super::{segment_touches_rect, IndexEntry, SpatialIndex};

#[derive(Debug, Clone)]
struct Node {
    bounds: Aabb,
    depth: u32,
    objects: Vec<usize>,
    children: Option<[usize; 4]>,
}

impl Node {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            objects: Vec::new(),
            children: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Structure counters, for tuning and debug overlays on the host side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadTreeStats {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub total_objects: usize,
    pub max_depth_reached: u32,
}

/// Region quadtree over a fixed world rectangle.
///
/// A leaf subdivides when its object count exceeds the threshold and depth
/// allows; objects straddling child quadrants stay at the parent. Nodes live
/// in an arena with index links.
#[derive(Debug, Clone)]
pub struct QuadTree {
    region: Aabb,
    max_depth: u32,
    max_objects_per_node: usize,
    nodes: Vec<Node>,
    entries: Vec<Option<IndexEntry>>,
    by_id: BTreeMap<EntityId, usize>,
}

impl QuadTree {
    pub const DEFAULT_MAX_DEPTH: u32 = 6;
    pub const DEFAULT_MAX_OBJECTS: usize = 10;

    pub fn new(region: Aabb, max_depth: u32, max_objects_per_node: usize) -> Self {
        Self {
            region,
            max_depth,
            max_objects_per_node: max_objects_per_node.max(1),
            nodes: vec![Node::new(region, 0)],
            entries: Vec::new(),
            by_id: BTreeMap::new(),
        }
    }

    pub fn stats(&self) -> QuadTreeStats {
        let mut stats = QuadTreeStats::default();
        for node in &self.nodes {
            stats.total_nodes += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(node.depth);
            if node.is_leaf() {
                stats.leaf_nodes += 1;
            }
            stats.total_objects += node
                .objects
                .iter()
                .filter(|&&slot| self.entries[slot].is_some())
                .count();
        }
        stats
    }

    fn quadrant_bounds(bounds: Aabb, quadrant: usize) -> Aabb {
        let half = bounds.size * 0.5;
        let pos = bounds.position;
        let corner = match quadrant {
            0 => pos,
            1 => Vec2::new(pos.x + half.x, pos.y),
            2 => Vec2::new(pos.x, pos.y + half.y),
            _ => pos + half,
        };
        Aabb::new(corner, half)
    }

    /// Child index the object fits entirely inside, if any.
    fn quadrant_for(bounds: Aabb, object: Aabb) -> Option<usize> {
        let center = bounds.center();
        let min = object.min();
        let max = object.max();
        if max.x <= center.x && max.y <= center.y {
            Some(0)
        } else if min.x >= center.x && max.y <= center.y {
            Some(1)
        } else if max.x <= center.x && min.y >= center.y {
            Some(2)
        } else if min.x >= center.x && min.y >= center.y {
            Some(3)
        } else {
            None
        }
    }

    fn subdivide(&mut self, node_idx: usize) {
        let (bounds, depth) = {
            let node = &self.nodes[node_idx];
            (node.bounds, node.depth)
        };
        let mut children = [0usize; 4];
        for (quadrant, child) in children.iter_mut().enumerate() {
            *child = self.nodes.len();
            self.nodes
                .push(Node::new(Self::quadrant_bounds(bounds, quadrant), depth + 1));
        }
        self.nodes[node_idx].children = Some(children);
    }

    fn insert_into(&mut self, node_idx: usize, slot: usize, object: Aabb) {
        let (is_leaf, len, depth, bounds) = {
            let node = &self.nodes[node_idx];
            (node.is_leaf(), node.objects.len(), node.depth, node.bounds)
        };

        if is_leaf && len < self.max_objects_per_node {
            self.nodes[node_idx].objects.push(slot);
            return;
        }
        if depth >= self.max_depth {
            self.nodes[node_idx].objects.push(slot);
            return;
        }
        if is_leaf {
            self.subdivide(node_idx);
        }

        match (Self::quadrant_for(bounds, object), self.nodes[node_idx].children) {
            (Some(quadrant), Some(children)) => {
                self.insert_into(children[quadrant], slot, object);
            }
            // Straddles child quadrants.
            _ => self.nodes[node_idx].objects.push(slot),
        }
    }

    fn query_node(&self, node_idx: usize, bounds: Aabb, out: &mut Vec<EntityId>) {
        let node = &self.nodes[node_idx];
        if !node.bounds.intersects(bounds) {
            return;
        }
        for &slot in &node.objects {
            if let Some(entry) = self.entries[slot] {
                if entry.bounds.intersects(bounds) && !out.contains(&entry.id) {
                    out.push(entry.id);
                }
            }
        }
        if let Some(children) = node.children {
            for child in children {
                self.query_node(child, bounds, out);
            }
        }
    }

    fn query_segment_node(&self, node_idx: usize, p0: Vec2, p1: Vec2, out: &mut Vec<EntityId>) {
        let node = &self.nodes[node_idx];
        if !segment_touches_rect(p0, p1, node.bounds) {
            return;
        }
        for &slot in &node.objects {
            if let Some(entry) = self.entries[slot] {
                if segment_touches_rect(p0, p1, entry.bounds) && !out.contains(&entry.id) {
                    out.push(entry.id);
                }
            }
        }
        if let Some(children) = node.children {
            for child in children {
                self.query_segment_node(child, p0, p1, out);
            }
        }
    }
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::new(
            Aabb::new(Vec2::ZERO, Vec2::splat(2048.0)),
            Self::DEFAULT_MAX_DEPTH,
            Self::DEFAULT_MAX_OBJECTS,
        )
    }
}

impl SpatialIndex for QuadTree {
    fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new(self.region, 0));
        self.entries.clear();
        self.by_id.clear();
    }

    fn insert(&mut self, entry: IndexEntry) {
        self.remove(entry.id);
        let slot = self.entries.len();
        self.entries.push(Some(entry));
        self.by_id.insert(entry.id, slot);
        self.insert_into(0, slot, entry.bounds);
    }

    fn remove(&mut self, id: EntityId) {
        if let Some(slot) = self.by_id.remove(&id) {
            self.entries[slot] = None;
        }
    }

    fn query_aabb(&self, bounds: Aabb) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.query_node(0, bounds, &mut out);
        out
    }

    fn query_segment(&self, p0: Vec2, p1: Vec2) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.query_segment_node(0, p0, p1, &mut out);
        out
    }

    fn tree_stats(&self) -> Option<QuadTreeStats> {
        Some(self.stats())
    }
}
