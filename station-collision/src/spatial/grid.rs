use std::collections::{BTreeMap, BTreeSet};

use station_core::{Aabb, EntityId, Vec2};

use super::{IndexEntry, SpatialIndex};

/// Uniform hash grid.
///
/// A rectangle overlapping K cells is bucketed K times; queries deduplicate by
/// id before returning. Removal tombstones the entry slot, so stale bucket
/// references are skipped; the collision world rebuilds the whole index on
/// mutation anyway.
#[derive(Debug, Clone)]
pub struct HashGrid {
    cell_size: f32,
    entries: Vec<Option<IndexEntry>>,
    by_id: BTreeMap<EntityId, usize>,
    buckets: BTreeMap<(i32, i32), Vec<usize>>,
}

impl HashGrid {
    pub const DEFAULT_CELL_SIZE: f32 = 64.0;

    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1e-3),
            entries: Vec::new(),
            by_id: BTreeMap::new(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    fn cells_for_rect(&self, rect: Aabb) -> Vec<(i32, i32)> {
        let min = self.cell_of(rect.min());
        let max = self.cell_of(rect.max());
        let mut cells = Vec::with_capacity(
            ((max.0 - min.0 + 1) * (max.1 - min.1 + 1)).max(0) as usize,
        );
        for y in min.1..=max.1 {
            for x in min.0..=max.0 {
                cells.push((x, y));
            }
        }
        cells
    }

    /// Cells traversed by the segment, via a DDA grid walk.
    fn cells_for_segment(&self, p0: Vec2, p1: Vec2) -> Vec<(i32, i32)> {
        let mut cell = self.cell_of(p0);
        let end = self.cell_of(p1);
        let mut cells = vec![cell];

        let delta = p1 - p0;
        let step_x: i32 = if delta.x > 0.0 {
            1
        } else if delta.x < 0.0 {
            -1
        } else {
            0
        };
        let step_y: i32 = if delta.y > 0.0 {
            1
        } else if delta.y < 0.0 {
            -1
        } else {
            0
        };

        let next_boundary = |c: i32, step: i32| {
            let edge = if step > 0 { c + 1 } else { c };
            edge as f32 * self.cell_size
        };

        let mut t_max_x = if step_x != 0 {
            (next_boundary(cell.0, step_x) - p0.x) / delta.x
        } else {
            f32::INFINITY
        };
        let mut t_max_y = if step_y != 0 {
            (next_boundary(cell.1, step_y) - p0.y) / delta.y
        } else {
            f32::INFINITY
        };
        let t_delta_x = if step_x != 0 {
            self.cell_size / delta.x.abs()
        } else {
            f32::INFINITY
        };
        let t_delta_y = if step_y != 0 {
            self.cell_size / delta.y.abs()
        } else {
            f32::INFINITY
        };

        // Bounded by the taxicab cell distance; guards against float drift.
        let max_steps = (end.0 - cell.0).unsigned_abs() + (end.1 - cell.1).unsigned_abs();
        for _ in 0..max_steps {
            if cell == end {
                break;
            }
            if t_max_x < t_max_y {
                t_max_x += t_delta_x;
                cell.0 += step_x;
            } else {
                t_max_y += t_delta_y;
                cell.1 += step_y;
            }
            cells.push(cell);
        }

        cells
    }

    fn collect(&self, slots: impl Iterator<Item = usize>, out: &mut Vec<EntityId>) {
        let mut seen = BTreeSet::new();
        for slot in slots {
            if let Some(entry) = self.entries.get(slot).copied().flatten() {
                if seen.insert(entry.id) {
                    out.push(entry.id);
                }
            }
        }
    }
}

impl Default for HashGrid {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CELL_SIZE)
    }
}

impl SpatialIndex for HashGrid {
    fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
        self.buckets.clear();
    }

    fn insert(&mut self, entry: IndexEntry) {
        self.remove(entry.id);
        let slot = self.entries.len();
        self.entries.push(Some(entry));
        self.by_id.insert(entry.id, slot);
        for cell in self.cells_for_rect(entry.bounds) {
            self.buckets.entry(cell).or_default().push(slot);
        }
    }

    fn remove(&mut self, id: EntityId) {
        if let Some(slot) = self.by_id.remove(&id) {
            self.entries[slot] = None;
        }
    }

    fn query_aabb(&self, bounds: Aabb) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        for cell in self.cells_for_rect(bounds) {
            let Some(bucket) = self.buckets.get(&cell) else {
                continue;
            };
            for &slot in bucket {
                if let Some(entry) = self.entries.get(slot).copied().flatten() {
                    if entry.bounds.intersects(bounds) && seen.insert(entry.id) {
                        out.push(entry.id);
                    }
                }
            }
        }
        out
    }

    fn query_segment(&self, p0: Vec2, p1: Vec2) -> Vec<EntityId> {
        let mut out = Vec::new();
        let slots = self
            .cells_for_segment(p0, p1)
            .into_iter()
            .filter_map(|cell| self.buckets.get(&cell))
            .flatten()
            .copied();
        self.collect(slots, &mut out);
        out
    }
}
