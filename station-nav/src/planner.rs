use core::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use station_collision::CollisionWorld;
use station_core::{layer, Aabb, EntityId, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavConfig {
    /// Side of one search cell, world units.
    pub grid_size: f32,
    pub max_iterations: u32,
    pub diagonal: bool,
    pub diag_cost: f32,
    /// Hard cap on accumulated path cost, in cells.
    pub max_path_length: f32,
    pub obstacle_mask: u32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            grid_size: 32.0,
            max_iterations: 1000,
            diagonal: true,
            diag_cost: core::f32::consts::SQRT_2,
            max_path_length: 1000.0,
            obstacle_mask: layer::ALL,
        }
    }
}

impl NavConfig {
    /// Clamp every field into its valid domain.
    pub fn sanitized(mut self) -> Self {
        self.grid_size = self.grid_size.max(1e-3);
        self.max_iterations = self.max_iterations.max(1);
        self.diag_cost = self.diag_cost.max(1.0);
        self.max_path_length = self.max_path_length.max(0.0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathResult {
    pub waypoints: Vec<Vec2>,
    pub success: bool,
    pub cost: f32,
    pub iterations: u32,
}

impl PathResult {
    fn failure(iterations: u32) -> Self {
        Self {
            waypoints: Vec::new(),
            success: false,
            cost: 0.0,
            iterations,
        }
    }
}

type Cell = (i32, i32);

#[derive(Debug, Clone, Copy)]
struct PathNode {
    cell: Cell,
    g: f32,
    parent: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f32,
    g: f32,
    cell: Cell,
    node: u32,
    tie: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other
            .f
            .total_cmp(&self.f)
            .then(other.g.total_cmp(&self.g))
            .then(other.cell.cmp(&self.cell))
            .then(other.tie.cmp(&self.tie))
    }
}

/// A* planner over the infinite integer lattice.
///
/// Working nodes live in a flat arena with index parent links; the arena is
/// cleared at the end of every call.
#[derive(Debug)]
pub struct NavPlanner {
    config: NavConfig,
    nodes: Vec<PathNode>,
}

impl NavPlanner {
    pub fn new(config: NavConfig) -> Self {
        Self {
            config: config.sanitized(),
            nodes: Vec::new(),
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn world_to_grid(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x / self.config.grid_size).floor() as i32,
            (p.y / self.config.grid_size).floor() as i32,
        )
    }

    pub fn grid_to_world(&self, cell: (i32, i32)) -> Vec2 {
        Vec2::new(
            (cell.0 as f32 + 0.5) * self.config.grid_size,
            (cell.1 as f32 + 0.5) * self.config.grid_size,
        )
    }

    /// True when the straight segment crosses no obstacle under the mask.
    pub fn is_path_clear(
        &self,
        start: Vec2,
        goal: Vec2,
        world: &CollisionWorld,
        exclude: Option<EntityId>,
    ) -> bool {
        !world.segment_intersects_any(start, goal, exclude, self.config.obstacle_mask)
    }

    fn is_walkable(&self, cell: Cell, world: &CollisionWorld, mover: Option<EntityId>) -> bool {
        let probe = Aabb::from_center(
            self.grid_to_world(cell),
            Vec2::splat(self.config.grid_size),
        );
        world
            .first_for_bounds(probe, mover, self.config.obstacle_mask)
            .is_none()
    }

    fn heuristic(&self, a: Cell, b: Cell) -> f32 {
        let dx = (a.0 - b.0).abs() as f32;
        let dy = (a.1 - b.1).abs() as f32;
        if self.config.diagonal {
            dx.max(dy) + (self.config.diag_cost - 1.0) * dx.min(dy)
        } else {
            dx + dy
        }
    }

    fn neighbors(&self, cell: Cell, out: &mut Vec<(Cell, f32)>) {
        out.clear();
        // Fixed order for determinism: N, E, S, W, then diagonals.
        out.push(((cell.0, cell.1 - 1), 1.0));
        out.push(((cell.0 + 1, cell.1), 1.0));
        out.push(((cell.0, cell.1 + 1), 1.0));
        out.push(((cell.0 - 1, cell.1), 1.0));
        if self.config.diagonal {
            let d = self.config.diag_cost;
            out.push(((cell.0 + 1, cell.1 - 1), d));
            out.push(((cell.0 + 1, cell.1 + 1), d));
            out.push(((cell.0 - 1, cell.1 + 1), d));
            out.push(((cell.0 - 1, cell.1 - 1), d));
        }
    }

    /// Plan a path from `start` to `goal`, treating `mover`'s own collider as
    /// pass-through.
    pub fn find_path(
        &mut self,
        start: Vec2,
        goal: Vec2,
        world: &CollisionWorld,
        mover: Option<EntityId>,
    ) -> PathResult {
        if self.is_path_clear(start, goal, world, mover) {
            return PathResult {
                waypoints: vec![start, goal],
                success: true,
                cost: start.distance(goal),
                iterations: 1,
            };
        }

        let start_cell = self.world_to_grid(start);
        let goal_cell = self.world_to_grid(goal);

        self.nodes.clear();
        let mut open = BinaryHeap::new();
        let mut best: BTreeMap<Cell, u32> = BTreeMap::new();
        let mut scratch = Vec::with_capacity(8);
        let mut tie: u64 = 0;

        self.nodes.push(PathNode {
            cell: start_cell,
            g: 0.0,
            parent: None,
        });
        best.insert(start_cell, 0);
        open.push(OpenNode {
            f: self.heuristic(start_cell, goal_cell),
            g: 0.0,
            cell: start_cell,
            node: 0,
            tie,
        });
        tie += 1;

        let mut iterations: u32 = 0;
        let mut goal_node: Option<u32> = None;

        while let Some(top) = open.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                break;
            }
            // A better route to this cell was found after this entry was
            // queued.
            if best.get(&top.cell) != Some(&top.node) {
                continue;
            }
            if top.cell == goal_cell {
                goal_node = Some(top.node);
                break;
            }

            self.neighbors(top.cell, &mut scratch);
            for &(cell, step_cost) in &scratch {
                if !self.is_walkable(cell, world, mover) {
                    continue;
                }
                let tentative = top.g + step_cost;
                if tentative > self.config.max_path_length {
                    continue;
                }
                if let Some(&existing) = best.get(&cell) {
                    if self.nodes[existing as usize].g <= tentative {
                        continue;
                    }
                }

                let id = self.nodes.len() as u32;
                self.nodes.push(PathNode {
                    cell,
                    g: tentative,
                    parent: Some(top.node),
                });
                best.insert(cell, id);
                open.push(OpenNode {
                    f: tentative + self.heuristic(cell, goal_cell),
                    g: tentative,
                    cell,
                    node: id,
                    tie,
                });
                tie += 1;
            }
        }

        let result = match goal_node {
            Some(goal_idx) => {
                let cost = self.nodes[goal_idx as usize].g;
                let mut waypoints = self.reconstruct(goal_idx);
                if waypoints.len() < 2 {
                    // Start and goal share a cell.
                    waypoints = vec![start, goal];
                } else {
                    waypoints[0] = start;
                    let last = waypoints.len() - 1;
                    waypoints[last] = goal;
                    waypoints = self.smooth(waypoints, world, mover);
                }
                PathResult {
                    waypoints,
                    success: true,
                    cost,
                    iterations,
                }
            }
            None => PathResult::failure(iterations),
        };

        self.nodes.clear();
        result
    }

    fn reconstruct(&self, goal_idx: u32) -> Vec<Vec2> {
        let mut cells = Vec::new();
        let mut current = Some(goal_idx);
        while let Some(idx) = current {
            let node = self.nodes[idx as usize];
            cells.push(node.cell);
            current = node.parent;
        }
        cells.reverse();
        cells.into_iter().map(|c| self.grid_to_world(c)).collect()
    }

    /// Greedy line-of-sight reduction: keep only waypoints that cannot be
    /// skipped by a clear straight segment.
    pub fn smooth(
        &self,
        path: Vec<Vec2>,
        world: &CollisionWorld,
        mover: Option<EntityId>,
    ) -> Vec<Vec2> {
        if path.len() <= 2 {
            return path;
        }

        let mut out = vec![path[0]];
        let mut i = 0;
        while i < path.len() - 1 {
            let mut farthest = i + 1;
            for j in (i + 2)..path.len() {
                if self.is_path_clear(path[i], path[j], world, mover) {
                    farthest = j;
                } else {
                    break;
                }
            }
            out.push(path[farthest]);
            i = farthest;
        }
        out
    }
}

impl Default for NavPlanner {
    fn default() -> Self {
        Self::new(NavConfig::default())
    }
}
