use station_core::{Aabb, EntityId, Vec2};

use crate::world::CollisionWorld;

pub const DEFAULT_MAX_STEPS: u32 = 4;

const MIN_DISPLACEMENT: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// Stop at the last free position.
    Block,
    /// Project the remaining displacement along the contact surface.
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementResult {
    pub final_pos: Vec2,
    pub collision_occurred: bool,
    pub was_blocked: bool,
    pub did_slide: bool,
    pub normal: Vec2,
}

impl MovementResult {
    fn at(pos: Vec2) -> Self {
        Self {
            final_pos: pos,
            collision_occurred: false,
            was_blocked: false,
            did_slide: false,
            normal: Vec2::ZERO,
        }
    }
}

/// Commit a desired displacement against the collision world.
///
/// The displacement is subdivided into `max_steps` swept probes so a fast
/// mover cannot tunnel through a thin collider in one frame.
pub fn compute_move(
    world: &CollisionWorld,
    mover: EntityId,
    current: Vec2,
    size: Vec2,
    intended: Vec2,
    mode: MoveMode,
    max_steps: u32,
    mask: u32,
) -> MovementResult {
    let mut result = MovementResult::at(current);

    let delta = intended - current;
    if delta.x.abs() < MIN_DISPLACEMENT && delta.y.abs() < MIN_DISPLACEMENT {
        return result;
    }

    let steps = max_steps.max(1);
    let step = delta / steps as f32;
    let mut contact: Option<(Aabb, Aabb)> = None;

    let mut pos = current;
    for _ in 0..steps {
        let next = pos + step;
        let test = Aabb::new(next, size);
        if let Some(hit) = world.first_for_bounds(test, Some(mover), mask) {
            result.collision_occurred = true;
            contact = world.collider(hit).map(|c| (test, c.bounds()));
            break;
        }
        pos = next;
        result.final_pos = pos;
    }

    if !result.collision_occurred {
        result.final_pos = intended;
        return result;
    }

    if let Some((test, other)) = contact {
        result.normal = contact_normal(test, other);
    }

    if mode == MoveMode::Slide {
        let remaining = intended - result.final_pos;
        let slide = remaining - result.normal * remaining.dot(result.normal);
        if slide.x.abs() >= MIN_DISPLACEMENT || slide.y.abs() >= MIN_DISPLACEMENT {
            let destination = result.final_pos + slide;
            let free = world
                .first_for_bounds(Aabb::new(destination, size), Some(mover), mask)
                .is_none();
            if free {
                result.final_pos = destination;
                result.did_slide = true;
            }
        }
    }

    result.was_blocked = !result.did_slide;
    result
}

/// Face normal of the contact, named by the smallest of the four overlap
/// magnitudes.
fn contact_normal(entity: Aabb, other: Aabb) -> Vec2 {
    let left = entity.max().x - other.min().x;
    let right = other.max().x - entity.min().x;
    let top = entity.max().y - other.min().y;
    let bottom = other.max().y - entity.min().y;

    let min = left.min(right).min(top).min(bottom);
    if min == left {
        Vec2::new(-1.0, 0.0)
    } else if min == right {
        Vec2::new(1.0, 0.0)
    } else if min == top {
        Vec2::new(0.0, -1.0)
    } else {
        Vec2::new(0.0, 1.0)
    }
}
