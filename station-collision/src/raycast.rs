use station_core::{Aabb, EntityId, Vec2};

/// Result of a ray or segment query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub valid: bool,
    pub entity: Option<EntityId>,
    pub point: Vec2,
    pub normal: Vec2,
    pub distance: f32,
}

impl RaycastHit {
    pub fn miss() -> Self {
        Self {
            valid: false,
            entity: None,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            distance: f32::MAX,
        }
    }
}

impl Default for RaycastHit {
    fn default() -> Self {
        Self::miss()
    }
}

/// Slab-method ray/AABB intersection.
///
/// `direction` must be normalized; the returned distance is along it. The hit
/// normal is axis-aligned, picked by the larger offset of the hit point from
/// the rectangle's center.
pub fn ray_intersects_rect(origin: Vec2, direction: Vec2, rect: Aabb) -> Option<RaycastHit> {
    let inv = Vec2::new(1.0 / direction.x, 1.0 / direction.y);
    let min = rect.min();
    let max = rect.max();

    let t1 = (min.x - origin.x) * inv.x;
    let t2 = (max.x - origin.x) * inv.x;
    let t3 = (min.y - origin.y) * inv.y;
    let t4 = (max.y - origin.y) * inv.y;

    let tmin = t1.min(t2).max(t3.min(t4));
    let tmax = t1.max(t2).min(t3.max(t4));

    if tmax < 0.0 || tmin > tmax {
        return None;
    }

    let t = if tmin < 0.0 { tmax } else { tmin };
    if t < 0.0 {
        return None;
    }

    let point = origin + direction * t;
    let to_hit = point - rect.center();
    let normal = if to_hit.x.abs() > to_hit.y.abs() {
        Vec2::new(if to_hit.x > 0.0 { 1.0 } else { -1.0 }, 0.0)
    } else {
        Vec2::new(0.0, if to_hit.y > 0.0 { 1.0 } else { -1.0 })
    };

    Some(RaycastHit {
        valid: true,
        entity: None,
        point,
        normal,
        distance: t,
    })
}

/// Segment/AABB intersection: a bounded ray test.
pub fn segment_intersects_rect(p0: Vec2, p1: Vec2, rect: Aabb) -> Option<RaycastHit> {
    let delta = p1 - p0;
    let length = delta.length();
    if length <= f32::EPSILON {
        return None;
    }
    let hit = ray_intersects_rect(p0, delta / length, rect)?;
    (hit.distance <= length).then_some(hit)
}
