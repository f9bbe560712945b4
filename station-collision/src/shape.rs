use station_core::{Aabb, EntityId, EntitySnapshot, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collision shape variants.
///
/// Circles participate through their enclosing box; the narrow phase is AABB
/// everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    Rect { size: Vec2 },
    Circle { radius: f32 },
}

impl Shape {
    /// World bounds of this shape anchored at `origin` (the owner's position
    /// plus the shape offset). Rectangles hang from the top-left corner,
    /// circles are centered.
    pub fn bounds(self, origin: Vec2) -> Aabb {
        match self {
            Shape::Rect { size } => Aabb::new(origin, size),
            Shape::Circle { radius } => Aabb::from_center(origin, Vec2::splat(radius * 2.0)),
        }
    }
}

/// One named shape within a collider.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColliderShape {
    pub name: String,
    pub offset: Vec2,
    pub is_trigger: bool,
    pub shape: Shape,
}

impl ColliderShape {
    pub fn solid_rect(size: Vec2) -> Self {
        Self {
            name: String::new(),
            offset: Vec2::ZERO,
            is_trigger: false,
            shape: Shape::Rect { size },
        }
    }

    pub fn named(name: impl Into<String>, shape: Shape, offset: Vec2, is_trigger: bool) -> Self {
        Self {
            name: name.into(),
            offset,
            is_trigger,
            shape,
        }
    }

    pub fn world_bounds(&self, owner_position: Vec2) -> Aabb {
        self.shape.bounds(owner_position + self.offset)
    }
}

/// Collision volume of one entity: its position snapshot, layer, and shapes.
///
/// Exactly one collider exists per entity; the world enforces this by keying
/// colliders on the owner handle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collider {
    pub owner: EntityId,
    pub position: Vec2,
    pub layer: u32,
    pub shapes: Vec<ColliderShape>,
}

impl Collider {
    /// Legacy single-rectangle collider covering `bounds`.
    pub fn from_bounds(snapshot: &EntitySnapshot, bounds: Aabb) -> Self {
        Self {
            owner: snapshot.id,
            position: bounds.position,
            layer: snapshot.layer,
            shapes: vec![ColliderShape::solid_rect(bounds.size)],
        }
    }

    pub fn from_shapes(snapshot: &EntitySnapshot, shapes: Vec<ColliderShape>) -> Self {
        Self {
            owner: snapshot.id,
            position: snapshot.position,
            layer: snapshot.layer,
            shapes,
        }
    }

    /// Union of all shape bounds. A collider with no shapes degenerates to a
    /// point at its position.
    pub fn bounds(&self) -> Aabb {
        let mut iter = self.shapes.iter();
        let Some(first) = iter.next() else {
            return Aabb::new(self.position, Vec2::ZERO);
        };
        let mut out = first.world_bounds(self.position);
        for shape in iter {
            out = out.union(shape.world_bounds(self.position));
        }
        out
    }

    pub fn shape(&self, name: &str) -> Option<&ColliderShape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    pub fn shape_bounds(&self, name: &str) -> Option<Aabb> {
        self.shape(name).map(|s| s.world_bounds(self.position))
    }

    /// Trigger flag of the first shape whose world bounds touch `region`.
    pub fn is_trigger_for(&self, region: &Aabb) -> bool {
        self.shapes
            .iter()
            .find(|s| s.world_bounds(self.position).intersects(*region))
            .map(|s| s.is_trigger)
            .unwrap_or(false)
    }
}
