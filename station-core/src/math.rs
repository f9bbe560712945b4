use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 2-D vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector, or `ZERO` when the input is too short to normalize.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self / len
        }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounding box stored as top-left corner + extent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub position: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            position: center - size * 0.5,
            size,
        }
    }

    pub fn min(self) -> Vec2 {
        self.position
    }

    pub fn max(self) -> Vec2 {
        self.position + self.size
    }

    pub fn center(self) -> Vec2 {
        self.position + self.size * 0.5
    }

    pub fn contains_point(self, p: Vec2) -> bool {
        let min = self.min();
        let max = self.max();
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }

    pub fn intersects(self, other: Self) -> bool {
        let a_min = self.min();
        let a_max = self.max();
        let b_min = other.min();
        let b_max = other.max();
        a_min.x < b_max.x && b_min.x < a_max.x && a_min.y < b_max.y && b_min.y < a_max.y
    }

    /// Overlap region of two boxes, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let min = Vec2::new(
            self.min().x.max(other.min().x),
            self.min().y.max(other.min().y),
        );
        let max = Vec2::new(
            self.max().x.min(other.max().x),
            self.max().y.min(other.max().y),
        );
        if min.x < max.x && min.y < max.y {
            Some(Self::new(min, max - min))
        } else {
            None
        }
    }

    pub fn union(self, other: Self) -> Self {
        let min = Vec2::new(
            self.min().x.min(other.min().x),
            self.min().y.min(other.min().y),
        );
        let max = Vec2::new(
            self.max().x.max(other.max().x),
            self.max().y.max(other.max().y),
        );
        Self::new(min, max - min)
    }

    /// Enlarge the box to cover every position it would occupy while being
    /// displaced by `delta`.
    pub fn expanded_toward(self, delta: Vec2) -> Self {
        let mut out = self;
        if delta.x < 0.0 {
            out.position.x += delta.x;
            out.size.x -= delta.x;
        } else {
            out.size.x += delta.x;
        }
        if delta.y < 0.0 {
            out.position.y += delta.y;
            out.size.y -= delta.y;
        } else {
            out.size.y += delta.y;
        }
        out
    }
}
