//! Axis-aligned bounding boxes

use glam::{Affine3A, Vec3};

/// Axis-Aligned Bounding Box
///
/// Stored in model space for triangles and in world space for instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Inverted box that any `grow` call replaces
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for point in points {
            aabb.grow(point);
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Transform this box by an affine, returning a new world-space box.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the box extents
    /// for an exact (tight) result without transforming all 8 corners.
    pub fn transformed(&self, affine: &Affine3A) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let translation = Vec3::from(affine.translation);
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = Vec3::from(affine.matrix3.col(i));
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        Aabb { min: new_min, max: new_max }
    }

    /// Test if this box fully contains another box.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if this box intersects (overlaps or touches) another box.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Slab test against a ray segment `[0, t_max]`.
    ///
    /// `inv_direction` is the component-wise reciprocal of the ray direction.
    /// An infinite component means the ray is parallel to that slab and only
    /// the origin is checked. Returns the entry distance (clamped to 0).
    #[inline]
    pub fn ray_entry(&self, origin: Vec3, inv_direction: Vec3, t_max: f32) -> Option<f32> {
        let mut near = 0.0f32;
        let mut far = t_max;

        for axis in 0..3 {
            let inv = inv_direction[axis];
            if inv.is_infinite() {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - origin[axis]) * inv;
            let t2 = (self.max[axis] - origin[axis]) * inv;
            near = near.max(t1.min(t2));
            far = far.min(t1.max(t2));
            if near > far {
                return None;
            }
        }

        Some(near)
    }
}
