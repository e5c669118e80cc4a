//! Rays and hits

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use crate::error::Result;

/// A ray segment `origin + t * direction`, `t` in `[0, max_distance]`
///
/// `#[repr(C)]` plain data (7 floats) so a batch can be handed to a device
/// as bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    pub max_distance: f32,
}

impl Ray {
    /// Build a ray from trusted values (direction already normalized)
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self { origin, direction, max_distance }
    }

    /// Build a ray from caller input, normalizing the direction.
    ///
    /// # Errors
    ///
    /// `InvalidSensorParams` for a non-finite origin, a zero-length or
    /// non-finite direction, or a non-positive or non-finite `max_distance`.
    pub fn checked(origin: Vec3, direction: Vec3, max_distance: f32) -> Result<Self> {
        if !origin.is_finite() {
            crate::engine_bail!("sensortrace::Ray", InvalidSensorParams,
                "ray origin {:?} is not finite", origin);
        }
        let direction = match direction.try_normalize() {
            Some(direction) => direction,
            None => crate::engine_bail!("sensortrace::Ray", InvalidSensorParams,
                "ray direction {:?} cannot be normalized", direction),
        };
        if !max_distance.is_finite() || max_distance <= 0.0 {
            crate::engine_bail!("sensortrace::Ray", InvalidSensorParams,
                "max distance must be positive and finite, got {}", max_distance);
        }
        Ok(Self::new(origin, direction, max_distance))
    }

    /// Point at distance `t` along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Nearest intersection of one ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance along the ray
    pub t: f32,
    /// World-space hit position
    pub position: Vec3,
    /// Instance table index of the hit instance
    pub instance: u32,
    /// Triangle index within the instance's model
    pub triangle: u32,
}
