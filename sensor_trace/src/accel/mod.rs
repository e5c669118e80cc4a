//! Acceleration module
//!
//! Bounding boxes, the BVH shared by both index levels, the two-level
//! acceleration index and the manager that rebuilds it when stale.

pub(crate) mod aabb;
pub(crate) mod bvh;
pub(crate) mod acceleration_index;
pub(crate) mod acceleration_manager;

pub use aabb::Aabb;
pub use bvh::{Bvh, BvhNode};
pub use acceleration_index::{AccelerationIndex, IndexedInstance};
pub use acceleration_manager::AccelerationManager;
