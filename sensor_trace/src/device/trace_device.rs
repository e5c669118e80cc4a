/// TraceDevice trait - where BVH builds and batched traces execute
///
/// A device only does the heavy lifting. Validation, staleness tracking and
/// result ownership stay in the scene, so devices are interchangeable.

use crate::accel::aabb::Aabb;
use crate::accel::acceleration_index::AccelerationIndex;
use crate::accel::bvh::Bvh;
use crate::config::ContextKind;
use crate::error::Result;
use crate::sensor::{Hit, Ray};

/// Execution backend for builds and batched traces
pub trait TraceDevice: Send + Sync {
    /// Human-readable backend name (for logs)
    fn name(&self) -> &str;

    /// Context this device implements
    fn kind(&self) -> ContextKind;

    /// Build a BVH over item bounds
    ///
    /// # Errors
    ///
    /// `DeviceError` or `OutOfMemory` if the device cannot complete the build
    fn build_bvh(&self, bounds: &[Aabb], leaf_size: usize) -> Result<Bvh>;

    /// Nearest hit for every ray, in ray order
    ///
    /// # Errors
    ///
    /// `DeviceError` or `OutOfMemory` if the device cannot complete the trace
    fn trace_nearest(&self, index: &AccelerationIndex, rays: &[Ray]) -> Result<Vec<Option<Hit>>>;
}
