/// Data-parallel device (rayon)
///
/// Rays are independent, so a batch is split across the global rayon pool.
/// Morton keys for BVH builds are computed in parallel as well; the sort and
/// tree emission are shared with the serial path. Work never outlives the
/// call.

use rayon::prelude::*;
use crate::accel::aabb::Aabb;
use crate::accel::acceleration_index::AccelerationIndex;
use crate::accel::bvh::{self, Bvh};
use crate::config::ContextKind;
use crate::error::Result;
use crate::sensor::{Hit, Ray};
use super::trace_device::TraceDevice;

/// Batches smaller than this are traced serially
const MIN_PARALLEL_BATCH: usize = 256;

#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelDevice;

impl ParallelDevice {
    pub fn new() -> Self {
        Self
    }
}

impl TraceDevice for ParallelDevice {
    fn name(&self) -> &str {
        "parallel (rayon)"
    }

    fn kind(&self) -> ContextKind {
        ContextKind::Accelerated
    }

    fn build_bvh(&self, bounds: &[Aabb], leaf_size: usize) -> Result<Bvh> {
        let frame = bvh::centroid_bounds(bounds);
        let keys: Vec<u64> = bounds
            .par_iter()
            .enumerate()
            .map(|(item, aabb)| bvh::morton_key(&frame, aabb.center(), item as u32))
            .collect();
        Ok(Bvh::from_keys(bounds, keys, leaf_size))
    }

    fn trace_nearest(&self, index: &AccelerationIndex, rays: &[Ray]) -> Result<Vec<Option<Hit>>> {
        if rays.len() < MIN_PARALLEL_BATCH {
            return Ok(rays.iter().map(|ray| index.intersect_one(ray)).collect());
        }
        Ok(rays.par_iter().map(|ray| index.intersect_one(ray)).collect())
    }
}
