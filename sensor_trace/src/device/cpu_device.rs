/// Serial CPU device

use crate::accel::aabb::Aabb;
use crate::accel::acceleration_index::AccelerationIndex;
use crate::accel::bvh::Bvh;
use crate::config::ContextKind;
use crate::error::Result;
use crate::sensor::{Hit, Ray};
use super::trace_device::TraceDevice;

/// Traces every ray on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuDevice;

impl CpuDevice {
    pub fn new() -> Self {
        Self
    }
}

impl TraceDevice for CpuDevice {
    fn name(&self) -> &str {
        "cpu"
    }

    fn kind(&self) -> ContextKind {
        ContextKind::Cpu
    }

    fn build_bvh(&self, bounds: &[Aabb], leaf_size: usize) -> Result<Bvh> {
        Ok(Bvh::build(bounds, leaf_size))
    }

    fn trace_nearest(&self, index: &AccelerationIndex, rays: &[Ray]) -> Result<Vec<Option<Hit>>> {
        Ok(rays.iter().map(|ray| index.intersect_one(ray)).collect())
    }
}
