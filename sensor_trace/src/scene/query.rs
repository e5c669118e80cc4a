/// QueryExecutor - traces ray batches and single rays against an index
///
/// Batches go through the scene's device; single rays are answered on the
/// calling thread. Every ray is independent and yields at most one hit.

use glam::Vec3;
use crate::accel::acceleration_index::AccelerationIndex;
use crate::device::TraceDevice;
use crate::error::Result;
use crate::sensor::{Hit, Ray, SensorBatch};

/// Outcome of a traced sensor batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchHits {
    /// Hit positions in ray order (misses skipped)
    pub positions: Vec<Vec3>,
    /// Hits per sensor, in sensor order
    pub counts: Vec<usize>,
    /// Rays traced
    pub rays: usize,
}

pub struct QueryExecutor<'a> {
    device: &'a dyn TraceDevice,
    index: &'a AccelerationIndex,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(device: &'a dyn TraceDevice, index: &'a AccelerationIndex) -> Self {
        Self { device, index }
    }

    /// Nearest hit per ray, in ray order
    pub fn trace(&self, rays: &[Ray]) -> Result<Vec<Option<Hit>>> {
        if rays.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self.device.trace_nearest(self.index, rays)?;
        if hits.len() != rays.len() {
            crate::engine_bail!("sensortrace::QueryExecutor", DeviceError,
                "device '{}' returned {} results for {} rays",
                self.device.name(), hits.len(), rays.len());
        }
        Ok(hits)
    }

    /// Trace a sensor batch, collecting positions and per-sensor counts
    pub fn trace_batch(&self, batch: &SensorBatch) -> Result<BatchHits> {
        let hits = self.trace(batch.rays())?;

        let counts = batch
            .ranges()
            .iter()
            .map(|range| hits[range.clone()].iter().filter(|hit| hit.is_some()).count())
            .collect();
        let positions = hits.iter().flatten().map(|hit| hit.position).collect();

        Ok(BatchHits { positions, counts, rays: hits.len() })
    }

    /// Nearest hit of one ray
    pub fn nearest(&self, ray: &Ray) -> Option<Hit> {
        self.index.intersect_one(ray)
    }

    /// Whether one ray hits anything
    pub fn any_hit(&self, ray: &Ray) -> bool {
        self.index.occluded(ray)
    }
}
