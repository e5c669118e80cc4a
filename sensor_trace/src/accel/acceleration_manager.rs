/// AccelerationManager - keeps the acceleration index in step with the table
///
/// The index is brought up to date lazily, at the start of the first query
/// after a mutation. When only transforms changed, the moved instances are
/// refitted in place; anything else rebuilds from exactly the enabled
/// instances in table order. A rebuild is built off to the side and only
/// swapped in on success: when the device fails, the previous index is kept
/// and the table stays stale.

use std::sync::Arc;
use std::time::Instant;
use crate::device::TraceDevice;
use crate::error::Result;
use crate::geometry::GeometryStore;
use crate::math;
use crate::scene::{InstanceTable, TraceStats};
use super::aabb::Aabb;
use super::acceleration_index::{AccelerationIndex, IndexedInstance};

/// Largest share of the indexed instances that may move before a refit
/// gives way to a full rebuild
const REFIT_MAX_MOVED_FRACTION: f32 = 0.5;

pub struct AccelerationManager {
    index: Option<AccelerationIndex>,
    leaf_size: usize,
}

impl AccelerationManager {
    pub fn new(leaf_size: usize) -> Self {
        Self { index: None, leaf_size: leaf_size.max(1) }
    }

    /// Whether the next query must refit or rebuild
    pub fn is_stale(&self, table: &InstanceTable) -> bool {
        self.index
            .as_ref()
            .map_or(true, |index| index.generation() != table.generation())
    }

    /// Refit or rebuild if stale, then return the index
    ///
    /// # Errors
    ///
    /// Device errors from the build. The previous index stays in place.
    pub fn ensure_built(
        &mut self,
        table: &mut InstanceTable,
        store: &GeometryStore,
        device: &dyn TraceDevice,
        stats: &mut TraceStats,
    ) -> Result<&AccelerationIndex> {
        if self.is_stale(table) {
            let started = Instant::now();
            let moved = table.dirty().len();

            let refitted = match self.index.as_mut() {
                Some(index) if Self::can_refit(index, table) => index.refit(table),
                _ => false,
            };

            if refitted {
                let elapsed = started.elapsed();
                crate::engine_debug!("sensortrace::AccelerationManager",
                    "Refitted index: {} instances moved, {:?}", moved, elapsed);
                stats.record_refit(elapsed);
            } else {
                let index = Self::build(table, store, device, self.leaf_size)?;
                let elapsed = started.elapsed();
                crate::engine_debug!("sensortrace::AccelerationManager",
                    "Rebuilt index on '{}': {} of {} instances traceable, {:?}",
                    device.name(), index.instance_count(), table.len(), elapsed);
                stats.record_build(index.instance_count(), elapsed);
                self.index = Some(index);
            }
            table.clear_dirty();
        }

        match &self.index {
            Some(index) => Ok(index),
            None => Err(crate::engine_err!("sensortrace::AccelerationManager", DeviceError,
                "acceleration index missing after build")),
        }
    }

    fn can_refit(index: &AccelerationIndex, table: &InstanceTable) -> bool {
        !table.topology_changed()
            && table.dirty().len() as f32 <= index.instance_count() as f32 * REFIT_MAX_MOVED_FRACTION
    }

    /// Build a fresh index from the enabled instances without touching any
    /// cached state
    pub fn build(
        table: &InstanceTable,
        store: &GeometryStore,
        device: &dyn TraceDevice,
        leaf_size: usize,
    ) -> Result<AccelerationIndex> {
        let mut instances = Vec::with_capacity(table.enabled_count());

        for (index, key, transform) in table.iter_enabled() {
            let model = match store.get(key) {
                Some(model) => model,
                None => crate::engine_bail!("sensortrace::AccelerationManager", InvalidGeometry,
                    "instance {} references a model that is not stored", index),
            };
            if model.triangle_count() == 0 {
                continue;
            }
            if !math::is_invertible(transform) {
                crate::engine_warn!("sensortrace::AccelerationManager",
                    "Instance {} has a singular transform and cannot be hit", index);
                continue;
            }

            instances.push(IndexedInstance {
                instance: index as u32,
                model: Arc::clone(model),
                world_to_local: transform.inverse(),
                bounds: model.bounds().transformed(transform),
            });
        }

        let bounds: Vec<Aabb> = instances.iter().map(|instance| instance.bounds).collect();
        let tlas = device.build_bvh(&bounds, leaf_size)?;
        Ok(AccelerationIndex::new(instances, tlas, table.generation()))
    }
}

#[cfg(test)]
#[path = "acceleration_manager_tests.rs"]
mod tests;
