/// Scene - the traceable world and its query entry points
///
/// A Scene owns the geometry store, instance table, acceleration index and
/// result registry for one host. It is an explicit context object: the host
/// creates it (usually through `Engine::create_scene`), passes it by `&mut`,
/// and drops it to free everything, including unreleased results.

use std::sync::Arc;
use glam::{Affine3A, Mat4, Vec3};
use crate::accel::acceleration_manager::AccelerationManager;
use crate::config::{ContextKind, EngineConfig};
use crate::device::{self, TraceDevice};
use crate::error::Result;
use crate::geometry::{GeometryStore, MeshDesc};
use crate::math;
use crate::result::{HitBuffer, ResultHandle, ResultRegistry};
use crate::sensor::{Ray, RayGenerator, Sensor};
use super::instance_table::InstanceTable;
use super::query::QueryExecutor;
use super::stats::TraceStats;

/// Position reported by `trace_hit` when the ray hits nothing
pub const MISS_POSITION: Vec3 = Vec3::ZERO;

/// Handle and size of a registered hit buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireResult {
    pub handle: ResultHandle,
    /// Number of hit positions in the buffer
    pub count: usize,
}

pub struct Scene {
    config: EngineConfig,
    device: Arc<dyn TraceDevice>,
    store: GeometryStore,
    table: InstanceTable,
    accel: AccelerationManager,
    registry: ResultRegistry,
    generator: RayGenerator,
    stats: TraceStats,
}

impl Scene {
    /// Create an empty scene on the device matching `config.context`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let device = device::create_device(config.context);
        Ok(Self::with_device(config, device))
    }

    /// Create an empty scene on an explicit device
    pub fn with_device(config: EngineConfig, device: Arc<dyn TraceDevice>) -> Self {
        Self {
            accel: AccelerationManager::new(config.bvh_leaf_size),
            generator: RayGenerator::new(config.max_rays_per_sensor),
            config,
            device,
            store: GeometryStore::new(),
            table: InstanceTable::new(),
            registry: ResultRegistry::new(),
            stats: TraceStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device_kind(&self) -> ContextKind {
        self.device.kind()
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    // ===== SCENE MUTATION =====

    /// Replace all geometry and instances
    ///
    /// Mesh `i` becomes instance `i` with `transforms[i]` and `enabled[i]`.
    ///
    /// # Errors
    ///
    /// - `SizeMismatch` if the three arrays differ in length
    /// - `InvalidTransform` if a matrix is not affine
    /// - `InvalidGeometry` if a mesh is malformed
    ///
    /// Nothing changes on error.
    pub fn set_scene(&mut self, meshes: &[MeshDesc], transforms: &[Mat4], enabled: &[bool]) -> Result<()> {
        if transforms.len() != meshes.len() || enabled.len() != meshes.len() {
            crate::engine_bail!("sensortrace::Scene", SizeMismatch,
                "{} meshes, {} transforms, {} enabled flags",
                meshes.len(), transforms.len(), enabled.len());
        }
        let transforms = narrow_all(transforms)?;
        let models = GeometryStore::prepare(meshes, self.device.as_ref(), self.config.bvh_leaf_size)?;

        let keys = self.store.replace(models);
        self.table.replace(keys, transforms, enabled)?;

        crate::engine_debug!("sensortrace::Scene",
            "Scene set: {} instances ({} enabled)", self.table.len(), self.table.enabled_count());
        Ok(())
    }

    /// Overwrite the transforms of the listed instances
    ///
    /// # Errors
    ///
    /// `SizeMismatch`, `IndexOutOfRange` or `InvalidTransform`; nothing is
    /// written on error.
    pub fn update_transforms(&mut self, indices: &[usize], transforms: &[Mat4]) -> Result<()> {
        let transforms = narrow_all(transforms)?;
        self.table.update_transforms(indices, &transforms)
    }

    /// Overwrite the enabled flag of the listed instances
    ///
    /// # Errors
    ///
    /// `SizeMismatch` or `IndexOutOfRange`; nothing is written on error.
    pub fn update_enabled(&mut self, indices: &[usize], enabled: &[bool]) -> Result<()> {
        self.table.update_enabled(indices, enabled)
    }

    /// Enable exactly the instances whose translation lies strictly within
    /// `max_distance` of `origin`, disabling the rest.
    ///
    /// Returns how many flags changed. Only changed flags are written.
    ///
    /// # Errors
    ///
    /// `InvalidSensorParams` for a non-finite origin or a negative or
    /// non-finite distance
    pub fn enable_within_distance(&mut self, origin: Vec3, max_distance: f32) -> Result<usize> {
        if !origin.is_finite() || !max_distance.is_finite() || max_distance < 0.0 {
            crate::engine_bail!("sensortrace::Scene", InvalidSensorParams,
                "invalid activation sphere {:?} / {}", origin, max_distance);
        }

        let (indices, flags): (Vec<usize>, Vec<bool>) = self.table
            .transforms()
            .iter()
            .enumerate()
            .filter_map(|(index, transform)| {
                let inside = math::translation(transform).distance(origin) < max_distance;
                (inside != self.table.is_enabled(index)).then_some((index, inside))
            })
            .unzip();

        if !indices.is_empty() {
            self.table.update_enabled(&indices, &flags)?;
        }
        Ok(indices.len())
    }

    // ===== SENSOR QUERIES =====

    /// Fire every sensor and keep the hit positions in a new result buffer
    ///
    /// Returns `None` without side effects when there are no sensors or no
    /// instances. A scene whose instances are all disabled is traced and
    /// yields an empty buffer.
    ///
    /// # Errors
    ///
    /// `InvalidSensorParams` for a bad sensor, device errors from the
    /// rebuild or trace.
    pub fn fire_positions(&mut self, sensors: &[Sensor]) -> Result<Option<FireResult>> {
        self.validate_sensors(sensors)?;
        if sensors.is_empty() || self.table.is_empty() {
            return Ok(None);
        }

        let batch = self.generator.generate_batch(sensors)?;
        let index = self.accel.ensure_built(&mut self.table, &self.store, self.device.as_ref(), &mut self.stats)?;
        let traced = QueryExecutor::new(self.device.as_ref(), index).trace_batch(&batch)?;

        let count = traced.positions.len();
        self.stats.record_trace(traced.rays, count);
        let handle = self.registry.register(HitBuffer::new(traced.positions, self.config.residency));

        crate::engine_trace!("sensortrace::Scene",
            "Fired {} sensors: {} rays, {} hits", sensors.len(), traced.rays, count);
        Ok(Some(FireResult { handle, count }))
    }

    /// Fire every sensor and write its hit total into `counts_out`
    ///
    /// Returns `false` without side effects when there are no sensors or no
    /// instances.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if `counts_out.len() != sensors.len()`, otherwise as
    /// `fire_positions`. `counts_out` is untouched on error.
    pub fn fire_counts(&mut self, sensors: &[Sensor], counts_out: &mut [usize]) -> Result<bool> {
        if counts_out.len() != sensors.len() {
            crate::engine_bail!("sensortrace::Scene", SizeMismatch,
                "{} count slots for {} sensors", counts_out.len(), sensors.len());
        }
        self.validate_sensors(sensors)?;
        if sensors.is_empty() || self.table.is_empty() {
            return Ok(false);
        }

        let batch = self.generator.generate_batch(sensors)?;
        let index = self.accel.ensure_built(&mut self.table, &self.store, self.device.as_ref(), &mut self.stats)?;
        let traced = QueryExecutor::new(self.device.as_ref(), index).trace_batch(&batch)?;

        self.stats.record_trace(traced.rays, traced.positions.len());
        counts_out.copy_from_slice(&traced.counts);
        Ok(true)
    }

    fn validate_sensors(&self, sensors: &[Sensor]) -> Result<()> {
        for sensor in sensors {
            sensor.grid(self.config.max_rays_per_sensor)?;
        }
        Ok(())
    }

    // ===== SINGLE RAY QUERIES =====

    /// Whether a ray hits anything within `max_distance`
    ///
    /// # Errors
    ///
    /// `InvalidSensorParams` for a zero direction or a non-positive distance
    pub fn check_hit(&mut self, origin: Vec3, direction: Vec3, max_distance: f32) -> Result<bool> {
        let ray = Ray::checked(origin, direction, max_distance)?;
        if self.table.is_empty() {
            return Ok(false);
        }
        let index = self.accel.ensure_built(&mut self.table, &self.store, self.device.as_ref(), &mut self.stats)?;
        let hit = QueryExecutor::new(self.device.as_ref(), index).any_hit(&ray);
        self.stats.record_trace(1, usize::from(hit));
        Ok(hit)
    }

    /// Nearest hit position, or `None` on a miss
    pub fn try_trace_hit(&mut self, origin: Vec3, direction: Vec3, max_distance: f32) -> Result<Option<Vec3>> {
        let ray = Ray::checked(origin, direction, max_distance)?;
        if self.table.is_empty() {
            return Ok(None);
        }
        let index = self.accel.ensure_built(&mut self.table, &self.store, self.device.as_ref(), &mut self.stats)?;
        let hit = QueryExecutor::new(self.device.as_ref(), index).nearest(&ray);
        self.stats.record_trace(1, usize::from(hit.is_some()));
        Ok(hit.map(|hit| hit.position))
    }

    /// Nearest hit position, `MISS_POSITION` on a miss
    pub fn trace_hit(&mut self, origin: Vec3, direction: Vec3, max_distance: f32) -> Result<Vec3> {
        Ok(self.try_trace_hit(origin, direction, max_distance)?.unwrap_or(MISS_POSITION))
    }

    // ===== RESULTS =====

    /// Buffer behind a live handle
    pub fn result(&self, handle: ResultHandle) -> Result<&HitBuffer> {
        self.registry.get(handle)
    }

    /// View the positions of a host-visible result
    ///
    /// # Errors
    ///
    /// `UnknownHandle`, or `BufferNotHostVisible` for device-only results
    pub fn positions(&self, handle: ResultHandle) -> Result<&[Vec3]> {
        self.registry.get(handle)?.positions()
    }

    /// Copy the positions of a result, whatever its residency
    pub fn read_back(&self, handle: ResultHandle) -> Result<Vec<Vec3>> {
        Ok(self.registry.get(handle)?.read_back())
    }

    /// Free a result. `true` once, then `false`.
    pub fn release_result(&mut self, handle: ResultHandle) -> bool {
        self.registry.release(handle)
    }

    /// Results awaiting release
    pub fn live_results(&self) -> usize {
        self.registry.live_count()
    }

    // ===== INTROSPECTION =====

    pub fn instance_count(&self) -> usize {
        self.table.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.table.enabled_count()
    }

    pub fn model_count(&self) -> usize {
        self.store.len()
    }

    pub fn instances(&self) -> &InstanceTable {
        &self.table
    }

    /// Incremented by every successful mutation
    pub fn generation(&self) -> u64 {
        self.table.generation()
    }

    /// Whether the next query will rebuild the acceleration index
    pub fn is_index_stale(&self) -> bool {
        self.accel.is_stale(&self.table)
    }

    pub fn stats(&self) -> &TraceStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TraceStats::default();
    }
}

/// Narrow every 4x4 matrix, failing on the first non-affine one
fn narrow_all(transforms: &[Mat4]) -> Result<Vec<Affine3A>> {
    transforms.iter().map(math::affine_from_mat4).collect()
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
