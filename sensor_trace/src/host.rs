/// HostSession - the host boundary, call for call
///
/// Hosts that cannot hold Rust types (engines, scripting layers) talk to the
/// core through these nine operations. Counts and indices cross as `i32`,
/// transforms as column-major `[f32; 16]`, flags as nonzero `i32`. A count is
/// an assertion about the slices that follow it: a negative count or a slice
/// shorter than the count fails with `SizeMismatch`, and only the first
/// `count` elements of a longer slice are read.

use glam::{Mat4, Vec3};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::geometry::MeshDesc;
use crate::result::ResultHandle;
use crate::scene::{FireResult, Scene};
use crate::sensor::Sensor;

pub struct HostSession {
    scene: Scene,
    /// Sensors fired by `fire_and_return_positions`
    sensors: Vec<Sensor>,
}

impl HostSession {
    pub fn new(scene: Scene) -> Self {
        Self { scene, sensors: Vec::new() }
    }

    /// Session over a new scene from the initialized engine
    pub fn from_engine() -> Result<Self> {
        Ok(Self::new(Engine::create_scene()?))
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Replace every object: mesh `i` has `vertex_counts[i]` vertices read
    /// from `vertex_arrays[i]` (`[x, y, z, ...]`), placed by `transforms[i]`
    /// and enabled when `enabled[i] != 0`.
    pub fn set_scene(
        &mut self,
        mesh_count: i32,
        vertex_counts: &[i32],
        vertex_arrays: &[Option<&[f32]>],
        transforms: &[[f32; 16]],
        enabled: &[i32],
    ) -> Result<()> {
        let count = checked_count("mesh", mesh_count,
            &[vertex_counts.len(), vertex_arrays.len(), transforms.len(), enabled.len()])?;

        let meshes = vertex_counts[..count]
            .iter()
            .zip(&vertex_arrays[..count])
            .map(|(&vertex_count, &vertices)| MeshDesc::from_flat(vertex_count, vertices))
            .collect::<Result<Vec<_>>>()?;
        let transforms: Vec<Mat4> = transforms[..count].iter().map(Mat4::from_cols_array).collect();
        let enabled: Vec<bool> = enabled[..count].iter().map(|&flag| flag != 0).collect();

        self.scene.set_scene(&meshes, &transforms, &enabled)
    }

    /// Store the sensors fired by `fire_and_return_positions`
    ///
    /// The stored set is unchanged if any sensor is invalid.
    pub fn set_sensors(&mut self, sensor_count: i32, sensors: &[Sensor]) -> Result<()> {
        let count = checked_count("sensor", sensor_count, &[sensors.len()])?;
        let max_rays = self.scene.config().max_rays_per_sensor;
        for sensor in &sensors[..count] {
            sensor.grid(max_rays)?;
        }
        self.sensors = sensors[..count].to_vec();
        Ok(())
    }

    /// Fire the stored sensors; read positions through `positions(handle)`
    /// and free them with `release_result`
    pub fn fire_and_return_positions(&mut self) -> Result<Option<FireResult>> {
        self.scene.fire_positions(&self.sensors)
    }

    /// Fire `sensors` and write each sensor's hit total into `counts`
    ///
    /// Unlike the other counts, `counts` must hold exactly `sensor_count`
    /// slots.
    pub fn fire_and_return_counts(&mut self, counts: &mut [i32], sensors: &[Sensor], sensor_count: i32) -> Result<bool> {
        let count = checked_count("sensor", sensor_count, &[sensors.len(), counts.len()])?;
        if counts.len() != count {
            crate::engine_bail!("sensortrace::HostSession", SizeMismatch,
                "{} count slots for {} sensors", counts.len(), count);
        }

        let mut totals = vec![0usize; count];
        let fired = self.scene.fire_counts(&sensors[..count], &mut totals)?;
        if fired {
            for (out, total) in counts.iter_mut().zip(totals) {
                *out = i32::try_from(total).unwrap_or(i32::MAX);
            }
        }
        Ok(fired)
    }

    pub fn check_single_ray(&mut self, origin: Vec3, direction: Vec3, max_depth: f32) -> Result<bool> {
        self.scene.check_hit(origin, direction, max_depth)
    }

    /// Nearest hit, `MISS_POSITION` on a miss
    pub fn trace_single_ray(&mut self, origin: Vec3, direction: Vec3, max_depth: f32) -> Result<Vec3> {
        self.scene.trace_hit(origin, direction, max_depth)
    }

    pub fn update_transforms(&mut self, count: i32, indices: &[i32], transforms: &[[f32; 16]]) -> Result<()> {
        let count = checked_count("transform update", count, &[indices.len(), transforms.len()])?;
        let indices = self.checked_indices(&indices[..count])?;
        let transforms: Vec<Mat4> = transforms[..count].iter().map(Mat4::from_cols_array).collect();
        self.scene.update_transforms(&indices, &transforms)
    }

    pub fn update_enabled(&mut self, count: i32, indices: &[i32], enabled: &[i32]) -> Result<()> {
        let count = checked_count("enabled update", count, &[indices.len(), enabled.len()])?;
        let indices = self.checked_indices(&indices[..count])?;
        let enabled: Vec<bool> = enabled[..count].iter().map(|&flag| flag != 0).collect();
        self.scene.update_enabled(&indices, &enabled)
    }

    pub fn release_result(&mut self, handle: ResultHandle) -> bool {
        self.scene.release_result(handle)
    }

    /// Positions of a host-visible result
    pub fn positions(&self, handle: ResultHandle) -> Result<&[Vec3]> {
        self.scene.positions(handle)
    }

    /// Positions of a host-visible result as `[x, y, z, ...]`
    pub fn positions_flat(&self, handle: ResultHandle) -> Result<&[f32]> {
        self.scene.result(handle)?.as_flat_f32()
    }

    /// Negative indices are out of range like indices past the end
    fn checked_indices(&self, indices: &[i32]) -> Result<Vec<usize>> {
        let count = self.scene.instance_count();
        indices
            .iter()
            .map(|&index| {
                usize::try_from(index).map_err(|_| {
                    crate::engine_error!("sensortrace::HostSession",
                        "negative instance index {} (count {})", index, count);
                    Error::IndexOutOfRange { index: i64::from(index), count }
                })
            })
            .collect()
    }
}

/// Validate a caller-asserted count against the slices it describes
fn checked_count(what: &str, count: i32, lengths: &[usize]) -> Result<usize> {
    let Ok(count) = usize::try_from(count) else {
        crate::engine_bail!("sensortrace::HostSession", SizeMismatch,
            "negative {} count {}", what, count);
    };
    if let Some(&short) = lengths.iter().find(|&&len| len < count) {
        crate::engine_bail!("sensortrace::HostSession", SizeMismatch,
            "{} count {} but an array holds only {}", what, count, short);
    }
    Ok(count)
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
