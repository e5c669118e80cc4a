/// RayGenerator - sensor parameters to ray batches
///
/// Pure and deterministic: identical sensors produce bit-identical rays.
/// For each sensor the grid is walked row-major (height, then radius):
///
/// - row `r`: vertical offset `h = -height/2 + r * gap`, pitched by
///   `atan2(h, depth)` about the sensor's right axis
/// - column `c`: yaw `a = -radius/2 + c * gap` degrees about world up
///
/// Every ray starts at the sensor position with `max_distance = depth`.

use std::ops::Range;
use glam::Vec3;
use crate::error::{Error, Result};
use crate::math;
use super::ray::Ray;
use super::sensor::Sensor;

/// World up axis (yaw axis)
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Rays for several sensors, concatenated in caller order
#[derive(Debug, Clone, Default)]
pub struct SensorBatch {
    rays: Vec<Ray>,
    ranges: Vec<Range<usize>>,
}

impl SensorBatch {
    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    /// Range of `rays()` owned by each sensor
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn sensor_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }
}

/// Generates ray batches, bounded per sensor
#[derive(Debug, Clone, Copy)]
pub struct RayGenerator {
    max_rays_per_sensor: usize,
}

impl RayGenerator {
    pub fn new(max_rays_per_sensor: usize) -> Self {
        Self { max_rays_per_sensor }
    }

    /// Rays for one sensor, row-major
    ///
    /// # Errors
    ///
    /// `InvalidSensorParams` (see `Sensor::grid`)
    pub fn generate(&self, sensor: &Sensor) -> Result<Vec<Ray>> {
        let mut rays = Vec::new();
        self.generate_into(sensor, &mut rays)?;
        Ok(rays)
    }

    /// Rays for every sensor; fails on the first invalid one
    pub fn generate_batch(&self, sensors: &[Sensor]) -> Result<SensorBatch> {
        let mut batch = SensorBatch {
            rays: Vec::new(),
            ranges: Vec::with_capacity(sensors.len()),
        };
        for sensor in sensors {
            let start = batch.rays.len();
            self.generate_into(sensor, &mut batch.rays)?;
            batch.ranges.push(start..batch.rays.len());
        }
        crate::engine_trace!("sensortrace::RayGenerator",
            "Generated {} rays for {} sensors", batch.rays.len(), sensors.len());
        Ok(batch)
    }

    fn generate_into(&self, sensor: &Sensor, rays: &mut Vec<Ray>) -> Result<()> {
        let grid = sensor.grid(self.max_rays_per_sensor)?;
        let forward = sensor.forward.normalize();
        let right = right_axis(forward);
        let gap = sensor.point_gap;

        if rays.try_reserve(grid.ray_count()).is_err() {
            crate::engine_error!("sensortrace::RayGenerator",
                "Cannot allocate {} rays for one sensor", grid.ray_count());
            return Err(Error::OutOfMemory);
        }
        for row in 0..grid.rows {
            let h = -sensor.height / 2.0 + row as f32 * gap;
            let pitch = math::axis_angle(right, h.atan2(sensor.depth));

            for col in 0..grid.cols {
                let a = -sensor.radius / 2.0 + col as f32 * gap;
                let yaw = math::axis_angle(WORLD_UP, a.to_radians());
                let direction = math::rotate(yaw * pitch, forward).normalize_or(forward);
                rays.push(Ray::new(sensor.position, direction, sensor.depth));
            }
        }
        Ok(())
    }
}

/// `forward x up`, or +X when forward is parallel to up
fn right_axis(forward: Vec3) -> Vec3 {
    forward.cross(WORLD_UP).try_normalize().unwrap_or(Vec3::X)
}

#[cfg(test)]
#[path = "ray_generator_tests.rs"]
mod tests;
