//! Sensor shape parameters

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use crate::error::Result;

/// A range sensor: a fan of rays spanning `height` vertically (measured at
/// `depth`) and `radius` degrees horizontally, sampled every `point_gap`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Sensor {
    /// World-space ray origin
    pub position: Vec3,
    /// Facing direction (normalized by the caller)
    pub forward: Vec3,
    /// Maximum ray length
    pub depth: f32,
    /// Vertical extent at `depth`
    pub height: f32,
    /// Horizontal angular extent in degrees
    pub radius: f32,
    /// Sample spacing (vertical units and degrees)
    pub point_gap: f32,
}

/// Rows and columns of a sensor's sampling grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorGrid {
    pub rows: usize,
    pub cols: usize,
}

impl SensorGrid {
    pub fn ray_count(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }
}

impl Sensor {
    pub fn new(position: Vec3, forward: Vec3, depth: f32, height: f32, radius: f32, point_gap: f32) -> Self {
        Self { position, forward, depth, height, radius, point_gap }
    }

    /// Number of rays this sensor generates, 0 if its parameters are invalid
    pub fn ray_count(&self) -> usize {
        self.grid(usize::MAX).map(|grid| grid.ray_count()).unwrap_or(0)
    }

    /// Validate the parameters and size the sampling grid.
    ///
    /// `rows = max(1, ceil(height / gap))`, `cols = max(1, ceil(radius / gap))`.
    ///
    /// # Errors
    ///
    /// `InvalidSensorParams` if the gap is not positive, `depth` is not
    /// positive, `height` or `radius` is negative, a field is non-finite,
    /// `forward` has zero length, or the grid exceeds `max_rays`.
    pub fn grid(&self, max_rays: usize) -> Result<SensorGrid> {
        let scalars = [self.depth, self.height, self.radius, self.point_gap];
        if !self.position.is_finite() || !self.forward.is_finite()
            || scalars.iter().any(|value| !value.is_finite())
        {
            return Err(invalid(format!("non-finite sensor field in {:?}", self)));
        }
        if self.point_gap <= 0.0 {
            return Err(invalid(format!("point gap must be > 0, got {}", self.point_gap)));
        }
        if self.depth <= 0.0 {
            return Err(invalid(format!("depth must be > 0, got {}", self.depth)));
        }
        if self.height < 0.0 || self.radius < 0.0 {
            return Err(invalid(format!(
                "height and radius must be >= 0, got {} and {}", self.height, self.radius)));
        }
        if self.forward.length_squared() <= f32::EPSILON * f32::EPSILON {
            return Err(invalid("forward vector has zero length".to_string()));
        }

        let rows = axis_samples(self.height, self.point_gap);
        let cols = axis_samples(self.radius, self.point_gap);
        let count = rows.zip(cols).and_then(|(rows, cols)| rows.checked_mul(cols));
        match (rows, cols, count) {
            (Some(rows), Some(cols), Some(count)) if count <= max_rays => {
                Ok(SensorGrid { rows, cols })
            }
            _ => Err(invalid(format!(
                "{} x {} samples exceed the limit of {} rays per sensor",
                f64::from(self.height) / f64::from(self.point_gap),
                f64::from(self.radius) / f64::from(self.point_gap),
                max_rays))),
        }
    }
}

/// `max(1, ceil(extent / gap))`, or `None` when it does not fit a `usize`
fn axis_samples(extent: f32, gap: f32) -> Option<usize> {
    let samples = (f64::from(extent) / f64::from(gap)).ceil().max(1.0);
    // usize::MAX as f64 rounds up to 2^64, which itself does not fit
    if samples >= usize::MAX as f64 {
        return None;
    }
    Some(samples as usize)
}

fn invalid(message: String) -> crate::error::Error {
    crate::engine_error!("sensortrace::Sensor", "{}", message);
    crate::error::Error::InvalidSensorParams(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn lidar() -> Sensor {
        Sensor::new(Vec3::ZERO, Vec3::Z, 14.0, 10.0, 30.0, 0.2)
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = lidar().grid(usize::MAX).unwrap();
        assert_eq!(grid, SensorGrid { rows: 50, cols: 150 });
        assert_eq!(lidar().ray_count(), 7500);
    }

    #[test]
    fn test_zero_extents_give_single_ray() {
        let sensor = Sensor::new(Vec3::ZERO, Vec3::Z, 10.0, 0.0, 0.0, 1.0);
        assert_eq!(sensor.grid(usize::MAX).unwrap(), SensorGrid { rows: 1, cols: 1 });
    }

    #[test]
    fn test_partial_step_rounds_up() {
        let sensor = Sensor::new(Vec3::ZERO, Vec3::Z, 10.0, 2.5, 1.0, 1.0);
        assert_eq!(sensor.grid(usize::MAX).unwrap(), SensorGrid { rows: 3, cols: 1 });
    }

    #[test]
    fn test_invalid_gap() {
        for gap in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let sensor = Sensor { point_gap: gap, ..lidar() };
            assert!(matches!(sensor.grid(usize::MAX), Err(Error::InvalidSensorParams(_))));
            assert_eq!(sensor.ray_count(), 0);
        }
    }

    #[test]
    fn test_invalid_shapes() {
        let bad = [
            Sensor { depth: 0.0, ..lidar() },
            Sensor { height: -1.0, ..lidar() },
            Sensor { radius: -1.0, ..lidar() },
            Sensor { forward: Vec3::ZERO, ..lidar() },
            Sensor { position: Vec3::new(f32::NAN, 0.0, 0.0), ..lidar() },
        ];
        for sensor in bad {
            assert!(matches!(sensor.grid(usize::MAX), Err(Error::InvalidSensorParams(_))));
        }
    }

    #[test]
    fn test_ray_limit() {
        assert!(lidar().grid(7500).is_ok());
        assert!(matches!(lidar().grid(7499), Err(Error::InvalidSensorParams(_))));

        let huge = Sensor { height: 1.0e30, point_gap: 1.0e-30, ..lidar() };
        assert!(huge.grid(usize::MAX).is_err());
    }

    #[test]
    fn test_grid_product_overflow_is_rejected() {
        // 2^32 x 2^32 samples: each axis fits a usize, the product does not
        let sensor = Sensor { height: 4_294_967_296.0, radius: 4_294_967_296.0, point_gap: 1.0, ..lidar() };
        assert!(matches!(sensor.grid(usize::MAX), Err(Error::InvalidSensorParams(_))));
        assert_eq!(sensor.ray_count(), 0);
    }
}
