//! Sensor module
//!
//! Sensor parameters, rays, and the generator that turns one into the other.

mod sensor;
mod ray;
mod ray_generator;

pub use sensor::{Sensor, SensorGrid};
pub use ray::{Ray, Hit};
pub use ray_generator::{RayGenerator, SensorBatch, WORLD_UP};
