//! Hit position buffers

use glam::Vec3;
use crate::config::BufferResidency;
use crate::error::{Error, Result};

/// Hit positions of one fire call, in ray order
#[derive(Debug, Clone, PartialEq)]
pub struct HitBuffer {
    positions: Vec<Vec3>,
    residency: BufferResidency,
}

impl HitBuffer {
    pub fn new(positions: Vec<Vec3>, residency: BufferResidency) -> Self {
        Self { positions, residency }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn residency(&self) -> BufferResidency {
        self.residency
    }

    /// View the positions in place
    ///
    /// # Errors
    ///
    /// `BufferNotHostVisible` for a `DeviceOnly` buffer (use `read_back`)
    pub fn positions(&self) -> Result<&[Vec3]> {
        match self.residency {
            BufferResidency::HostVisible => Ok(&self.positions),
            BufferResidency::DeviceOnly => Err(Error::BufferNotHostVisible),
        }
    }

    /// View the positions as packed `[x, y, z, x, y, z, ...]`
    pub fn as_flat_f32(&self) -> Result<&[f32]> {
        self.positions().map(bytemuck::cast_slice::<Vec3, f32>)
    }

    /// Copy the positions out, whatever the residency
    pub fn read_back(&self) -> Vec<Vec3> {
        self.positions.clone()
    }
}
