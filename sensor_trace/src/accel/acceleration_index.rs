/// AccelerationIndex - two-level BVH over the enabled instances
///
/// The top level is a BVH over world-space instance bounds; each entry
/// points at a shared model and its bottom-level BVH. Rays are moved into
/// model space with the instance's inverse transform. The direction is not
/// renormalized, so model-space distances equal world-space distances.

use std::sync::Arc;
use glam::Affine3A;
use crate::geometry::ObjectModel;
use crate::math;
use crate::scene::InstanceTable;
use crate::sensor::{Hit, Ray};
use super::aabb::Aabb;
use super::bvh::Bvh;

/// One enabled instance as seen by the index
#[derive(Debug, Clone)]
pub struct IndexedInstance {
    /// Position in the instance table
    pub instance: u32,
    pub model: Arc<ObjectModel>,
    pub world_to_local: Affine3A,
    /// World-space bounds
    pub bounds: Aabb,
}

/// Immutable snapshot of the traceable scene
#[derive(Debug, Clone, Default)]
pub struct AccelerationIndex {
    instances: Vec<IndexedInstance>,
    tlas: Bvh,
    /// Instance table generation this index was built from
    generation: u64,
}

impl AccelerationIndex {
    pub(crate) fn new(instances: Vec<IndexedInstance>, tlas: Bvh, generation: u64) -> Self {
        Self { instances, tlas, generation }
    }

    /// Number of instances that can be hit
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances(&self) -> &[IndexedInstance] {
        &self.instances
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// World bounds of everything traceable
    pub fn bounds(&self) -> Aabb {
        self.tlas.bounds()
    }

    /// Move the instances the table marks dirty and refit the top level.
    ///
    /// Returns `false`, leaving the index untouched, when a moved instance
    /// cannot be refitted: it became singular, or it is enabled but was not
    /// traceable before.
    pub(crate) fn refit(&mut self, table: &InstanceTable) -> bool {
        let mut moved = Vec::with_capacity(table.dirty().len());
        for &index in table.dirty() {
            let Some(transform) = table.transform(index) else {
                return false;
            };
            match self.instances.binary_search_by_key(&(index as u32), |entry| entry.instance) {
                Ok(slot) if math::is_invertible(transform) => moved.push((slot, *transform)),
                Err(_) if !table.is_enabled(index) => {}
                _ => return false,
            }
        }

        for (slot, transform) in moved {
            let entry = &mut self.instances[slot];
            entry.world_to_local = transform.inverse();
            entry.bounds = entry.model.bounds().transformed(&transform);
        }
        let bounds: Vec<Aabb> = self.instances.iter().map(|entry| entry.bounds).collect();
        self.tlas.refit(&bounds);
        self.generation = table.generation();
        true
    }

    /// Nearest hit within `[0, ray.max_distance]`
    pub fn intersect_one(&self, ray: &Ray) -> Option<Hit> {
        let mut triangle = 0u32;
        let (entry, t) = self.tlas.closest(ray.origin, ray.direction, ray.max_distance, |item, limit| {
            let instance = &self.instances[item as usize];
            let origin = instance.world_to_local.transform_point3(ray.origin);
            let direction = instance.world_to_local.transform_vector3(ray.direction);
            let (hit_triangle, t) = instance.model.intersect(origin, direction, limit)?;
            triangle = hit_triangle;
            Some(t)
        })?;

        Some(Hit {
            t,
            position: ray.at(t),
            instance: self.instances[entry as usize].instance,
            triangle,
        })
    }

    /// Whether anything is hit within `[0, ray.max_distance]`
    pub fn occluded(&self, ray: &Ray) -> bool {
        self.tlas.any(ray.origin, ray.direction, ray.max_distance, |item, limit| {
            let instance = &self.instances[item as usize];
            let origin = instance.world_to_local.transform_point3(ray.origin);
            let direction = instance.world_to_local.transform_vector3(ray.direction);
            instance.model.occluded(origin, direction, limit)
        })
    }
}
