/// GeometryStore - immutable object models for the current scene
///
/// Models are replaced wholesale by every full scene push; there is no
/// per-mesh update path. Each model is shared (`Arc`) with the acceleration
/// index that references it, so a replaced model stays alive until the
/// index built over it is dropped.

use std::sync::Arc;
use slotmap::{new_key_type, SlotMap};
use crate::accel::aabb::Aabb;
use crate::device::TraceDevice;
use crate::error::Result;
use super::mesh::{MeshDesc, ObjectModel, Triangle};

new_key_type! {
    /// Stable key for an ObjectModel within a GeometryStore.
    ///
    /// Keys from a previous scene push are invalid after the next one.
    pub struct ModelKey;
}

/// Owner of the object models, in host order
#[derive(Default)]
pub struct GeometryStore {
    models: SlotMap<ModelKey, Arc<ObjectModel>>,
    /// Keys in host order (instance `i` uses `order[i]`)
    order: Vec<ModelKey>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every mesh and build its bottom-level BVH, without touching
    /// the store.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` for the first malformed mesh; device errors from
    /// the BVH build.
    pub fn prepare(
        meshes: &[MeshDesc],
        device: &dyn TraceDevice,
        leaf_size: usize,
    ) -> Result<Vec<ObjectModel>> {
        let mut resolved = Vec::with_capacity(meshes.len());
        for (index, mesh) in meshes.iter().enumerate() {
            let triangles = mesh.triangles().map_err(|err| {
                crate::engine_error!("sensortrace::GeometryStore",
                    "Mesh {} rejected: {}", index, err);
                err
            })?;
            resolved.push(triangles);
        }

        resolved
            .into_iter()
            .map(|triangles| {
                let bounds: Vec<Aabb> = triangles.iter().map(Triangle::bounds).collect();
                let bvh = device.build_bvh(&bounds, leaf_size)?;
                Ok(ObjectModel::new(triangles, bvh))
            })
            .collect()
    }

    /// Replace every model, returning one key per model in input order
    pub fn replace(&mut self, models: Vec<ObjectModel>) -> Vec<ModelKey> {
        self.models.clear();
        self.order = models
            .into_iter()
            .map(|model| self.models.insert(Arc::new(model)))
            .collect();

        crate::engine_debug!("sensortrace::GeometryStore",
            "Stored {} models ({} triangles)", self.order.len(), self.triangle_count());
        self.order.clone()
    }

    /// `prepare` then `replace`; on error the store is unchanged
    pub fn set_models(
        &mut self,
        meshes: &[MeshDesc],
        device: &dyn TraceDevice,
        leaf_size: usize,
    ) -> Result<Vec<ModelKey>> {
        let models = Self::prepare(meshes, device, leaf_size)?;
        Ok(self.replace(models))
    }

    pub fn get(&self, key: ModelKey) -> Option<&Arc<ObjectModel>> {
        self.models.get(key)
    }

    /// Key of the model at host position `index`
    pub fn key_at(&self, index: usize) -> Option<ModelKey> {
        self.order.get(index).copied()
    }

    pub fn keys(&self) -> &[ModelKey] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total triangles across every model
    pub fn triangle_count(&self) -> usize {
        self.models.values().map(|model| model.triangle_count()).sum()
    }

    pub fn clear(&mut self) {
        self.models.clear();
        self.order.clear();
    }
}

#[cfg(test)]
#[path = "geometry_store_tests.rs"]
mod tests;
