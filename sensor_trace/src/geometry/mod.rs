//! Geometry module
//!
//! Host meshes, validated object models and the store that owns them.

pub(crate) mod mesh;
mod geometry_store;

pub use mesh::{MeshDesc, ObjectModel, Triangle};
pub use geometry_store::{GeometryStore, ModelKey};
