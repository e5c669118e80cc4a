//! Mesh input and immutable object models
//!
//! A `MeshDesc` is what the host hands over: raw vertex positions and an
//! optional index list. An `ObjectModel` is the validated triangle list plus
//! its bottom-level BVH, shared by every instance that references it.

use glam::Vec3;
use crate::accel::aabb::Aabb;
use crate::accel::bvh::Bvh;
use crate::error::Result;

/// Determinant threshold below which a ray is treated as parallel to a triangle
const PARALLEL_EPSILON: f32 = 1e-12;

/// Mesh description (host input)
#[derive(Debug, Clone, Default)]
pub struct MeshDesc {
    /// Vertex positions in model space
    pub vertices: Vec<Vec3>,
    /// Optional index list (triples). `None` means consecutive vertex triples.
    pub indices: Option<Vec<u32>>,
}

impl MeshDesc {
    /// Non-indexed mesh from vertex positions
    pub fn from_vertices(vertices: Vec<Vec3>) -> Self {
        Self { vertices, indices: None }
    }

    /// Indexed mesh
    pub fn indexed(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices: Some(indices) }
    }

    /// Axis-aligned box centered on the origin, 8 vertices and 12 triangles
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // -Z
            4, 5, 6, 4, 6, 7, // +Z
            0, 1, 5, 0, 5, 4, // -Y
            3, 7, 6, 3, 6, 2, // +Y
            0, 4, 7, 0, 7, 3, // -X
            1, 2, 6, 1, 6, 5, // +X
        ];
        Self::indexed(vertices, indices)
    }

    /// Build from the host's flat `[x, y, z, x, y, z, ...]` layout.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if `vertex_count` is negative, the array is missing
    /// while `vertex_count` is nonzero, or the array holds fewer than
    /// `3 * vertex_count` floats.
    pub fn from_flat(vertex_count: i32, vertices: Option<&[f32]>) -> Result<Self> {
        if vertex_count < 0 {
            crate::engine_bail!("sensortrace::MeshDesc", InvalidGeometry,
                "negative vertex count {}", vertex_count);
        }
        let count = vertex_count as usize;
        if count == 0 {
            return Ok(Self::default());
        }

        let floats = match vertices {
            Some(floats) => floats,
            None => crate::engine_bail!("sensortrace::MeshDesc", InvalidGeometry,
                "missing vertex array for {} vertices", count),
        };
        if floats.len() < count * 3 {
            crate::engine_bail!("sensortrace::MeshDesc", InvalidGeometry,
                "vertex array holds {} floats, {} vertices need {}",
                floats.len(), count, count * 3);
        }

        let vertices = floats[..count * 3]
            .chunks_exact(3)
            .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2]))
            .collect();
        Ok(Self::from_vertices(vertices))
    }

    /// Check the mesh and resolve it into triangles
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` for non-finite vertices, an index count that is not
    /// a multiple of 3, or an index beyond the vertex list. Trailing vertices
    /// of a non-indexed mesh that do not form a full triangle are dropped.
    pub fn triangles(&self) -> Result<Vec<Triangle>> {
        if let Some(bad) = self.vertices.iter().position(|v| !v.is_finite()) {
            crate::engine_bail!("sensortrace::MeshDesc", InvalidGeometry,
                "vertex {} is not finite", bad);
        }

        match &self.indices {
            None => {
                let leftover = self.vertices.len() % 3;
                if leftover != 0 {
                    crate::engine_warn!("sensortrace::MeshDesc",
                        "Ignoring {} trailing vertices of a {}-vertex triangle list",
                        leftover, self.vertices.len());
                }
                Ok(self.vertices
                    .chunks_exact(3)
                    .map(|v| Triangle::new(v[0], v[1], v[2]))
                    .collect())
            }
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    crate::engine_bail!("sensortrace::MeshDesc", InvalidGeometry,
                        "index count {} is not a multiple of 3", indices.len());
                }
                if let Some(bad) = indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
                    crate::engine_bail!("sensortrace::MeshDesc", InvalidGeometry,
                        "index {} out of range for {} vertices", bad, self.vertices.len());
                }
                Ok(indices
                    .chunks_exact(3)
                    .map(|i| Triangle::new(
                        self.vertices[i[0] as usize],
                        self.vertices[i[1] as usize],
                        self.vertices[i[2] as usize],
                    ))
                    .collect())
            }
        }
    }
}

// ===== TRIANGLE =====

/// A triangle in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points([self.v0, self.v1, self.v2])
    }

    /// Möller–Trumbore intersection, both faces.
    ///
    /// `direction` need not be normalized; the returned `t` is in units of
    /// `direction`. Returns `t` in `[0, t_max]` on a hit. Degenerate
    /// triangles never hit.
    #[inline]
    pub fn intersect(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let p = direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = origin - self.v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        if t >= 0.0 && t <= t_max {
            Some(t)
        } else {
            None
        }
    }
}

// ===== OBJECT MODEL =====

/// Immutable triangle mesh with its bottom-level BVH
#[derive(Debug, Clone)]
pub struct ObjectModel {
    triangles: Vec<Triangle>,
    bvh: Bvh,
    bounds: Aabb,
}

impl ObjectModel {
    /// Assemble a model from validated triangles and a BVH built over them
    pub fn new(triangles: Vec<Triangle>, bvh: Bvh) -> Self {
        let bounds = bvh.bounds();
        Self { triangles, bvh, bounds }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Model-space bounds (`Aabb::EMPTY` for a mesh without triangles)
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Nearest triangle hit in model space: `(triangle index, t)`
    pub fn intersect(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<(u32, f32)> {
        self.bvh.closest(origin, direction, t_max, |item, limit| {
            self.triangles[item as usize].intersect(origin, direction, limit)
        })
    }

    /// Whether any triangle is hit within `t_max`
    pub fn occluded(&self, origin: Vec3, direction: Vec3, t_max: f32) -> bool {
        self.bvh.any(origin, direction, t_max, |item, limit| {
            self.triangles[item as usize].intersect(origin, direction, limit).is_some()
        })
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
