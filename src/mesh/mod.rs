//! Rest-pose triangle meshes and per-vertex bone weights.

pub mod weights;

use glam::Vec3;

pub use weights::{Influence, VertexWeights};

/// Maximum number of bone influences kept per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// A triangle mesh in the rest pose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub normals: Vec<Vec3>,
}

impl RestMesh {
    /// Creates a mesh and derives its normals from the triangles.
    #[must_use]
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let normals = compute_vertex_normals(&vertices, &triangles);
        Self {
            vertices,
            triangles,
            normals,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Flattened `[i0, i1, i2, ...]` index list as sent on the wire.
    #[must_use]
    pub fn flat_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Mean of all vertex positions, or zero for an empty mesh.
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        centroid(&self.vertices)
    }
}

#[must_use]
pub fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

/// Area-weighted smooth vertex normals.
///
/// Triangles referencing out-of-range vertices are skipped. Vertices that
/// belong to no (non-degenerate) triangle get a zero normal.
#[must_use]
pub fn compute_vertex_normals(vertices: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for tri in triangles {
        let [a, b, c] = tri.map(|i| i as usize);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        // Cross product length is twice the area.
        let n = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

/// Splits a polygon (given as vertex indices) into a triangle fan.
///
/// Quads become `(0,1,2)` and `(0,2,3)`. Polygons with fewer than three
/// corners produce nothing.
pub fn triangulate(polygon: &[u32], out: &mut Vec<[u32; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..polygon.len() - 1 {
        out.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}
