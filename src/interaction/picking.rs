//! Bone and mesh hit testing.
//!
//! Bones are picked in screen space against their projected head→tail
//! segment; the mesh is picked with a ray/triangle test in world space.

use glam::{Vec2, Vec3};

use super::camera::{Ray, ViewProjection};
use crate::mesh::weights::VertexWeights;

/// Below this the ray is treated as parallel to the triangle.
const PARALLEL_EPS: f32 = 1e-8;

// ============================================================================
// Bones
// ============================================================================

/// Distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Returns the index of the bone whose projected segment is closest to
/// `pointer`, if it lies within `radius_px`.
///
/// `segments` yields `(head, tail)` world positions in bone order. Bones
/// with an endpoint behind the camera are skipped.
pub fn pick_bone<I>(segments: I, view: &ViewProjection, pointer: Vec2, radius_px: f32) -> Option<usize>
where
    I: IntoIterator<Item = (Vec3, Vec3)>,
{
    let mut best: Option<(usize, f32)> = None;
    for (index, (head, tail)) in segments.into_iter().enumerate() {
        let (Some(a), Some(b)) = (view.project(head), view.project(tail)) else {
            continue;
        };
        let d = distance_to_segment(pointer, a, b);
        if d <= radius_px && best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((index, d));
        }
    }
    best.map(|(index, _)| index)
}

// ============================================================================
// Mesh
// ============================================================================

/// Closest intersection of a ray with a triangle mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Index of the triangle (not of its first index).
    pub triangle: usize,
    pub vertices: [u32; 3],
    pub t: f32,
    pub point: Vec3,
    /// Weights of the three corners; they sum to 1.
    pub barycentric: Vec3,
}

/// Möller–Trumbore ray/triangle test. Returns `(t, u, v)` for hits in
/// front of the ray origin. Both faces are hit.
#[must_use]
pub fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > PARALLEL_EPS).then_some((t, u, v))
}

/// Nearest hit of `ray` against the triangles in `indices` (flat triples).
/// Triangles referencing missing vertices are skipped.
#[must_use]
pub fn pick_mesh(ray: &Ray, vertices: &[Vec3], indices: &[u32]) -> Option<MeshHit> {
    let mut best: Option<MeshHit> = None;
    for (triangle, tri) in indices.chunks_exact(3).enumerate() {
        let corners = [tri[0], tri[1], tri[2]];
        let (Some(&v0), Some(&v1), Some(&v2)) = (
            vertices.get(corners[0] as usize),
            vertices.get(corners[1] as usize),
            vertices.get(corners[2] as usize),
        ) else {
            continue;
        };
        let Some((t, u, v)) = intersect_triangle(ray, v0, v1, v2) else {
            continue;
        };
        if best.is_some_and(|b| b.t <= t) {
            continue;
        }
        best = Some(MeshHit {
            triangle,
            vertices: corners,
            t,
            point: ray.at(t),
            barycentric: Vec3::new(1.0 - u - v, u, v),
        });
    }
    best
}

/// The bone with the largest influence at a hit point, blending the corner
/// weights by the barycentric coordinates.
#[must_use]
pub fn dominant_bone(weights: &VertexWeights, hit: &MeshHit) -> Option<usize> {
    let mut totals: smallvec::SmallVec<[(u32, f32); 12]> = smallvec::SmallVec::new();
    for (corner, &vertex) in hit.vertices.iter().enumerate() {
        if vertex as usize >= weights.len() {
            continue;
        }
        let scale = hit.barycentric[corner];
        for influence in weights.vertex(vertex as usize) {
            let contribution = influence.weight * scale;
            match totals.iter_mut().find(|(bone, _)| *bone == influence.bone) {
                Some((_, total)) => *total += contribution,
                None => totals.push((influence.bone, contribution)),
            }
        }
    }
    totals
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(bone, _)| bone as usize)
}
