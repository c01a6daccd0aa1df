//! Linear Blend Skinning
//!
//! Turns a rest mesh, a rest skeleton and a manual pose into a posed mesh
//! plus posed bone positions. Both outputs are derived from the same
//! per-bone skinning matrix, so a rigged vertex that coincides with a bone
//! head stays on that head under any pose.
//!
//! ```text
//! p' = Σ wᵢ · (M_skin[boneᵢ] · p)
//! head' = M_skin[bone] · head
//! ```
//!
//! Normals are recomputed from the deformed triangles.

use glam::{Affine3A, Mat3, Vec3};

use crate::mesh::{compute_vertex_normals, Influence, RestMesh, VertexWeights};
use crate::skeleton::euler::{euler_degrees_to_mat3, is_zero_rotation};
use crate::skeleton::{ManualPose, Skeleton};

/// Posed head/tail of one bone, together with its rest frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PosedBone {
    pub name: String,
    pub parent: Option<String>,
    pub head: Vec3,
    pub tail: Vec3,
    pub length: f32,
    pub rest_matrix: Affine3A,
}

/// The result of one pose-apply call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PosedMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub bones: Vec<PosedBone>,
}

impl PosedMesh {
    /// Rotates the whole result (vertices, normals and bones) by Z·Y·X Euler
    /// degrees about the centroid of the posed vertices.
    pub fn apply_model_rotation(&mut self, degrees: Vec3) {
        if is_zero_rotation(degrees) || !degrees.is_finite() {
            return;
        }
        let rotation = euler_degrees_to_mat3(degrees);
        let pivot = crate::mesh::centroid(&self.vertices);
        let about_pivot = |p: Vec3| rotation * (p - pivot) + pivot;

        for v in &mut self.vertices {
            *v = about_pivot(*v);
        }
        for n in &mut self.normals {
            *n = (rotation * *n).normalize_or_zero();
        }
        for bone in &mut self.bones {
            bone.head = about_pivot(bone.head);
            bone.tail = about_pivot(bone.tail);
        }
    }
}

/// Stateless linear blend skinning.
pub struct SkinningEngine;

impl SkinningEngine {
    /// Applies `pose` to `skeleton` (replacing any previous pose) and skins
    /// `mesh` with it.
    pub fn apply(
        skeleton: &mut Skeleton,
        mesh: &RestMesh,
        weights: &VertexWeights,
        pose: &ManualPose,
    ) -> PosedMesh {
        skeleton.apply_pose(pose);
        Self::skin(skeleton, mesh, weights)
    }

    /// Skins `mesh` with the skeleton's current matrices.
    ///
    /// The skeleton is expected to be up to date (see [`Skeleton::update`]).
    #[must_use]
    pub fn skin(skeleton: &Skeleton, mesh: &RestMesh, weights: &VertexWeights) -> PosedMesh {
        if skeleton.is_dirty() {
            log::warn!("Skinning with a skeleton that has pending pose changes");
        }
        let any_posed = (0..skeleton.len()).any(|i| skeleton.is_posed(i));

        let vertices: Vec<Vec3> = if any_posed {
            mesh.vertices
                .iter()
                .enumerate()
                .map(|(i, &p)| blend_point(skeleton, weights.vertex(i), p))
                .collect()
        } else {
            mesh.vertices.clone()
        };

        let normals = if any_posed {
            compute_vertex_normals(&vertices, &mesh.triangles)
        } else {
            mesh.normals.clone()
        };

        PosedMesh {
            vertices,
            normals,
            bones: posed_bones(skeleton),
        }
    }
}

/// Posed head/tail for every bone, in skeleton order.
#[must_use]
pub fn posed_bones(skeleton: &Skeleton) -> Vec<PosedBone> {
    skeleton
        .bones()
        .iter()
        .enumerate()
        .map(|(i, bone)| PosedBone {
            name: bone.name.clone(),
            parent: bone.parent.map(|p| skeleton.bones()[p].name.clone()),
            head: skeleton.posed_head(i),
            tail: skeleton.posed_tail(i),
            length: bone.length,
            rest_matrix: bone.rest_global(),
        })
        .collect()
}

/// Blends one rest point by its influences.
///
/// Points whose influences are all unposed are returned unchanged.
/// Unnormalised weights are renormalised before blending.
#[must_use]
pub fn blend_point(skeleton: &Skeleton, influences: &[Influence], p: Vec3) -> Vec3 {
    blend_with(influences, p, |bone| {
        skeleton.is_posed(bone).then(|| skeleton.skinning_matrix(bone))
    })
}

/// Like [`blend_point`] but evaluates every matrix from the current local
/// rotations, ignoring the cached state.
#[must_use]
pub fn blend_point_evaluated(skeleton: &Skeleton, influences: &[Influence], p: Vec3) -> Vec3 {
    blend_with(influences, p, |bone| Some(skeleton.evaluate_skinning_matrix(bone)))
}

fn blend_with(influences: &[Influence], p: Vec3, matrix: impl Fn(usize) -> Option<Affine3A>) -> Vec3 {
    let total: f32 = influences.iter().map(|i| i.weight).sum();
    if influences.is_empty() || !total.is_finite() || total <= f32::EPSILON {
        return p;
    }
    let matrices: smallvec::SmallVec<[Option<Affine3A>; 4]> =
        influences.iter().map(|i| matrix(i.bone as usize)).collect();
    if matrices.iter().all(Option::is_none) {
        return p;
    }

    let scale = if (total - 1.0).abs() > 1e-5 { 1.0 / total } else { 1.0 };
    influences
        .iter()
        .zip(matrices)
        .map(|(inf, m)| {
            let moved = m.map_or(p, |m| m.transform_point3(p));
            moved * (inf.weight * scale)
        })
        .sum()
}

/// Rotation-only part of a bone's rest frame.
#[inline]
#[must_use]
pub fn rest_rotation(matrix: &Affine3A) -> Mat3 {
    Mat3::from(matrix.matrix3)
}
