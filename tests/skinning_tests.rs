//! Skinning Tests
//!
//! Tests for:
//! - Identity pose round trip (bit-exact rest mesh and bones)
//! - Mesh/skeleton synchronisation under pose
//! - Hierarchy propagation (M_global = M_parent · M_restLocal · M_local)
//! - Weight normalisation (including raw influences) and orphan binding
//! - Degenerate rest frames and bad pose entries

mod common;

use glam::{Affine3A, Vec3};

use common::{approx, approx_vec3, stick_solver, BASE_VERTEX_COUNT};
use pose_studio::mesh::{Influence, RestMesh, VertexWeights};
use pose_studio::skeleton::{BoneDefinition, ManualPose, Skeleton};
use pose_studio::skinning::{blend_point, SkinningEngine};
use pose_studio::solver::{ShapeParameters, ShapeSolver};

fn solve_default() -> pose_studio::solver::SolvedBody {
    stick_solver().solve(&ShapeParameters::default()).unwrap()
}

// ============================================================================
// Identity Round Trip
// ============================================================================

#[test]
fn empty_pose_reproduces_rest_exactly() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &ManualPose::new());

    assert_eq!(posed.vertices, body.mesh.vertices);
    assert_eq!(posed.normals, body.mesh.normals);
    for (posed_bone, bone) in posed.bones.iter().zip(skeleton.bones()) {
        assert_eq!(posed_bone.head, bone.rest_head);
        assert_eq!(posed_bone.tail, bone.rest_tail);
    }
    assert!(skeleton.skinning_matrices().iter().all(|m| *m == Affine3A::IDENTITY));
}

#[test]
fn explicit_zero_rotations_are_identity() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new()
        .with("upperarm_l", Vec3::ZERO)
        .with("spine", Vec3::ZERO);
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);
    assert_eq!(posed.vertices, body.mesh.vertices);
}

#[test]
fn pose_does_not_stick_between_applies() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let arm = ManualPose::new().with("upperarm_l", Vec3::new(0.0, 0.0, 90.0));

    let baseline = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &ManualPose::new());
    let bent = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &arm);
    let again = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &ManualPose::new());

    assert_ne!(bent.vertices, baseline.vertices);
    assert_eq!(again.vertices, baseline.vertices);
}

// ============================================================================
// Synchronisation
// ============================================================================

#[test]
fn shoulder_vertex_tracks_bone_head() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new()
        .with("spine", Vec3::new(0.0, 0.0, 30.0))
        .with("upperarm_l", Vec3::new(20.0, 0.0, 90.0));
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);

    let arm = skeleton.find("upperarm_l").unwrap();
    let spine = skeleton.find("spine").unwrap();
    assert!(approx_vec3(posed.vertices[8], posed.bones[arm].head));
    assert!(approx_vec3(posed.bones[arm].head, posed.bones[spine].tail));
}

#[test]
fn bones_and_vertices_share_skinning_matrices() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new().with("upperarm_l", Vec3::new(0.0, 45.0, 60.0));
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);

    let arm = skeleton.find("upperarm_l").unwrap();
    let m = skeleton.skinning_matrix(arm);
    let bone = &skeleton.bones()[arm];
    assert!(approx_vec3(posed.bones[arm].head, m.transform_point3(bone.rest_head)));
    assert!(approx_vec3(posed.bones[arm].tail, m.transform_point3(bone.rest_tail)));
    // Vertex 6 is fully bound to the arm.
    assert!(approx_vec3(posed.vertices[6], m.transform_point3(body.mesh.vertices[6])));
}

#[test]
fn arm_rotation_about_its_roll_axis() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new().with("upperarm_l", Vec3::new(0.0, 0.0, 90.0));
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);

    // The arm points along +X with its local Z along world +Y, so a local
    // Z turn swings the tail to -Z.
    let arm = skeleton.find("upperarm_l").unwrap();
    let length = skeleton.bones()[arm].length;
    let head = posed.bones[arm].head;
    assert!(approx_vec3(head, Vec3::new(0.0, 2.0, 0.0)));
    assert!(approx_vec3(posed.bones[arm].tail, head + Vec3::new(0.0, 0.0, -length)));
}

#[test]
fn children_follow_parent_rotation() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new().with("spine", Vec3::new(0.0, 0.0, 90.0));
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);

    let spine = skeleton.find("spine").unwrap();
    let arm = skeleton.find("upperarm_l").unwrap();
    assert!(approx_vec3(posed.bones[spine].tail, Vec3::new(0.0, 1.0, -1.0)));
    assert!(approx_vec3(posed.bones[arm].head, posed.bones[spine].tail));
    assert!(skeleton.is_posed(arm));
    assert!(!skeleton.is_posed(skeleton.find("root").unwrap()));
}

#[test]
fn posed_normals_are_unit_length() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new().with("spine", Vec3::new(15.0, 0.0, 40.0));
    let posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);

    // Vertices 0..8 belong to visible triangles.
    for n in &posed.normals[..8] {
        assert!(approx(n.length(), 1.0), "normal {n:?}");
    }
}

// ============================================================================
// Weights
// ============================================================================

#[test]
fn weights_sum_to_one_for_every_vertex() {
    let body = solve_default();
    assert_eq!(body.weights.len(), BASE_VERTEX_COUNT);
    for (i, influences) in body.weights.iter().enumerate() {
        assert!(!influences.is_empty(), "vertex {i} has no influence");
        assert!(influences.len() <= 4);
        let sum: f32 = influences.iter().map(|inf| inf.weight).sum();
        assert!(approx(sum, 1.0), "vertex {i} sums to {sum}");
    }
}

#[test]
fn orphan_binds_to_nearest_head() {
    let body = solve_default();
    let arm = body.skeleton.find("upperarm_l").unwrap() as u32;
    assert_eq!(body.weights.orphan_count(), 1);
    assert_eq!(body.weights.vertex(9), &[Influence { bone: arm, weight: 1.0 }]);
}

#[test]
fn keeps_four_strongest_influences() {
    let definitions: Vec<BoneDefinition> = (0..6)
        .map(|i| {
            let x = i as f32;
            BoneDefinition::new(format!("b{i}"), None, Vec3::new(x, 0.0, 0.0), Vec3::new(x, 1.0, 0.0))
        })
        .collect();
    let skeleton = Skeleton::from_definitions(&definitions).unwrap();
    let entries = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5]
        .into_iter()
        .enumerate()
        .map(|(bone, w)| (bone, 0u32, w));
    let weights = VertexWeights::from_entries(entries, &[Vec3::ZERO], &skeleton, 1e-4, 4);

    let influences = weights.vertex(0);
    assert_eq!(influences.len(), 4);
    assert!(influences.iter().all(|inf| inf.bone >= 2));
    let sum: f32 = influences.iter().map(|inf| inf.weight).sum();
    assert!(approx(sum, 1.0));
}

#[test]
fn unnormalised_influences_blend_as_normalised() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    skeleton.apply_pose(
        &ManualPose::new()
            .with("spine", Vec3::new(0.0, 0.0, 40.0))
            .with("upperarm_l", Vec3::new(0.0, 30.0, 0.0)),
    );
    let spine = skeleton.find("spine").unwrap();
    let arm = skeleton.find("upperarm_l").unwrap();
    let p = Vec3::new(0.5, 2.0, 0.0);

    let raw = [
        Influence { bone: spine as u32, weight: 0.2 },
        Influence { bone: arm as u32, weight: 0.2 },
    ];
    let halves = [
        Influence { bone: spine as u32, weight: 0.5 },
        Influence { bone: arm as u32, weight: 0.5 },
    ];
    let blended = blend_point(&skeleton, &raw, p);
    assert!(approx_vec3(blended, blend_point(&skeleton, &halves, p)));

    let expected = (skeleton.skinning_matrix(spine).transform_point3(p)
        + skeleton.skinning_matrix(arm).transform_point3(p))
        * 0.5;
    assert!(approx_vec3(blended, expected));
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn unknown_and_non_finite_entries_are_ignored() {
    let body = solve_default();
    let mut skeleton = body.skeleton.clone();
    let pose = ManualPose::new()
        .with("no_such_bone", Vec3::new(10.0, 0.0, 0.0))
        .with("spine", Vec3::new(f32::NAN, 0.0, 0.0));
    let applied = skeleton.apply_pose(&pose);
    assert_eq!(applied, 0);

    let posed = SkinningEngine::skin(&skeleton, &body.mesh, &body.weights);
    assert_eq!(posed.vertices, body.mesh.vertices);
}

#[test]
fn missing_parent_becomes_root() {
    let definitions = [
        BoneDefinition::new("a", None, Vec3::ZERO, Vec3::Y),
        BoneDefinition::new("b", Some("ghost"), Vec3::Y, Vec3::Y * 2.0),
    ];
    let skeleton = Skeleton::from_definitions(&definitions).unwrap();
    assert_eq!(skeleton.roots().len(), 2);
    assert!(skeleton.bone_by_name("b").unwrap().is_root());
}

#[test]
fn singular_rest_frame_uses_identity_inverse() {
    let frames = [
        (
            BoneDefinition::new("root", None, Vec3::ZERO, Vec3::Y),
            Affine3A::IDENTITY,
        ),
        (
            BoneDefinition::new("flat", Some("root"), Vec3::Y, Vec3::Y),
            Affine3A::from_scale_rotation_translation(Vec3::ZERO, glam::Quat::IDENTITY, Vec3::Y),
        ),
    ];
    let mut skeleton = Skeleton::from_rest_frames(frames).unwrap();
    assert_eq!(skeleton.degenerate_bones(), &[1]);

    skeleton.apply_pose(&ManualPose::new().with("root", Vec3::new(0.0, 0.0, 45.0)));
    for m in skeleton.skinning_matrices() {
        assert!(m.is_finite());
    }

    let mesh = RestMesh::new(vec![Vec3::ZERO, Vec3::Y, Vec3::X], vec![[0, 1, 2]]);
    let weights = VertexWeights::from_entries([(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0)], &mesh.vertices, &skeleton, 1e-4, 4);
    let posed = SkinningEngine::skin(&skeleton, &mesh, &weights);
    assert!(posed.vertices.iter().all(|v| v.is_finite()));
}
