//! OpenPose joint targets resolved into a [`ManualPose`].
//!
//! Each limb bone is swung so its head-to-tail direction points along the
//! segment between two OpenPose joints. OpenPose labels are from the
//! subject's point of view and its image Y axis points down, so sides are
//! mirrored and Y is flipped before aligning.
//!
//! The alignment is closed form per bone. Bones are processed parents
//! first and the skeleton is updated after each one, so a forearm is
//! aligned inside its already-swung upper arm.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Deserializer, Serialize};

use super::euler::quat_to_euler_degrees;
use super::{ManualPose, Skeleton};

/// OpenPose joint to the MakeHuman bone that starts at it.
pub const JOINT_BONES: &[(&str, &str)] = &[
    ("neck", "neck_01"),
    ("l_shoulder", "upperarm_r"),
    ("l_elbow", "lowerarm_r"),
    ("l_wrist", "hand_r"),
    ("r_shoulder", "upperarm_l"),
    ("r_elbow", "lowerarm_l"),
    ("r_wrist", "hand_l"),
    ("l_hip", "thigh_r"),
    ("l_knee", "calf_r"),
    ("l_ankle", "foot_r"),
    ("r_hip", "thigh_l"),
    ("r_knee", "calf_l"),
    ("r_ankle", "foot_l"),
];

/// Aligned bones as `(bone, start joint, end joint)`, parents before children.
pub const CHAINS: &[(&str, &str, &str)] = &[
    ("upperarm_l", "r_shoulder", "r_elbow"),
    ("lowerarm_l", "r_elbow", "r_wrist"),
    ("upperarm_r", "l_shoulder", "l_elbow"),
    ("lowerarm_r", "l_elbow", "l_wrist"),
    ("thigh_l", "r_hip", "r_knee"),
    ("calf_l", "r_knee", "r_ankle"),
    ("thigh_r", "l_hip", "l_knee"),
    ("calf_r", "l_knee", "l_ankle"),
];

/// Directions closer than this (as a dot product) need no rotation.
const ALIGNED_DOT: f32 = 0.999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointPosition {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl From<JointPosition> for Vec3 {
    fn from(p: JointPosition) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

/// Named OpenPose joint positions.
///
/// Accepts `{"r_shoulder": {"x": .., "y": .., "z": ..}, ...}` or the same
/// map wrapped as `{"joints": {...}}`. `z` may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JointTargets(BTreeMap<String, JointPosition>);

impl<'de> Deserialize<'de> for JointTargets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Wrapped { joints: BTreeMap<String, JointPosition> },
            Flat(BTreeMap<String, JointPosition>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Wrapped { joints } | Repr::Flat(joints) => Self(joints),
        })
    }
}

impl JointTargets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, joint: impl Into<String>, position: Vec3) -> Self {
        self.set(joint, position);
        self
    }

    pub fn set(&mut self, joint: impl Into<String>, position: Vec3) {
        let Vec3 { x, y, z } = position;
        self.0.insert(joint.into(), JointPosition { x, y, z });
    }

    #[must_use]
    pub fn get(&self, joint: &str) -> Option<Vec3> {
        self.0.get(joint).copied().map(Vec3::from)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// World-space unit direction from `start` to `end` with OpenPose's
    /// downward Y flipped. `None` if a joint is missing or they coincide.
    #[must_use]
    pub fn direction(&self, start: &str, end: &str) -> Option<Vec3> {
        let mut v = self.get(end)? - self.get(start)?;
        v.y = -v.y;
        let v = v.normalize_or_zero();
        (v != Vec3::ZERO && v.is_finite()).then_some(v)
    }

    /// Resolves the targets into a pose on `skeleton`.
    ///
    /// The skeleton's pose is reset first and left holding the result.
    /// Chains whose joints or bone are missing are skipped.
    pub fn resolve(&self, skeleton: &mut Skeleton) -> ManualPose {
        skeleton.reset_pose();
        skeleton.update();

        for &(bone_name, start, end) in CHAINS {
            let Some(target) = self.direction(start, end) else {
                continue;
            };
            let Some(index) = skeleton.find(bone_name) else {
                log::debug!("Pose transfer: no bone '{bone_name}' in this rig");
                continue;
            };
            if let Some(degrees) = align_bone(skeleton, index, target) {
                skeleton.set_local_rotation(index, degrees);
                skeleton.update();
            }
        }

        let pose = skeleton.current_pose();
        log::debug!("Pose transfer resolved {} bone rotations", pose.len());
        pose
    }
}

/// Local Z·Y·X rotation (degrees) that turns bone `index` to point along the
/// world direction `target`, given its parent's current pose.
fn align_bone(skeleton: &Skeleton, index: usize, target: Vec3) -> Option<Vec3> {
    let bone = skeleton.bone(index)?;
    if bone.length < 1e-6 {
        return None;
    }

    // Bone frame before its own rotation: parent pose times rest local.
    let pre = match bone.parent {
        Some(p) => skeleton.pose_global(p) * bone.rest_local(),
        None => bone.rest_local(),
    };
    let inverse = pre.inverse();
    let rest_dir = (bone.rest_tail - bone.rest_head) / bone.length;
    let from = bone.rest_global().inverse().transform_vector3(rest_dir).normalize_or_zero();
    let to = inverse.transform_vector3(target).normalize_or_zero();
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return None;
    }

    if from.dot(to) > ALIGNED_DOT {
        return Some(Vec3::ZERO);
    }
    let degrees = quat_to_euler_degrees(Quat::from_rotation_arc(from, to));
    degrees.is_finite().then_some(degrees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneDefinition;

    fn arm_rig() -> Skeleton {
        Skeleton::from_definitions(&[
            BoneDefinition::new("spine", None, Vec3::ZERO, Vec3::Y),
            BoneDefinition::new("upperarm_l", Some("spine"), Vec3::Y, Vec3::new(1.0, 1.0, 0.0)),
            BoneDefinition::new("lowerarm_l", Some("upperarm_l"), Vec3::new(1.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0)),
        ])
        .unwrap()
    }

    fn posed_direction(skeleton: &Skeleton, name: &str) -> Vec3 {
        let i = skeleton.find(name).unwrap();
        (skeleton.posed_tail(i) - skeleton.posed_head(i)).normalize()
    }

    #[test]
    fn child_is_aligned_inside_its_swung_parent() {
        let mut skeleton = arm_rig();
        // Image coordinates: elbow straight below the shoulder, wrist to the side.
        let targets = JointTargets::new()
            .with("r_shoulder", Vec3::new(0.0, 0.0, 0.0))
            .with("r_elbow", Vec3::new(0.0, 10.0, 0.0))
            .with("r_wrist", Vec3::new(10.0, 10.0, 0.0));
        let pose = targets.resolve(&mut skeleton);

        assert!(pose.get("upperarm_l").is_some());
        assert!(pose.get("lowerarm_l").is_some());
        assert!(pose.get("spine").is_none());
        assert!((posed_direction(&skeleton, "upperarm_l") - Vec3::NEG_Y).length() < 1e-3);
        assert!((posed_direction(&skeleton, "lowerarm_l") - Vec3::X).length() < 1e-3);
    }

    #[test]
    fn target_along_rest_direction_needs_no_rotation() {
        let mut skeleton = arm_rig();
        skeleton.set_local_rotation(0, Vec3::new(0.0, 0.0, 10.0));
        let targets = JointTargets::new()
            .with("r_shoulder", Vec3::ZERO)
            .with("r_elbow", Vec3::new(5.0, 0.0, 0.0));
        // Resolving resets the spine, so the arm already points along +X.
        assert!(targets.resolve(&mut skeleton).is_empty());
    }

    #[test]
    fn accepts_wrapped_and_flat_joint_maps() {
        let flat: JointTargets = serde_json::from_str(r#"{"r_shoulder": {"x": 1, "y": 2}}"#).unwrap();
        let wrapped: JointTargets =
            serde_json::from_str(r#"{"joints": {"r_shoulder": {"x": 1, "y": 2, "z": 0}}}"#).unwrap();
        assert_eq!(flat, wrapped);
        assert_eq!(flat.get("r_shoulder"), Some(Vec3::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn direction_flips_image_y() {
        let targets = JointTargets::new()
            .with("r_shoulder", Vec3::new(0.0, 0.0, 0.0))
            .with("r_elbow", Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(targets.direction("r_shoulder", "r_elbow"), Some(Vec3::NEG_Y));
        assert_eq!(targets.direction("r_shoulder", "r_wrist"), None);
        assert_eq!(targets.direction("r_shoulder", "r_shoulder"), None);
    }

    #[test]
    fn every_chain_bone_is_mapped_from_its_start_joint() {
        for &(bone, start, _) in CHAINS {
            assert!(JOINT_BONES.contains(&(start, bone)), "{bone} not mapped from {start}");
        }
    }
}
