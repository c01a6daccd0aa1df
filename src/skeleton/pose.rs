//! Pose data: per-bone Euler rotations and named snapshots.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::euler::is_zero_rotation;

/// Manual bone rotations, `bone name → [rx, ry, rz]` in degrees (Z·Y·X order).
///
/// This is the wire format of the `manual_pose` request field and the
/// `bones` field of a [`PoseSnapshot`]. Keys are kept sorted so serialized
/// output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualPose(BTreeMap<String, [f32; 3]>);

impl ManualPose {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, bone: impl Into<String>, degrees: Vec3) -> Self {
        self.set(bone, degrees);
        self
    }

    pub fn set(&mut self, bone: impl Into<String>, degrees: Vec3) {
        self.0.insert(bone.into(), degrees.to_array());
    }

    #[must_use]
    pub fn get(&self, bone: &str) -> Option<Vec3> {
        self.0.get(bone).map(|a| Vec3::from_array(*a))
    }

    pub fn remove(&mut self, bone: &str) -> Option<Vec3> {
        self.0.remove(bone).map(Vec3::from_array)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec3)> {
        self.0.iter().map(|(k, v)| (k.as_str(), Vec3::from_array(*v)))
    }

    /// Returns `true` when no entry carries a non-zero rotation.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.iter().all(|(_, r)| is_zero_rotation(r))
    }

    /// Drops entries whose rotation is zero.
    pub fn retain_non_zero(&mut self) {
        self.0.retain(|_, r| !is_zero_rotation(Vec3::from_array(*r)));
    }

    /// Component-wise sum of `self` on top of `base` (used for relative
    /// requests). Bones only present in `base` keep their base rotation.
    #[must_use]
    pub fn added_to(&self, base: &ManualPose) -> ManualPose {
        let mut out = base.clone();
        for (name, delta) in self.iter() {
            let current = base.get(name).unwrap_or(Vec3::ZERO);
            out.set(name, current + delta);
        }
        out
    }

    /// Returns `false` if any angle is NaN or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, r)| r.is_finite())
    }
}

impl FromIterator<(String, Vec3)> for ManualPose {
    fn from_iter<I: IntoIterator<Item = (String, Vec3)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k, v.to_array())).collect())
    }
}

/// One named pose: bone rotations plus an optional whole-model rotation.
///
/// Snapshots only store bones with a non-zero rotation; see
/// [`PoseSnapshot::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoseSnapshot {
    pub name: String,
    pub bones: ManualPose,
    pub model_rotation: [f32; 3],
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self {
            name: "Pose 1".to_string(),
            bones: ManualPose::default(),
            model_rotation: [0.0; 3],
        }
    }
}

impl PoseSnapshot {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn model_rotation(&self) -> Vec3 {
        Vec3::from_array(self.model_rotation)
    }

    /// Removes zero rotations and sanitises non-finite angles.
    pub fn normalize(&mut self) {
        if !Vec3::from_array(self.model_rotation).is_finite() {
            self.model_rotation = [0.0; 3];
        }
        let bones: ManualPose = self
            .bones
            .iter()
            .filter(|(_, r)| r.is_finite())
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.bones = bones;
        self.bones.retain_non_zero();
    }
}
