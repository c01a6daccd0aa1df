//! JSON wire schema of the pose endpoint.
//!
//! Requests carry shape parameters plus an optional manual pose or
//! OpenPose joint targets. Responses
//! carry the posed mesh and posed bones computed in one pass. Vertex and
//! normal arrays are accepted flat (`[x, y, z, x, y, z, ...]`) or nested
//! (`[[x, y, z], ...]`) and normalised to [`Vec3List`] on ingress; they are
//! always emitted nested.

use std::collections::BTreeMap;

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::skeleton::{JointTargets, ManualPose};
use crate::skinning::PosedBone;
use crate::solver::ShapeParameters;

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseRequest {
    #[serde(flatten)]
    pub shape: ShapeParameters,
    #[serde(deserialize_with = "null_as_default")]
    pub manual_pose: ManualPose,
    /// When set, `manual_pose` holds deltas added onto `base_pose`.
    pub relative: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_pose: Option<ManualPose>,
    /// Whole-model Z·Y·X rotation in degrees, about the posed centroid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_rotation: Option<[f32; 3]>,
    /// OpenPose joint positions, used only when `manual_pose` is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<JointTargets>,
}

impl PoseRequest {
    #[must_use]
    pub fn new(shape: ShapeParameters, manual_pose: ManualPose) -> Self {
        Self {
            shape,
            manual_pose,
            ..Default::default()
        }
    }

    /// The absolute pose this request asks for. Joint targets are not
    /// included; they need the solved skeleton to resolve.
    #[must_use]
    pub fn effective_pose(&self) -> ManualPose {
        if self.relative {
            self.manual_pose.added_to(self.base_pose.as_ref().unwrap_or(&ManualPose::default()))
        } else {
            self.manual_pose.clone()
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBone {
    pub name: String,
    pub parent: Option<String>,
    pub head_pos: [f32; 3],
    pub tail_pos: [f32; 3],
    #[serde(default)]
    pub length: f32,
    /// Rest frame as 16 column-major floats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_matrix: Option<[f32; 16]>,
}

impl From<&PosedBone> for WireBone {
    fn from(bone: &PosedBone) -> Self {
        Self {
            name: bone.name.clone(),
            parent: bone.parent.clone(),
            head_pos: bone.head.to_array(),
            tail_pos: bone.tail.to_array(),
            length: bone.length,
            rest_matrix: Some(glam::Mat4::from(bone.rest_matrix).to_cols_array()),
        }
    }
}

impl WireBone {
    #[must_use]
    pub fn head(&self) -> Vec3 {
        Vec3::from_array(self.head_pos)
    }

    #[must_use]
    pub fn tail(&self) -> Vec3 {
        Vec3::from_array(self.tail_pos)
    }

    /// The rest frame, if it was sent and is affine.
    #[must_use]
    pub fn rest_frame(&self) -> Option<Affine3A> {
        let m = glam::Mat4::from_cols_array(self.rest_matrix.as_ref()?);
        m.is_finite().then(|| Affine3A::from_mat4(m))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireWeights {
    pub indices: Vec<u32>,
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub vertices: Vec3List,
    pub indices: Vec<u32>,
    pub normals: Vec3List,
    pub bones: Vec<WireBone>,
    pub weights: BTreeMap<String, WireWeights>,
    /// The absolute pose that produced this mesh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_pose: Option<ManualPose>,
}

impl PoseResponse {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Bones-only answer of the skeleton endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonesResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub bones: Vec<WireBone>,
}

impl BonesResponse {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            bones: Vec::new(),
        }
    }
}

// ============================================================================
// Vec3List
// ============================================================================

/// A list of points, normalised from either flat or nested JSON arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vec3List(pub Vec<Vec3>);

impl From<Vec<Vec3>> for Vec3List {
    fn from(points: Vec<Vec3>) -> Self {
        Self(points)
    }
}

impl std::ops::Deref for Vec3List {
    type Target = [Vec3];

    fn deref(&self) -> &[Vec3] {
        &self.0
    }
}

impl Serialize for Vec3List {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|v| v.to_array()))
    }
}

impl<'de> Deserialize<'de> for Vec3List {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flat(Vec<f32>),
            Nested(Vec<[f32; 3]>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flat(values) => {
                if values.len() % 3 != 0 {
                    return Err(serde::de::Error::custom(format!(
                        "flat vector array length {} is not a multiple of 3",
                        values.len()
                    )));
                }
                Ok(Self(values.chunks_exact(3).map(Vec3::from_slice).collect()))
            }
            Raw::Nested(values) => Ok(Self(values.into_iter().map(Vec3::from_array).collect())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_nested_vertices_agree() {
        let flat: Vec3List = serde_json::from_str("[0, 1, 2, 3, 4, 5]").unwrap();
        let nested: Vec3List = serde_json::from_str("[[0, 1, 2], [3, 4, 5]]").unwrap();
        assert_eq!(flat, nested);
        assert!(serde_json::from_str::<Vec3List>("[0, 1]").is_err());
    }

    #[test]
    fn request_defaults() {
        let req: PoseRequest = serde_json::from_str(r#"{"manual_pose": null}"#).unwrap();
        assert_eq!(req.shape, ShapeParameters::default());
        assert!(req.manual_pose.is_empty());
        assert!(!req.relative);
    }
}
