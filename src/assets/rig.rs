//! MakeHuman rig definitions (`.mhskel` JSON).
//!
//! A rig names joints as groups of base-mesh vertices. Bones connect a head
//! joint to a tail joint and may name rotation planes (three joints whose
//! triangle defines the bone roll) plus reference bones whose skinning
//! weights they take over.

use std::path::Path;

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::{PoseError, Result};
use crate::skeleton::BoneDefinition;

#[derive(Debug, Clone, PartialEq)]
pub struct RigBone {
    pub name: String,
    pub parent: Option<String>,
    pub head_joint: String,
    pub tail_joint: String,
    pub rotation_planes: Vec<String>,
    pub reference: Vec<String>,
    pub weights_reference: Vec<String>,
}

impl RigBone {
    /// Bones whose weights this bone takes over. `weights_reference` wins
    /// over `reference`.
    #[must_use]
    pub fn weight_sources(&self) -> &[String] {
        if self.weights_reference.is_empty() {
            &self.reference
        } else {
            &self.weights_reference
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigDefinition {
    pub name: String,
    /// Bones in definition order.
    pub bones: Vec<RigBone>,
    pub joints: FxHashMap<String, Vec<u32>>,
    pub planes: FxHashMap<String, [String; 3]>,
    pub weights_file: Option<String>,
}

#[derive(Deserialize)]
struct RigFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    joints: Map<String, Value>,
    #[serde(default)]
    planes: Map<String, Value>,
    bones: Map<String, Value>,
    #[serde(default)]
    weights_file: Option<String>,
}

#[derive(Deserialize)]
struct BoneEntry {
    #[serde(default)]
    parent: Option<String>,
    head: String,
    tail: String,
    #[serde(default)]
    rotation_plane: Value,
    #[serde(default)]
    reference: Value,
    #[serde(default)]
    weights_reference: Value,
}

pub fn load_rig(path: &Path) -> Result<RigDefinition> {
    let source = std::fs::read_to_string(path)?;
    parse_rig(&source, &path.display().to_string())
}

pub fn parse_rig(source: &str, label: &str) -> Result<RigDefinition> {
    let file: RigFile = serde_json::from_str(source)?;

    let mut joints = FxHashMap::default();
    for (name, value) in file.joints {
        let indices: Vec<u32> = serde_json::from_value(value)
            .map_err(|e| PoseError::parse("rig", label, 0, format!("joint '{name}': {e}")))?;
        if !indices.is_empty() {
            joints.insert(name, indices);
        }
    }

    let mut planes = FxHashMap::default();
    for (name, value) in file.planes {
        let list = string_list(&value);
        if let [a, b, c, ..] = list.as_slice() {
            planes.insert(name, [a.clone(), b.clone(), c.clone()]);
        } else {
            log::warn!("Rig '{label}': plane '{name}' needs three joints");
        }
    }

    let mut bones = Vec::with_capacity(file.bones.len());
    for (name, value) in file.bones {
        let entry: BoneEntry = serde_json::from_value(value)
            .map_err(|e| PoseError::parse("rig", label, 0, format!("bone '{name}': {e}")))?;
        bones.push(RigBone {
            name,
            parent: entry.parent.filter(|p| !p.is_empty()),
            head_joint: entry.head,
            tail_joint: entry.tail,
            rotation_planes: string_list(&entry.rotation_plane),
            reference: string_list(&entry.reference),
            weights_reference: string_list(&entry.weights_reference),
        });
    }

    if bones.is_empty() {
        return Err(PoseError::parse("rig", label, 0, "rig has no bones"));
    }

    log::debug!("Parsed rig '{label}': {} bones, {} joints", bones.len(), joints.len());
    Ok(RigDefinition {
        name: file.name.unwrap_or_else(|| "Skeleton".to_string()),
        bones,
        joints,
        planes,
        weights_file: file.weights_file.filter(|f| !f.is_empty()),
    })
}

/// Accepts a string, a list of strings (nulls ignored) or anything else
/// (empty).
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(ToString::to_string)).collect(),
        _ => Vec::new(),
    }
}

impl RigDefinition {
    /// Mean position of a joint's vertex group on `vertices`.
    #[must_use]
    pub fn joint_position(&self, joint: &str, vertices: &[Vec3]) -> Option<Vec3> {
        let group = self.joints.get(joint)?;
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for &i in group {
            if let Some(v) = vertices.get(i as usize) {
                sum += *v;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f32)
    }

    fn joint_or_origin(&self, joint: &str, vertices: &[Vec3]) -> Vec3 {
        self.joint_position(joint, vertices).unwrap_or_else(|| {
            log::warn!("Rig '{}': unknown joint '{joint}', using origin", self.name);
            Vec3::ZERO
        })
    }

    /// Normal of a rotation plane. Unknown planes yield `+Z`.
    #[must_use]
    pub fn plane_normal(&self, plane: &str, vertices: &[Vec3]) -> Vec3 {
        let Some([j1, j2, j3]) = self.planes.get(plane) else {
            log::warn!("Rig '{}': unknown rotation plane '{plane}'", self.name);
            return Vec3::Z;
        };
        let p1 = self.joint_or_origin(j1, vertices);
        let p2 = self.joint_or_origin(j2, vertices);
        let p3 = self.joint_or_origin(j3, vertices);
        let along = (p2 - p1).normalize_or_zero();
        let across = (p3 - p2).normalize_or_zero();
        across.cross(along).normalize_or_zero()
    }

    /// Bone definitions with joints placed on the (morphed) `vertices`.
    #[must_use]
    pub fn bone_definitions(&self, vertices: &[Vec3]) -> Vec<BoneDefinition> {
        self.bones
            .iter()
            .map(|bone| {
                let head = self.joint_or_origin(&bone.head_joint, vertices);
                let tail = self.joint_or_origin(&bone.tail_joint, vertices);
                let normal = if bone.rotation_planes.is_empty() {
                    Vec3::Z
                } else {
                    bone.rotation_planes
                        .iter()
                        .map(|p| self.plane_normal(p, vertices))
                        .sum::<Vec3>()
                        .normalize_or_zero()
                };
                BoneDefinition::new(bone.name.clone(), bone.parent.as_deref(), head, tail).with_roll_normal(normal)
            })
            .collect()
    }
}
