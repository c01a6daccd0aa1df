use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::rig::RigDefinition;
use crate::errors::{PoseError, Result};

pub type BoneWeightList = Vec<(u32, f32)>;

/// Raw skinning weights (`.mhw`): for each source bone, `(vertex, weight)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightsFile {
    pub name: String,
    /// Per-bone lists in file order.
    pub bones: Vec<(String, BoneWeightList)>,
}

#[derive(Deserialize)]
struct RawWeights {
    #[serde(default)]
    name: String,
    weights: Map<String, Value>,
}

pub fn load_weights(path: &Path) -> Result<WeightsFile> {
    let source = std::fs::read_to_string(path)?;
    parse_weights(&source, &path.display().to_string())
}

pub fn parse_weights(source: &str, label: &str) -> Result<WeightsFile> {
    let raw: RawWeights = serde_json::from_str(source)?;
    let mut bones = Vec::with_capacity(raw.weights.len());
    for (bone, value) in raw.weights {
        let pairs: Vec<(u32, f32)> = serde_json::from_value(value)
            .map_err(|e| PoseError::parse("weights", label, 0, format!("bone '{bone}': {e}")))?;
        bones.push((bone, pairs));
    }
    Ok(WeightsFile { name: raw.name, bones })
}

impl WeightsFile {
    #[must_use]
    pub fn get(&self, bone: &str) -> Option<&BoneWeightList> {
        self.bones.iter().find(|(b, _)| b == bone).map(|(_, w)| w)
    }

    /// Resolves weights onto the bones of `rig`.
    ///
    /// A rig bone with weight references receives the summed weights of the
    /// referenced source bones; otherwise it takes the source bone of the
    /// same name. Source bones that map to nothing are dropped.
    #[must_use]
    pub fn retarget(&self, rig: &RigDefinition) -> Vec<(String, BoneWeightList)> {
        let mut out = Vec::with_capacity(rig.bones.len());
        for bone in &rig.bones {
            let sources = bone.weight_sources();
            if sources.is_empty() {
                if let Some(list) = self.get(&bone.name) {
                    out.push((bone.name.clone(), list.clone()));
                }
                continue;
            }

            let mut merged: Vec<(u32, f32)> = Vec::new();
            for source in sources {
                let Some(list) = self.get(source) else {
                    continue;
                };
                merged.extend_from_slice(list);
            }
            if merged.is_empty() {
                continue;
            }
            merged.sort_by_key(|(v, _)| *v);
            merged.dedup_by(|next, kept| {
                if next.0 == kept.0 {
                    kept.1 += next.1;
                    true
                } else {
                    false
                }
            });
            out.push((bone.name.clone(), merged));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::rig::parse_rig;

    #[test]
    fn references_are_merged() {
        let weights = parse_weights(
            r#"{"weights": {"upperarm01.L": [[0, 0.5], [1, 1.0]], "upperarm02.L": [[0, 0.25]], "spine": [[2, 1.0]]}}"#,
            "w",
        )
        .unwrap();
        let rig = parse_rig(
            r#"{"joints": {}, "bones": {
                "spine": {"head": "a", "tail": "b"},
                "upperarm_l": {"parent": "spine", "head": "a", "tail": "b",
                               "weights_reference": ["upperarm01.L", "upperarm02.L"]}
            }}"#,
            "r",
        )
        .unwrap();
        let out = weights.retarget(&rig);
        assert_eq!(out[0], ("spine".to_string(), vec![(2, 1.0)]));
        assert_eq!(out[1], ("upperarm_l".to_string(), vec![(0, 0.75), (1, 1.0)]));
    }
}
