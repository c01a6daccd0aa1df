use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::factors::MacroFactors;
use super::params::ShapeParameters;
use super::{ShapeSolver, SolvedBody};
use crate::assets::weights::BoneWeightList;
use crate::assets::HumanAssets;
use crate::errors::Result;
use crate::mesh::{triangulate, RestMesh, VertexWeights};
use crate::settings::SolverSettings;
use crate::skeleton::Skeleton;

/// Shape solver driven by MakeHuman macro morph targets.
///
/// Each solve morphs the base mesh, places the rig joints on the morphed
/// vertices and binds the retargeted weights to the resulting skeleton.
pub struct MorphTargetSolver {
    assets: Arc<HumanAssets>,
    settings: SolverSettings,
    /// Weights resolved onto rig bone names; independent of shape.
    bone_weights: Vec<(String, BoneWeightList)>,
}

impl MorphTargetSolver {
    #[must_use]
    pub fn new(assets: Arc<HumanAssets>, settings: SolverSettings) -> Self {
        let bone_weights = assets.weights.retarget(&assets.rig);
        Self {
            assets,
            settings,
            bone_weights,
        }
    }

    #[must_use]
    pub fn assets(&self) -> &HumanAssets {
        &self.assets
    }

    #[must_use]
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Base vertices plus every sufficiently weighted target delta.
    #[must_use]
    pub fn morph_vertices(&self, factors: &MacroFactors) -> Vec<Vec3> {
        let mut vertices = self.assets.base_mesh.vertices.clone();
        let cutoff = self.settings.morph_weight_cutoff;
        for target in &self.assets.targets {
            let weight = target.weight(factors, cutoff);
            if weight <= 0.0 {
                continue;
            }
            let mut skipped = 0usize;
            for &(index, delta) in &target.deltas {
                match vertices.get_mut(index as usize) {
                    Some(v) => *v += delta * weight,
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                log::warn!("Target '{}': {skipped} deltas outside the base mesh", target.name);
            }
        }
        vertices
    }

    /// Visible faces for the given gender, split into triangles.
    #[must_use]
    pub fn visible_triangles(&self, gender: f32) -> Vec<[u32; 3]> {
        let mesh = &self.assets.base_mesh;
        let mut triangles = Vec::with_capacity(mesh.faces.len() * 2);
        for (i, face) in mesh.faces.iter().enumerate() {
            if self.settings.is_group_visible(mesh.group_of(i), gender) {
                triangulate(face, &mut triangles);
            }
        }
        triangles
    }
}

impl ShapeSolver for MorphTargetSolver {
    fn solve(&self, params: &ShapeParameters) -> Result<SolvedBody> {
        params.validate()?;
        let factors = MacroFactors::new(params);

        let vertices = self.morph_vertices(&factors);
        let triangles = self.visible_triangles(params.gender);

        let definitions = self.assets.rig.bone_definitions(&vertices);
        let skeleton = Skeleton::from_definitions(&definitions)?;

        let index_of: FxHashMap<&str, usize> = skeleton
            .bones()
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.as_str(), i))
            .collect();
        let entries = self.bone_weights.iter().flat_map(|(name, list)| {
            let bone = index_of.get(name.as_str()).copied();
            list.iter()
                .filter_map(move |&(v, w)| bone.map(|b| (b, v, w)))
        });
        let weights = VertexWeights::from_entries(
            entries,
            &vertices,
            &skeleton,
            self.settings.weight_threshold,
            self.settings.max_influences,
        );

        log::debug!(
            "Solved body: age {:.3} (normalised), {} vertices, {} triangles, {} bones",
            params.normalized_age(),
            vertices.len(),
            triangles.len(),
            skeleton.len()
        );

        Ok(SolvedBody {
            params: *params,
            mesh: RestMesh::new(vertices, triangles),
            skeleton,
            weights,
        })
    }
}
