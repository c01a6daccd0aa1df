//! Asset loading for the MakeHuman body model.
//!
//! - [`obj`]: base mesh (`3dobjs/base.obj`)
//! - [`target`]: macro morph targets (`targets/{macrodetails,breast,genitals}`)
//! - [`rig`]: skeleton definition (`rigs/game_engine.mhskel`, falling back to
//!   `rigs/default.mhskel`)
//! - [`weights`]: skinning weights (`.mhw`)
//! - [`AssetCache`]: explicit, path-keyed sharing of loaded data
//!
//! [`HumanAssets`] bundles everything a [`MorphTargetSolver`](crate::solver::MorphTargetSolver)
//! needs and is injected into it rather than looked up globally.

pub mod cache;
pub mod obj;
pub mod rig;
pub mod target;
pub mod weights;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cache::AssetCache;
pub use obj::{load_obj, parse_obj, ObjMesh};
pub use rig::{load_rig, parse_rig, RigBone, RigDefinition};
pub use target::{load_target, parse_target};
pub use weights::{load_weights, parse_weights, WeightsFile};

use crate::errors::{PoseError, Result};
use crate::solver::morph::{MorphTarget, TargetGroup};

const RIG_CANDIDATES: [&str; 2] = ["game_engine.mhskel", "default.mhskel"];
const DEFAULT_WEIGHTS: &str = "default_weights.mhw";

/// Everything loaded from a MakeHuman data directory.
#[derive(Debug, Clone)]
pub struct HumanAssets {
    pub base_mesh: ObjMesh,
    pub targets: Vec<MorphTarget>,
    pub rig: RigDefinition,
    pub weights: WeightsFile,
}

impl HumanAssets {
    /// Assembles assets that were loaded or generated elsewhere.
    #[must_use]
    pub fn from_parts(
        base_mesh: ObjMesh,
        targets: Vec<MorphTarget>,
        rig: RigDefinition,
        weights: WeightsFile,
    ) -> Self {
        Self {
            base_mesh,
            targets,
            rig,
            weights,
        }
    }

    /// Loads the standard layout below `root`.
    ///
    /// `root` may be a MakeHuman checkout (`<root>/makehuman/data`), an
    /// installation (`<root>/data`) or the data directory itself.
    pub fn load(root: &Path) -> Result<Self> {
        let data = resolve_data_dir(root)
            .ok_or_else(|| PoseError::AssetNotFound(format!("3dobjs/base.obj below {}", root.display())))?;
        log::info!("Loading MakeHuman assets from {}", data.display());

        let base_mesh = load_obj(&data.join("3dobjs").join("base.obj"))?;

        let mut targets = Vec::new();
        for group in TargetGroup::ALL {
            let dir = data.join("targets").join(group.folder());
            if !dir.is_dir() {
                log::warn!("Target folder not found: {}", dir.display());
                continue;
            }
            for path in target_files(&dir)? {
                let target = load_target(&path)?;
                if target.is_macro_target(group) && !target.deltas.is_empty() {
                    targets.push(target);
                }
            }
        }

        let rig_dir = data.join("rigs");
        let rig_path = RIG_CANDIDATES
            .iter()
            .map(|f| rig_dir.join(f))
            .find(|p| p.is_file())
            .ok_or_else(|| PoseError::AssetNotFound(format!("rig in {}", rig_dir.display())))?;
        let rig = load_rig(&rig_path)?;

        let weights_path = rig
            .weights_file
            .as_ref()
            .map_or_else(|| rig_dir.join(DEFAULT_WEIGHTS), |f| rig_dir.join(f));
        let weights = if weights_path.is_file() {
            load_weights(&weights_path)?
        } else {
            log::warn!(
                "Weights file not found: {}; every vertex binds to its nearest bone",
                weights_path.display()
            );
            WeightsFile::default()
        };

        log::info!(
            "Loaded {} vertices, {} morph targets, {} bones",
            base_mesh.vertices.len(),
            targets.len(),
            rig.bones.len()
        );

        Ok(Self {
            base_mesh,
            targets,
            rig,
            weights,
        })
    }

    /// [`HumanAssets::load`] through a cache keyed by `root`.
    pub fn load_cached(cache: &AssetCache<HumanAssets>, root: &Path) -> Result<Arc<Self>> {
        cache.get_or_load(root, Self::load)
    }
}

fn resolve_data_dir(root: &Path) -> Option<PathBuf> {
    [root.join("makehuman").join("data"), root.join("data"), root.to_path_buf()]
        .into_iter()
        .find(|dir| dir.join("3dobjs").join("base.obj").is_file())
}

/// All `.target` files below `dir`, sorted for a deterministic order.
fn target_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "target") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}
