//! Shared fixture: a three-bone "stick body" small enough to reason about
//! by hand.
//!
//! ```text
//!            j_neck (0,2,0) ──upperarm_l──▶ j_hand (1,2,0)
//!              │
//!            spine
//!              │
//!            j_mid (0,1,0)
//!              │
//!            root
//!              │
//!            j_root (0,0,0)
//! ```
//!
//! Vertex 8 sits exactly on the shoulder joint and is shared half/half by
//! `spine` and `upperarm_l`. Vertex 9 has no weights (orphan).

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Context;
use glam::Vec3;

use pose_studio::assets::{parse_obj, parse_rig, parse_weights, HumanAssets};
use pose_studio::protocol::PoseService;
use pose_studio::settings::SolverSettings;
use pose_studio::solver::{MorphTarget, MorphTargetSolver};

pub const EPSILON: f32 = 1e-4;

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

pub const BASE_OBJ: &str = "\
v -0.1 0 0
v 0.1 0 0
v -0.1 1 0
v 0.1 1 0
v -0.1 2 0
v 0.1 2 0
v 1 2.1 0
v 1 1.9 0
v 0 2 0
v 1.2 2 0
g body
f 1 2 4 3
f 3 4 6 5
f 6 8 7
g joint-neck
f 5 6 9
";

pub const BASE_VERTEX_COUNT: usize = 10;

pub const RIG: &str = r#"{
    "name": "stick",
    "joints": {
        "j_root": [0, 1],
        "j_mid": [2, 3],
        "j_neck": [4, 5],
        "j_hand": [6, 7]
    },
    "bones": {
        "root": { "head": "j_root", "tail": "j_mid" },
        "spine": { "parent": "root", "head": "j_mid", "tail": "j_neck" },
        "upperarm_l": { "parent": "spine", "head": "j_neck", "tail": "j_hand" }
    }
}"#;

pub const WEIGHTS: &str = r#"{
    "name": "stick",
    "weights": {
        "root": [[0, 1.0], [1, 1.0], [2, 0.5], [3, 0.5]],
        "spine": [[2, 0.5], [3, 0.5], [4, 1.0], [5, 1.0], [8, 0.5]],
        "upperarm_l": [[6, 1.0], [7, 1.0], [8, 0.5]]
    }
}"#;

/// Lengthens the arm for young female bodies.
pub const ARM_TARGET: &str = "universal-female-young-averagemuscle-averageweight";

/// Routes library logs through the test harness; `RUST_LOG=debug` shows them.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn try_stick_assets() -> anyhow::Result<HumanAssets> {
    init_logging();
    let base = parse_obj(BASE_OBJ, "stick.obj").context("fixture obj")?;
    let rig = parse_rig(RIG, "stick.mhskel").context("fixture rig")?;
    let weights = parse_weights(WEIGHTS, "stick.mhw").context("fixture weights")?;
    let target = MorphTarget::new(
        ARM_TARGET,
        vec![(6, Vec3::new(0.2, 0.0, 0.0)), (7, Vec3::new(0.2, 0.0, 0.0))],
    );
    Ok(HumanAssets::from_parts(base, vec![target], rig, weights))
}

pub fn stick_assets() -> HumanAssets {
    try_stick_assets().expect("stick fixture")
}

pub fn stick_solver() -> MorphTargetSolver {
    MorphTargetSolver::new(Arc::new(stick_assets()), SolverSettings::default())
}

pub fn stick_service() -> Arc<PoseService> {
    Arc::new(PoseService::new(Arc::new(stick_solver())))
}
