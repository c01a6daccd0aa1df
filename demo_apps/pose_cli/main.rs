//! Pose CLI
//!
//! Answers one pose request against a MakeHuman data directory, the same way
//! the HTTP endpoints do.
//!
//! ```text
//! echo '{"age": 30, "manual_pose": {"upperarm_l": [0, 0, 60]}}' | pose_cli ./makehuman
//! echo '{"gender": 1.0}' | pose_cli ./makehuman skeleton
//! ```
//!
//! Set `RUST_LOG=debug` to see asset loading and solve timings.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use pose_studio::settings::StudioSettings;
use pose_studio::solver::ShapeParameters;
use pose_studio::{HumanAssets, MorphTargetSolver, PoseService};

enum Endpoint {
    Pose,
    Skeleton,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(data_dir) = args.next().map(PathBuf::from) else {
        bail!("usage: pose_cli <makehuman dir> [pose|skeleton] [settings.json] < request.json");
    };
    let endpoint = match args.next().as_deref() {
        None | Some("pose") => Endpoint::Pose,
        Some("skeleton") => Endpoint::Skeleton,
        Some(other) => bail!("unknown endpoint '{other}'"),
    };
    let settings = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            StudioSettings::from_json_str(&json)?
        }
        None => StudioSettings::default(),
    };

    let started = Instant::now();
    let assets = HumanAssets::load(&data_dir).with_context(|| format!("loading assets from {}", data_dir.display()))?;
    log::info!("Assets ready in {:?}", started.elapsed());

    let solver = MorphTargetSolver::new(Arc::new(assets), settings.solver.clone());
    let service = PoseService::new(Arc::new(solver));

    let mut body = String::new();
    std::io::stdin().read_to_string(&mut body).context("reading request from stdin")?;

    let started = Instant::now();
    let out = match endpoint {
        Endpoint::Pose => service.handle_json(&body),
        Endpoint::Skeleton => {
            let shape: ShapeParameters = if body.trim().is_empty() {
                ShapeParameters::default()
            } else {
                serde_json::from_str(&body).context("parsing shape parameters")?
            };
            serde_json::to_string(&service.skeleton(&shape))?
        }
    };
    log::debug!("Request answered in {:?}", started.elapsed());

    println!("{out}");
    Ok(())
}
