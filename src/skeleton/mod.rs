//! Bone hierarchy, rest frames and pose propagation.
//!
//! - [`Skeleton`]: parents-first bone storage with cached global and
//!   skinning matrices
//! - [`Bone`] / [`BoneDefinition`]: rest data as produced by the shape solver
//! - [`ManualPose`] / [`PoseSnapshot`]: Euler pose data as it travels on the
//!   wire and in persisted state
//! - [`euler`]: the fixed Z·Y·X Euler convention
//! - [`transfer`]: OpenPose joint targets resolved into a manual pose

pub mod bone;
pub mod euler;
pub mod pose;
#[allow(clippy::module_inception)]
pub mod skeleton;
pub mod transfer;

pub use bone::{rest_matrix, Bone, BoneDefinition};
pub use pose::{ManualPose, PoseSnapshot};
pub use skeleton::Skeleton;
pub use transfer::JointTargets;
