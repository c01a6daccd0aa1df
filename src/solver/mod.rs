//! Body-shape solving.
//!
//! A [`ShapeSolver`] turns [`ShapeParameters`] into a rest-pose body: the
//! morphed mesh, a skeleton retargeted to it and normalised skinning
//! weights. [`MorphTargetSolver`] is the MakeHuman implementation.

pub mod factors;
pub mod human;
pub mod morph;
pub mod params;

pub use factors::MacroFactors;
pub use human::MorphTargetSolver;
pub use morph::{parse_tags, MorphTarget, TargetGroup, TargetTag};
pub use params::{normalize_age, ShapeParameters};

use crate::errors::Result;
use crate::mesh::{RestMesh, VertexWeights};
use crate::skeleton::Skeleton;

/// A solved rest-pose body.
#[derive(Debug, Clone)]
pub struct SolvedBody {
    pub params: ShapeParameters,
    pub mesh: RestMesh,
    pub skeleton: Skeleton,
    pub weights: VertexWeights,
}

pub trait ShapeSolver: Send + Sync {
    /// Solves the rest body for `params`. Out-of-range parameters and
    /// unusable rigs are errors.
    fn solve(&self, params: &ShapeParameters) -> Result<SolvedBody>;
}
