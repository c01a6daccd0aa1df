//! Studio Settings
//!
//! Configuration for every subsystem lives in one serde-friendly tree rooted
//! at [`StudioSettings`]. Every struct implements [`Default`] and is marked
//! `#[serde(default)]`, so a JSON file only needs to mention the values it
//! overrides and unknown keys are ignored.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pose_studio::settings::{StudioSettings, DragSolverSettings};
//!
//! let settings = StudioSettings::default();
//!
//! // Finer screen-space solver for high-DPI canvases.
//! let settings = StudioSettings {
//!     drag_solver: DragSolverSettings { min_step_degrees: 0.05, ..Default::default() },
//!     ..Default::default()
//! };
//!
//! // Or from JSON
//! let settings = StudioSettings::from_json_str(r#"{ "picking": { "bone_radius_px": 14 } }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::canvas::CanvasCalibration;
use crate::errors::Result;
use crate::interaction::{CameraState, OrbitControls};

// ---------------------------------------------------------------------------
// StudioSettings
// ---------------------------------------------------------------------------

/// Root configuration passed to [`PoseEditor::init`](crate::editor::PoseEditor::init).
/// The `solver` section also configures [`MorphTargetSolver`](crate::solver::MorphTargetSolver).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioSettings {
    pub solver: SolverSettings,
    pub rotation: RotationSettings,
    pub drag_solver: DragSolverSettings,
    pub picking: PickingSettings,
    pub canvas: CanvasCalibration,
    /// Camera the editor starts with.
    pub camera: CameraState,
    pub orbit: OrbitControls,
}

impl StudioSettings {
    /// Parses settings from a JSON document. Missing keys fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// SolverSettings
// ---------------------------------------------------------------------------

/// Controls how the shape solver morphs the base mesh and builds the rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Face groups that make up the visible body.
    pub visible_groups: Vec<String>,
    /// Face groups with one of these prefixes are never emitted.
    pub hidden_group_prefixes: Vec<String>,
    /// Face group that is only visible when `gender >= genital_gender_threshold`.
    pub genital_group: String,
    pub genital_gender_threshold: f32,
    /// Morph targets whose combined factor weight is below this are skipped.
    pub morph_weight_cutoff: f32,
    /// Per-vertex bone weights below this are discarded before normalisation.
    pub weight_threshold: f32,
    /// Maximum number of bone influences kept per vertex.
    pub max_influences: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            visible_groups: [
                "body",
                "helper-r-eye",
                "helper-l-eye",
                "helper-upper-teeth",
                "helper-lower-teeth",
                "helper-tongue",
                "helper-genital",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            hidden_group_prefixes: vec!["joint-".to_string()],
            genital_group: "helper-genital".to_string(),
            genital_gender_threshold: 0.99,
            morph_weight_cutoff: 0.001,
            weight_threshold: 1e-4,
            max_influences: crate::mesh::MAX_INFLUENCES,
        }
    }
}

impl SolverSettings {
    /// Returns `true` when faces of `group` should be emitted for a body with
    /// the given gender value.
    #[must_use]
    pub fn is_group_visible(&self, group: &str, gender: f32) -> bool {
        let group = group.trim();
        if self.hidden_group_prefixes.iter().any(|p| group.starts_with(p.as_str())) {
            return false;
        }
        if group == self.genital_group && gender < self.genital_gender_threshold {
            return false;
        }
        self.visible_groups.iter().any(|g| g == group)
    }
}

// ---------------------------------------------------------------------------
// RotationSettings
// ---------------------------------------------------------------------------

/// Camera-relative drag rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Degrees of rotation per pixel of pointer travel.
    pub degrees_per_pixel: f32,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self { degrees_per_pixel: 0.5 }
    }
}

// ---------------------------------------------------------------------------
// DragSolverSettings
// ---------------------------------------------------------------------------

/// Screen-space coordinate descent used for drag-to-point posing.
///
/// Trial steps start at `initial_step_degrees` and are multiplied by
/// `step_shrink` until they fall below `min_step_degrees`
/// (5°, 3.75°, 2.81°, ... with the defaults).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragSolverSettings {
    pub initial_step_degrees: f32,
    pub step_shrink: f32,
    pub min_step_degrees: f32,
    /// Size of the signed probe used to pick a direction on each axis.
    pub probe_degrees: f32,
    /// Full x/y/z sweeps per pointer-move event.
    pub iterations: usize,
}

impl Default for DragSolverSettings {
    fn default() -> Self {
        Self {
            initial_step_degrees: 5.0,
            step_shrink: 0.75,
            min_step_degrees: 0.1,
            probe_degrees: 0.1,
            iterations: 4,
        }
    }
}

impl DragSolverSettings {
    /// The decreasing sequence of trial step sizes, in degrees. A
    /// non-finite initial step falls back to the default.
    #[must_use]
    pub fn step_schedule(&self) -> Vec<f32> {
        let shrink = self.step_shrink.clamp(0.05, 0.95);
        let min = self.min_step_degrees.max(1e-4);
        let mut step = if self.initial_step_degrees.is_finite() {
            self.initial_step_degrees
        } else {
            log::warn!("Non-finite initial drag step; using the default");
            Self::default().initial_step_degrees
        };
        let mut steps = Vec::new();
        while step.is_finite() && step >= min {
            steps.push(step);
            step *= shrink;
        }
        steps
    }
}

// ---------------------------------------------------------------------------
// PickingSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingSettings {
    /// Maximum screen distance (pixels) between pointer and a projected bone
    /// segment for the bone to be picked.
    pub bone_radius_px: f32,
}

impl Default for PickingSettings {
    fn default() -> Self {
        Self { bone_radius_px: 10.0 }
    }
}
