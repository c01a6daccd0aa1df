//! Drag-to-point posing by greedy coordinate descent on reprojection error.
//!
//! A point grabbed on the mesh is pinned in its bone's local frame. Each
//! pointer move nudges that bone's Euler angles one axis at a time so the
//! pinned point's projection approaches the pointer:
//!
//! ```text
//! for iteration in 0..iterations:
//!     for axis in [x, y, z]:
//!         for step in schedule (5°, 3.75°, ...):
//!             probe ±probe_degrees, measure, revert
//!             apply step in the better direction
//!             keep it if the distance strictly shrinks, else revert
//! ```
//!
//! This is a local hill climb, not an IK solve: it can stall in local
//! minima but never makes the distance worse.

use glam::{Vec2, Vec3};

use super::camera::ViewProjection;
use crate::settings::DragSolverSettings;
use crate::skeleton::bone::is_singular;
use crate::skeleton::Skeleton;

/// Distances below this (pixels) count as reached.
const CONVERGED_PX: f32 = 0.5;

/// A point pinned to a bone, stored in the bone's posed local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub bone: usize,
    pub local: Vec3,
}

impl DragAnchor {
    /// Pins the world-space point `hit` to `bone` in its current pose.
    #[must_use]
    pub fn new(skeleton: &Skeleton, bone: usize, hit: Vec3) -> Option<Self> {
        if bone >= skeleton.len() {
            return None;
        }
        let global = skeleton.evaluate_pose_global(bone);
        if is_singular(&global) {
            return None;
        }
        Some(Self {
            bone,
            local: global.inverse().transform_point3(hit),
        })
    }

    /// World position of the anchor under the skeleton's current local
    /// rotations.
    #[must_use]
    pub fn world(&self, skeleton: &Skeleton) -> Vec3 {
        skeleton.evaluate_pose_global(self.bone).transform_point3(self.local)
    }
}

/// Outcome of one [`ScreenSpaceDragSolver::solve`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescentReport {
    pub initial_distance: f32,
    pub final_distance: f32,
    /// Distance after each committed step, in order.
    pub committed: Vec<f32>,
    pub iterations: usize,
}

impl DescentReport {
    #[must_use]
    pub fn improved(&self) -> bool {
        !self.committed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSpaceDragSolver {
    settings: DragSolverSettings,
    schedule: Vec<f32>,
}

impl ScreenSpaceDragSolver {
    #[must_use]
    pub fn new(settings: DragSolverSettings) -> Self {
        Self {
            schedule: settings.step_schedule(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DragSolverSettings {
        &self.settings
    }

    /// Screen distance between the projected anchor and `pointer`. An anchor
    /// behind the camera is infinitely far.
    #[must_use]
    pub fn distance(skeleton: &Skeleton, anchor: &DragAnchor, view: &ViewProjection, pointer: Vec2) -> f32 {
        view.project(anchor.world(skeleton))
            .map_or(f32::INFINITY, |p| p.distance(pointer))
    }

    /// Rotates the anchor's bone so its projection moves toward `pointer`.
    ///
    /// Probes are applied and reverted on `skeleton` in place; the skeleton
    /// is left holding only committed steps and is updated before return.
    pub fn solve(
        &self,
        skeleton: &mut Skeleton,
        anchor: &DragAnchor,
        view: &ViewProjection,
        pointer: Vec2,
    ) -> DescentReport {
        let bone = anchor.bone;
        let mut report = DescentReport::default();
        if bone >= skeleton.len() {
            return report;
        }

        let measure = |skeleton: &mut Skeleton, rotation: Vec3| {
            skeleton.set_local_rotation(bone, rotation);
            Self::distance(skeleton, anchor, view, pointer)
        };

        let mut current = Self::distance(skeleton, anchor, view, pointer);
        report.initial_distance = current;

        for _ in 0..self.settings.iterations {
            if current <= CONVERGED_PX {
                break;
            }
            report.iterations += 1;
            let mut any_committed = false;

            for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
                for &step in &self.schedule {
                    let base = skeleton.local_rotation(bone);
                    let probe = axis * self.settings.probe_degrees;
                    let plus = measure(skeleton, base + probe);
                    let minus = measure(skeleton, base - probe);

                    let sign = if plus <= minus { 1.0 } else { -1.0 };
                    let trial = measure(skeleton, base + axis * (step * sign));
                    if trial < current {
                        current = trial;
                        report.committed.push(trial);
                        any_committed = true;
                        break;
                    }
                    skeleton.set_local_rotation(bone, base);
                }
            }

            if !any_committed {
                break;
            }
        }

        skeleton.update();
        report.final_distance = current;
        report
    }
}
