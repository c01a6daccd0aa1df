use std::sync::Arc;

use parking_lot::Mutex;

use super::wire::{BonesResponse, PoseRequest, PoseResponse, WireBone, WireWeights};
use crate::errors::Result;
use crate::skeleton::ManualPose;
use crate::skinning::SkinningEngine;
use crate::solver::{ShapeParameters, ShapeSolver, SolvedBody};

/// Server side of the pose protocol.
///
/// Every call solves (or reuses) the rest body for the requested shape and
/// applies the requested pose to a fresh copy of its skeleton, so no pose
/// ever carries over between calls. Mesh and bones in one response come
/// from the same skinning matrices.
pub struct PoseService {
    solver: Arc<dyn ShapeSolver>,
    /// Most recent solve; reused while the shape parameters are unchanged.
    last_body: Mutex<Option<Arc<SolvedBody>>>,
}

impl PoseService {
    pub fn new(solver: Arc<dyn ShapeSolver>) -> Self {
        Self {
            solver,
            last_body: Mutex::new(None),
        }
    }

    /// Solves `shape`, reusing the previous result when the parameters are
    /// identical.
    pub fn body(&self, shape: &ShapeParameters) -> Result<Arc<SolvedBody>> {
        if let Some(body) = self.last_body.lock().as_ref()
            && body.params == *shape
        {
            return Ok(body.clone());
        }
        let body = Arc::new(self.solver.solve(shape)?);
        *self.last_body.lock() = Some(body.clone());
        Ok(body)
    }

    /// Drops the cached solve (e.g. after the assets changed).
    pub fn invalidate(&self) {
        *self.last_body.lock() = None;
    }

    /// Handles one request. Failures become `status: "error"` responses.
    ///
    /// A non-empty `manual_pose` wins over joint targets.
    pub fn handle(&self, request: &PoseRequest) -> PoseResponse {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Pose request failed: {e}");
                PoseResponse::error(e.to_string())
            }
        }
    }

    pub fn try_handle(&self, request: &PoseRequest) -> Result<PoseResponse> {
        let body = self.body(&request.shape)?;
        let mut skeleton = body.skeleton.clone();
        let pose = match &request.pose {
            Some(targets) if request.manual_pose.is_empty() && !targets.is_empty() => targets.resolve(&mut skeleton),
            _ => request.effective_pose(),
        };
        log::debug!("Applying pose with {} bone rotations", pose.len());

        let mut posed = SkinningEngine::apply(&mut skeleton, &body.mesh, &body.weights, &pose);
        if let Some(rotation) = request.model_rotation {
            posed.apply_model_rotation(glam::Vec3::from_array(rotation));
        }

        let weights = body
            .weights
            .per_bone(skeleton.len())
            .into_iter()
            .zip(skeleton.bones())
            .filter(|((indices, _), _)| !indices.is_empty())
            .map(|((indices, weights), bone)| (bone.name.clone(), WireWeights { indices, weights }))
            .collect();

        Ok(PoseResponse {
            vertices: posed.vertices.into(),
            indices: body.mesh.flat_indices(),
            normals: posed.normals.into(),
            bones: posed.bones.iter().map(WireBone::from).collect(),
            weights,
            applied_pose: Some(pose),
            ..Default::default()
        })
    }

    /// Rest-pose bones for `shape`, solved exactly like [`PoseService::handle`].
    pub fn skeleton(&self, shape: &ShapeParameters) -> BonesResponse {
        let result = self.body(shape).map(|body| {
            let mut skeleton = body.skeleton.clone();
            skeleton.apply_pose(&ManualPose::default());
            crate::skinning::posed_bones(&skeleton).iter().map(WireBone::from).collect()
        });
        match result {
            Ok(bones) => BonesResponse {
                bones,
                ..Default::default()
            },
            Err(e) => {
                log::warn!("Skeleton request failed: {e}");
                BonesResponse::error(e.to_string())
            }
        }
    }

    /// JSON in, JSON out. Malformed requests produce an error response.
    pub fn handle_json(&self, body: &str) -> String {
        let response = match serde_json::from_str::<PoseRequest>(body) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                log::warn!("Malformed pose request: {e}");
                PoseResponse::error(format!("malformed request: {e}"))
            }
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|e| format!(r#"{{"status":"error","message":"{e}"}}"#))
    }
}
