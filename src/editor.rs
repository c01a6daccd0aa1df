//! Host-agnostic interactive pose editor.
//!
//! [`PoseEditor`] owns the client-side skeleton rebuilt from the latest
//! [`PosedFrame`], the camera and one drag gesture at a time. A host feeds
//! it pointer events and reacts to the returned [`EditorEvent`]s:
//!
//! - `PoseChanged`: transient, send a pose request but do not persist
//! - `Committed`: the gesture ended, persist the pose
//!
//! Two skeletons are kept. The displayed one is posed exactly as the
//! current frame, so overlays and picking always agree with the rendered
//! mesh. The working one carries local edits that are still waiting for
//! their frame; drags mutate only the working skeleton.
//!
//! ```rust,ignore
//! let mut editor = PoseEditor::init(&settings);
//! if let Some(frame) = client.frame() {
//!     editor.load_frame(frame)?;
//! }
//! match editor.pointer_move(position, buttons) {
//!     EditorEvent::PoseChanged(pose) => client.request(editor.request(&shape))?,
//!     EditorEvent::Committed(pose) => sync.commit_pose(pose),
//!     _ => {}
//! }
//! ```

use std::sync::Arc;

use glam::{Affine3A, Vec2, Vec3};

use crate::canvas::CanvasPlacement;
use crate::errors::{PoseError, Result};
use crate::interaction::picking::{dominant_bone, pick_bone, pick_mesh};
use crate::interaction::{
    CameraRelativeRotation, CameraState, DragAnchor, DragGesture, DragTarget, GestureUpdate, OrbitControls,
    PointerButtons, PointerEvent, PointerEventKind, ScreenSpaceDragSolver, ViewProjection,
};
use crate::mesh::VertexWeights;
use crate::protocol::{PoseRequest, PosedFrame};
use crate::settings::StudioSettings;
use crate::skeleton::{BoneDefinition, ManualPose, Skeleton};
use crate::solver::ShapeParameters;

/// How a pointer drag on the body poses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Camera-relative rotation of the picked bone.
    #[default]
    Rotate,
    /// Grab a point on the mesh and pull it toward the pointer.
    DragToPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    None,
    CameraChanged,
    /// The pose changed during a drag. Not yet committed.
    PoseChanged(ManualPose),
    /// A pose drag ended; this is the pose to keep.
    Committed(ManualPose),
}

pub struct PoseEditor {
    settings: StudioSettings,
    camera: CameraState,
    orbit: OrbitControls,
    rotation: CameraRelativeRotation,
    solver: ScreenSpaceDragSolver,
    gesture: DragGesture,
    mode: EditMode,
    viewport: Vec2,

    displayed: Option<Skeleton>,
    working: Option<Skeleton>,
    weights: VertexWeights,
    frame: Option<Arc<PosedFrame>>,
    pose: ManualPose,
    selected: Option<usize>,
    disposed: bool,
}

impl PoseEditor {
    #[must_use]
    pub fn init(settings: &StudioSettings) -> Self {
        Self {
            camera: settings.camera,
            orbit: settings.orbit,
            rotation: CameraRelativeRotation::new(settings.rotation),
            solver: ScreenSpaceDragSolver::new(settings.drag_solver),
            gesture: DragGesture::new(),
            mode: EditMode::default(),
            viewport: Vec2::new(512.0, 512.0),
            displayed: None,
            working: None,
            weights: VertexWeights::default(),
            frame: None,
            pose: ManualPose::new(),
            selected: None,
            disposed: false,
            settings: settings.clone(),
        }
    }

    /// Releases the skeleton and frame; further events are ignored.
    pub fn dispose(&mut self) {
        self.gesture.cancel();
        self.displayed = None;
        self.working = None;
        self.frame = None;
        self.weights = VertexWeights::default();
        self.disposed = true;
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ========================================================================
    // Frame & Pose
    // ========================================================================

    /// Swaps in a server frame.
    ///
    /// The displayed skeleton takes the frame's own pose. The editor's pose
    /// is re-applied to the working skeleton by bone name, so a frame that
    /// answers an older request never rolls back local edits. A drag in
    /// progress is cancelled if the bone set changed.
    pub fn load_frame(&mut self, frame: Arc<PosedFrame>) -> Result<()> {
        if self.disposed {
            return Err(PoseError::Disposed);
        }
        let mut skeleton = skeleton_from_frame(&frame)?;
        // Without rest matrices the frame's bones already are the posed rest.
        if frame.bones.iter().all(|b| b.rest_matrix.is_some()) {
            skeleton.apply_pose(&frame.pose);
        }
        let mut working = skeleton.clone();
        working.apply_pose(&self.pose);

        let same_rig = self.displayed.as_ref().is_some_and(|old| {
            old.len() == skeleton.len() && old.bones().iter().zip(skeleton.bones()).all(|(a, b)| a.name == b.name)
        });
        if !same_rig {
            if self.gesture.is_dragging() {
                log::debug!("Bone set changed; cancelling drag");
            }
            self.gesture.cancel();
            self.selected = None;
        }

        let entries = frame.weights.iter().filter_map(|(name, w)| {
            let bone = skeleton.find(name)?;
            Some(
                w.indices
                    .iter()
                    .zip(&w.weights)
                    .map(move |(&vertex, &weight)| (bone, vertex, weight)),
            )
        });
        self.weights = VertexWeights::from_entries(
            entries.flatten(),
            &frame.vertices,
            &skeleton,
            self.settings.solver.weight_threshold,
            self.settings.solver.max_influences,
        );

        log::debug!(
            "Loaded frame {} ({} bones, {} vertices)",
            frame.generation,
            skeleton.len(),
            frame.vertices.len()
        );
        self.displayed = Some(skeleton);
        self.working = Some(working);
        self.frame = Some(frame);
        Ok(())
    }

    #[must_use]
    pub fn frame(&self) -> Option<&PosedFrame> {
        self.frame.as_deref()
    }

    /// The skeleton posed as the current frame shows it.
    #[must_use]
    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.displayed.as_ref()
    }

    #[must_use]
    pub fn pose(&self) -> &ManualPose {
        &self.pose
    }

    /// Replaces the pose (e.g. when switching tabs).
    pub fn set_pose(&mut self, pose: ManualPose) {
        self.gesture.cancel();
        if let Some(skeleton) = self.working.as_mut() {
            skeleton.apply_pose(&pose);
        }
        self.pose = pose;
    }

    /// Resets every bone to its rest rotation.
    pub fn reset_pose(&mut self) {
        self.set_pose(ManualPose::new());
    }

    /// A request for the editor's current pose. Camera orbiting replaces
    /// model rotation, so none is sent.
    #[must_use]
    pub fn request(&self, shape: &ShapeParameters) -> PoseRequest {
        PoseRequest::new(*shape, self.pose.clone())
    }

    #[must_use]
    pub fn selected_bone(&self) -> Option<&str> {
        let skeleton = self.displayed.as_ref()?;
        Some(skeleton.bone(self.selected?)?.name.as_str())
    }

    // ========================================================================
    // Camera
    // ========================================================================

    #[must_use]
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        self.mode = mode;
    }

    pub fn set_viewport(&mut self, size: Vec2) {
        self.viewport = size.max(Vec2::ONE);
    }

    /// The projection both the mesh and the skeleton overlay must use this
    /// frame.
    #[must_use]
    pub fn view_projection(&self) -> ViewProjection {
        self.camera.view_projection(self.viewport)
    }

    /// Posed head/tail of every bone of the current frame, in frame order.
    #[must_use]
    pub fn bone_segments(&self) -> Vec<(Vec3, Vec3)> {
        self.frame
            .as_ref()
            .map(|frame| frame.bones.iter().map(|b| (b.head(), b.tail())).collect())
            .unwrap_or_default()
    }

    /// Places the current frame on a fixed-size 2D canvas.
    #[must_use]
    pub fn canvas_placement(&self, width: f32, height: f32) -> Option<CanvasPlacement> {
        let frame = self.frame.as_ref()?;
        let skeleton = self.displayed.as_ref()?;
        let root = skeleton.roots().first().map_or(Vec3::ZERO, |&r| skeleton.posed_head(r));
        Some(self.settings.canvas.place(&frame.vertices, root, width, height))
    }

    // ========================================================================
    // Pointer Input
    // ========================================================================

    pub fn pointer_down(&mut self, position: Vec2, buttons: PointerButtons) -> EditorEvent {
        if self.disposed {
            return EditorEvent::None;
        }
        let target = if buttons.intersects(PointerButtons::SECONDARY | PointerButtons::AUXILIARY) {
            DragTarget::Pan
        } else {
            self.pick_target(position)
        };
        self.selected = target.bone();
        self.gesture.begin(target, position);
        EditorEvent::None
    }

    pub fn pointer_move(&mut self, position: Vec2, buttons: PointerButtons) -> EditorEvent {
        if self.disposed {
            return EditorEvent::None;
        }
        let update = self.gesture.pointer_move(position, buttons);
        self.handle(update)
    }

    pub fn pointer_up(&mut self) -> EditorEvent {
        if self.disposed {
            return EditorEvent::None;
        }
        let update = self.gesture.pointer_up();
        self.handle(update)
    }

    pub fn pointer_leave(&mut self, buttons: PointerButtons) -> EditorEvent {
        if self.disposed {
            return EditorEvent::None;
        }
        let update = self.gesture.pointer_leave(buttons);
        self.handle(update)
    }

    /// Dispatches a host pointer event to the matching handler.
    pub fn pointer_event(&mut self, event: PointerEvent) -> EditorEvent {
        match event.kind {
            PointerEventKind::Down => self.pointer_down(event.position, event.buttons),
            PointerEventKind::Move => self.pointer_move(event.position, event.buttons),
            PointerEventKind::Up => self.pointer_up(),
            PointerEventKind::Leave => self.pointer_leave(event.buttons),
        }
    }

    pub fn wheel(&mut self, scroll: f32) -> EditorEvent {
        if self.disposed {
            return EditorEvent::None;
        }
        self.orbit.zoom(&mut self.camera, scroll);
        EditorEvent::CameraChanged
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_dragging()
    }

    fn handle(&mut self, update: GestureUpdate) -> EditorEvent {
        match update {
            GestureUpdate::Ignored => EditorEvent::None,
            GestureUpdate::Moved { target, position, delta } => self.drag(target, position, delta),
            GestureUpdate::Released { .. } => self.finish(),
        }
    }

    fn drag(&mut self, target: DragTarget, position: Vec2, delta: Vec2) -> EditorEvent {
        let view = self.view_projection();
        match target {
            DragTarget::Orbit => {
                self.orbit.rotate(&mut self.camera, delta, self.viewport.y);
                EditorEvent::CameraChanged
            }
            DragTarget::Pan => {
                self.orbit.pan(&mut self.camera, delta, self.viewport.y);
                EditorEvent::CameraChanged
            }
            DragTarget::Rotate { bone } => {
                let Some(skeleton) = self.working.as_mut() else {
                    return EditorEvent::None;
                };
                if delta == Vec2::ZERO || self.rotation.apply(skeleton, bone, &view, delta).is_none() {
                    return EditorEvent::None;
                }
                self.pose = skeleton.current_pose();
                EditorEvent::PoseChanged(self.pose.clone())
            }
            DragTarget::Point { anchor } => {
                let Some(skeleton) = self.working.as_mut() else {
                    return EditorEvent::None;
                };
                let report = self.solver.solve(skeleton, &anchor, &view, position);
                if !report.improved() {
                    return EditorEvent::None;
                }
                self.pose = skeleton.current_pose();
                EditorEvent::PoseChanged(self.pose.clone())
            }
        }
    }

    fn finish(&mut self) -> EditorEvent {
        match self.gesture.take_committed() {
            Some(target) if target.bone().is_some() => {
                if let Some(skeleton) = self.working.as_ref() {
                    self.pose = skeleton.current_pose();
                }
                EditorEvent::Committed(self.pose.clone())
            }
            _ => EditorEvent::None,
        }
    }

    /// Decides what a press at `position` grabs.
    ///
    /// Rotate mode prefers a bone under the pointer, then the bone that
    /// dominates the mesh under the pointer. Drag-to-point mode anchors on
    /// the mesh surface, then on a bone's tail. Anything else orbits.
    /// Everything is measured against the displayed frame.
    fn pick_target(&self, position: Vec2) -> DragTarget {
        let (Some(skeleton), Some(frame)) = (self.displayed.as_ref(), self.frame.as_ref()) else {
            return DragTarget::Orbit;
        };
        let view = self.view_projection();
        let radius = self.settings.picking.bone_radius_px;
        let bone_hit = pick_bone(self.bone_segments(), &view, position, radius)
            .and_then(|i| frame.bones.get(i))
            .and_then(|b| skeleton.find(&b.name));
        let mesh_hit = pick_mesh(&view.ray_from_screen(position), &frame.vertices, &frame.indices);

        match self.mode {
            EditMode::Rotate => bone_hit
                .or_else(|| mesh_hit.and_then(|hit| dominant_bone(&self.weights, &hit)))
                .map_or(DragTarget::Orbit, |bone| DragTarget::Rotate { bone }),
            EditMode::DragToPoint => {
                if let Some(hit) = mesh_hit
                    && let Some(bone) = dominant_bone(&self.weights, &hit)
                    && let Some(anchor) = DragAnchor::new(skeleton, bone, hit.point)
                {
                    return DragTarget::Point { anchor };
                }
                bone_hit
                    .and_then(|bone| DragAnchor::new(skeleton, bone, skeleton.posed_tail(bone)))
                    .map_or(DragTarget::Orbit, |anchor| DragTarget::Point { anchor })
            }
        }
    }
}

/// Rebuilds the rest skeleton carried by a frame.
///
/// Bones with a rest matrix are rebuilt from it exactly. Without rest
/// matrices the reported head/tail positions are taken as the rest pose.
pub fn skeleton_from_frame(frame: &PosedFrame) -> Result<Skeleton> {
    let frames: Option<Vec<(BoneDefinition, Affine3A)>> = frame
        .bones
        .iter()
        .map(|bone| {
            let rest = bone.rest_frame()?;
            let head = Vec3::from(rest.translation);
            let tail = head + Vec3::from(rest.matrix3.y_axis) * bone.length;
            Some((BoneDefinition::new(&bone.name, bone.parent.as_deref(), head, tail), rest))
        })
        .collect();

    match frames {
        Some(frames) => Skeleton::from_rest_frames(frames),
        None => {
            log::debug!("Frame carries no rest matrices; using bone positions as rest");
            let definitions: Vec<BoneDefinition> = frame
                .bones
                .iter()
                .map(|b| BoneDefinition::new(&b.name, b.parent.as_deref(), b.head(), b.tail()))
                .collect();
            Skeleton::from_definitions(&definitions)
        }
    }
}
