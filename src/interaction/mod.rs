//! Client-side interaction: camera, picking and turning pointer drags into
//! bone rotations.
//!
//! - [`CameraState`] / [`ViewProjection`]: one frozen projection per frame,
//!   shared by mesh and skeleton overlays
//! - [`OrbitControls`]: empty-space orbit, pan and zoom
//! - [`picking`]: screen-space bone pick and ray/mesh pick
//! - [`CameraRelativeRotation`]: drag delta → bone-local rotation
//! - [`ScreenSpaceDragSolver`]: drag-to-point coordinate descent
//! - [`DragGesture`]: Idle → Dragging → Committed state machine

pub mod camera;
pub mod drag_solver;
pub mod gesture;
pub mod orbit;
pub mod picking;
pub mod pointer;
pub mod rotation;

pub use camera::{CameraState, Ray, ViewProjection};
pub use drag_solver::{DescentReport, DragAnchor, ScreenSpaceDragSolver};
pub use gesture::{DragGesture, DragTarget, GestureState, GestureUpdate};
pub use orbit::OrbitControls;
pub use picking::{dominant_bone, pick_bone, pick_mesh, MeshHit};
pub use pointer::{PointerButtons, PointerEvent, PointerEventKind};
pub use rotation::CameraRelativeRotation;
