use glam::{Mat3, Quat, Vec2, Vec3};

use super::camera::ViewProjection;
use crate::settings::RotationSettings;
use crate::skeleton::euler::{euler_degrees_to_quat, quat_to_euler_degrees};
use crate::skeleton::Skeleton;
use crate::skinning::rest_rotation;

/// Maps pointer drags to bone rotations relative to the camera.
///
/// The camera's right/up axes are expressed in the bone's rest frame, so a
/// horizontal drag always turns the bone about the screen's vertical axis
/// and a vertical drag about the screen's horizontal axis, whatever the
/// bone's rest orientation or the viewing angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRelativeRotation {
    settings: RotationSettings,
}

impl CameraRelativeRotation {
    #[must_use]
    pub fn new(settings: RotationSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    /// The incremental rotation for a pointer delta (pixels, `y` down),
    /// expressed in the bone's local rest frame.
    #[must_use]
    pub fn delta_rotation(&self, rest: Mat3, camera_right: Vec3, camera_up: Vec3, delta: Vec2) -> Quat {
        let to_local = rest.inverse();
        if !to_local.is_finite() {
            return Quat::IDENTITY;
        }
        let local_right = (to_local * camera_right).normalize_or_zero();
        let local_up = (to_local * camera_up).normalize_or_zero();
        if local_right == Vec3::ZERO || local_up == Vec3::ZERO {
            return Quat::IDENTITY;
        }

        let radians_per_pixel = self.settings.degrees_per_pixel.to_radians();
        let yaw = Quat::from_axis_angle(local_up, delta.x * radians_per_pixel);
        let pitch = Quat::from_axis_angle(local_right, delta.y * radians_per_pixel);
        yaw * pitch
    }

    /// New Euler angles (degrees, Z·Y·X) after pre-multiplying the drag
    /// delta onto `current`.
    #[must_use]
    pub fn rotate(&self, current: Vec3, rest: Mat3, camera_right: Vec3, camera_up: Vec3, delta: Vec2) -> Vec3 {
        let delta = self.delta_rotation(rest, camera_right, camera_up, delta);
        let rotated = delta * euler_degrees_to_quat(current);
        quat_to_euler_degrees(rotated)
    }

    /// Applies a drag to one bone of `skeleton` and refreshes its matrices.
    /// Returns the bone's new local rotation.
    pub fn apply(&self, skeleton: &mut Skeleton, bone: usize, view: &ViewProjection, delta: Vec2) -> Option<Vec3> {
        let rest = rest_rotation(&skeleton.bone(bone)?.rest_global());
        let (right, up) = view.camera_axes();
        let rotation = self.rotate(skeleton.local_rotation(bone), rest, right, up, delta);
        if !rotation.is_finite() {
            log::warn!("Discarding non-finite drag rotation for bone {bone}");
            return None;
        }
        skeleton.set_local_rotation(bone, rotation);
        skeleton.update();
        Some(rotation)
    }
}
