use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::camera::{CameraState, MAX_ELEVATION};

/// Turns empty-space pointer drags and wheel input into camera motion.
///
/// Operates on a [`CameraState`] directly; there is no damping because the
/// editor only redraws on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            pan_speed: 1.0,
            min_distance: 0.5,
            max_distance: 50.0,
        }
    }
}

impl OrbitControls {
    /// Orbits by a pointer delta (pixels). A full viewport height of travel
    /// turns the camera once around.
    pub fn rotate(&self, camera: &mut CameraState, delta: Vec2, viewport_height: f32) {
        let rotate_per_pixel = std::f32::consts::TAU / viewport_height.max(1.0) * self.rotate_speed;
        camera.azimuth -= delta.x * rotate_per_pixel;
        camera.elevation = (camera.elevation + delta.y * rotate_per_pixel).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Wheel zoom; positive `scroll` moves the camera closer.
    pub fn zoom(&self, camera: &mut CameraState, scroll: f32) {
        if scroll == 0.0 || !scroll.is_finite() {
            return;
        }
        let scale = (1.0 - self.zoom_speed).powf(scroll.abs());
        if scroll > 0.0 {
            camera.distance *= scale;
        } else {
            camera.distance /= scale;
        }
        camera.distance = camera.distance.clamp(self.min_distance, self.max_distance);
    }

    /// Moves the target parallel to the view plane so the scene follows the
    /// pointer.
    pub fn pan(&self, camera: &mut CameraState, delta: Vec2, viewport_height: f32) {
        let half_fov = camera.fov.to_radians() * 0.5;
        let world_height = 2.0 * camera.distance * half_fov.tan();
        let pixels_to_world = world_height / viewport_height.max(1.0);

        let forward = (camera.target - camera.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();

        camera.target += (right * -delta.x + up * delta.y) * pixels_to_world * self.pan_speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let controls = OrbitControls::default();
        let mut camera = CameraState::default();
        for _ in 0..500 {
            controls.zoom(&mut camera, 1.0);
        }
        assert_eq!(camera.distance, controls.min_distance);
        for _ in 0..500 {
            controls.zoom(&mut camera, -1.0);
        }
        assert_eq!(camera.distance, controls.max_distance);
    }

    #[test]
    fn elevation_stays_off_the_poles() {
        let controls = OrbitControls::default();
        let mut camera = CameraState::default();
        controls.rotate(&mut camera, Vec2::new(0.0, 10_000.0), 600.0);
        assert!(camera.elevation <= MAX_ELEVATION);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn pan_moves_target_sideways() {
        let controls = OrbitControls::default();
        let mut camera = CameraState::default();
        let before = camera.target;
        controls.pan(&mut camera, Vec2::new(-100.0, 0.0), 600.0);
        assert!(camera.target.x > before.x);
        assert!((camera.target.y - before.y).abs() < 1e-5);
    }
}
