use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

/// Orbit camera around a target, in spherical coordinates.
///
/// `azimuth` turns around `+Y` (0 looks from `+Z` towards `-Z`), `elevation`
/// tilts above the horizon. Angles are radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    pub target: Vec3,
    pub distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    /// Vertical field of view, degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            distance: 4.0,
            azimuth: 0.0,
            elevation: 0.0,
            fov: 45.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

/// Largest elevation magnitude, just short of the poles.
pub const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - 1e-4;

impl CameraState {
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.clamp(-MAX_ELEVATION, MAX_ELEVATION).sin_cos();
        self.target + Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.distance
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    #[must_use]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect.max(1e-4), self.near, self.far)
    }

    /// Freezes the camera for one frame at the given viewport size (pixels).
    #[must_use]
    pub fn view_projection(&self, viewport: Vec2) -> ViewProjection {
        let viewport = viewport.max(Vec2::ONE);
        ViewProjection::new(
            self.view_matrix(),
            self.projection_matrix(viewport.x / viewport.y),
            viewport,
        )
    }
}

/// A ray in world space. `direction` is unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Immutable camera matrices for one frame.
///
/// Mesh and skeleton overlays must project through the same instance so they
/// line up pixel for pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    inverse_view_projection: Mat4,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

impl ViewProjection {
    #[must_use]
    pub fn new(view: Mat4, projection: Mat4, viewport: Vec2) -> Self {
        let view_projection = projection * view;
        Self {
            view,
            projection,
            view_projection,
            inverse_view_projection: view_projection.inverse(),
            viewport,
        }
    }

    /// World point → pixel coordinates (origin top-left, `y` down).
    /// Points behind the camera yield `None`.
    #[must_use]
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection * world.extend(1.0);
        if clip.w <= 1e-6 {
            return None;
        }
        let ndc = clip.xy() / clip.w;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.viewport.x,
            (0.5 - ndc.y * 0.5) * self.viewport.y,
        ))
    }

    /// Ray through a pixel, starting on the near plane.
    #[must_use]
    pub fn ray_from_screen(&self, pixel: Vec2) -> Ray {
        let ndc = Vec2::new(
            pixel.x / self.viewport.x * 2.0 - 1.0,
            1.0 - pixel.y / self.viewport.y * 2.0,
        );
        let near = self.inverse_view_projection.project_point3(ndc.extend(0.0));
        let far = self.inverse_view_projection.project_point3(ndc.extend(1.0));
        Ray {
            origin: near,
            direction: (far - near).normalize_or_zero(),
        }
    }

    /// Camera right and up axes in world space (first two rows of the view
    /// matrix).
    #[must_use]
    pub fn camera_axes(&self) -> (Vec3, Vec3) {
        (self.view.row(0).xyz(), self.view.row(1).xyz())
    }
}
