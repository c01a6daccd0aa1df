//! Placement of a posed body on a fixed-size 2D canvas.
//!
//! The body is viewed orthographically from the front (`+X` right, `+Y`
//! up). A configurable reference point is mapped to the canvas centre and
//! the posed extent around it is scaled to fill a fraction of the shorter
//! canvas side.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Which point of the posed body lands on the canvas centre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanvasReference {
    /// Head of the first root bone (usually the pelvis).
    #[default]
    SkeletonRoot,
    /// Lowest point of the mesh, horizontally centred on its bounds.
    FeetCenter,
    /// Mean of all mesh vertices.
    CenterOfMass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasCalibration {
    pub reference: CanvasReference,
    /// Fraction of `min(width, height)` the body spans, in `(0, 1]`.
    pub fill: f32,
}

impl Default for CanvasCalibration {
    fn default() -> Self {
        Self {
            reference: CanvasReference::SkeletonRoot,
            fill: 0.9,
        }
    }
}

/// A resolved world → pixel mapping for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPlacement {
    pub reference: Vec3,
    /// Pixels per world unit.
    pub scale: f32,
    pub center: Vec2,
}

impl CanvasPlacement {
    /// Maps a world point to canvas pixels (origin top-left, `y` down).
    #[must_use]
    pub fn to_canvas(&self, point: Vec3) -> Vec2 {
        let d = point - self.reference;
        Vec2::new(self.center.x + d.x * self.scale, self.center.y - d.y * self.scale)
    }
}

impl CanvasCalibration {
    /// Computes the placement for a posed mesh on a `width × height` canvas.
    ///
    /// `root` is the posed head of the skeleton root. An empty mesh yields a
    /// unit scale around `root`.
    #[must_use]
    pub fn place(&self, vertices: &[Vec3], root: Vec3, width: f32, height: f32) -> CanvasPlacement {
        let center = Vec2::new(width * 0.5, height * 0.5);
        let Some((min, max)) = bounds(vertices) else {
            return CanvasPlacement {
                reference: root,
                scale: 1.0,
                center,
            };
        };

        let reference = match self.reference {
            CanvasReference::SkeletonRoot => root,
            CanvasReference::FeetCenter => Vec3::new((min.x + max.x) * 0.5, min.y, (min.z + max.z) * 0.5),
            CanvasReference::CenterOfMass => crate::mesh::centroid(vertices),
        };

        // Largest horizontal/vertical distance from the reference.
        let reach = (max - reference).abs().max((min - reference).abs());
        let half_extent = reach.x.max(reach.y);
        let fill = if self.fill.is_finite() { self.fill.clamp(0.01, 1.0) } else { 0.9 };
        let half_canvas = 0.5 * width.min(height).max(1.0);

        let scale = if half_extent > 1e-6 {
            fill * half_canvas / half_extent
        } else {
            1.0
        };

        CanvasPlacement {
            reference,
            scale,
            center,
        }
    }
}

fn bounds(points: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_lands_on_canvas_center() {
        let verts = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0)];
        let cal = CanvasCalibration {
            reference: CanvasReference::CenterOfMass,
            fill: 1.0,
        };
        let p = cal.place(&verts, Vec3::ZERO, 200.0, 100.0);
        let c = p.to_canvas(Vec3::new(0.0, 1.0, 0.0));
        assert!((c - Vec2::new(100.0, 50.0)).length() < 1e-4);
        // Top of the body touches the top edge.
        assert!((p.to_canvas(Vec3::new(0.0, 2.0, 0.0)).y - 0.0).abs() < 1e-4);
    }

    #[test]
    fn feet_center_is_lowest_point() {
        let verts = [Vec3::new(-1.0, 0.5, 0.0), Vec3::new(1.0, 2.0, 0.0)];
        let cal = CanvasCalibration {
            reference: CanvasReference::FeetCenter,
            fill: 0.5,
        };
        let p = cal.place(&verts, Vec3::ZERO, 100.0, 100.0);
        assert_eq!(p.reference, Vec3::new(0.0, 0.5, 0.0));
    }
}
