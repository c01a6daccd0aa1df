use glam::{Affine3A, Mat3, Vec3};

/// Rest-pose description of a bone as produced by the shape solver.
///
/// `roll_normal` orients the bone frame around its own axis; a zero vector
/// selects the default `+Z` normal.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneDefinition {
    pub name: String,
    pub parent: Option<String>,
    pub head: Vec3,
    pub tail: Vec3,
    pub roll_normal: Vec3,
}

impl BoneDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<&str>, head: Vec3, tail: Vec3) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(ToString::to_string),
            head,
            tail,
            roll_normal: Vec3::Z,
        }
    }

    #[must_use]
    pub fn with_roll_normal(mut self, normal: Vec3) -> Self {
        self.roll_normal = normal;
        self
    }
}

/// A bone of a [`Skeleton`](super::Skeleton).
///
/// Rest data is fixed at solve time; `local_rotation` is the only pose
/// state and is expressed in degrees in the bone's rest frame.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,

    // === Rest Data ===
    pub rest_head: Vec3,
    pub rest_tail: Vec3,
    pub length: f32,
    /// Head position relative to the parent head (equal to `rest_head` for roots).
    pub rest_local_offset: Vec3,
    pub(crate) rest_global: Affine3A,
    pub(crate) rest_local: Affine3A,

    // === Pose ===
    pub local_rotation: Vec3,
}

impl Bone {
    /// The bone frame in world space with no pose applied.
    #[inline]
    #[must_use]
    pub fn rest_global(&self) -> Affine3A {
        self.rest_global
    }

    /// The rest frame relative to the parent's rest frame.
    #[inline]
    #[must_use]
    pub fn rest_local(&self) -> Affine3A {
        self.rest_local
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Builds a bone's rest frame from its head, tail and roll normal.
///
/// The local Y axis points from head to tail, Z is `normal × Y` and X
/// completes a right-handed basis. The translation is the head. Zero-length
/// bones get an identity rotation.
#[must_use]
pub fn rest_matrix(head: Vec3, tail: Vec3, normal: Vec3) -> Affine3A {
    let dir = tail - head;
    let length = dir.length();
    if !length.is_finite() || length < 1e-6 {
        return Affine3A::from_translation(head);
    }
    let y = dir / length;

    let mut z = normal.normalize_or_zero().cross(y).normalize_or_zero();
    if z == Vec3::ZERO {
        // Normal parallel to the bone: pick any perpendicular.
        let helper = if y.z.abs() < 0.9 { Vec3::Z } else { Vec3::X };
        z = helper.cross(y).normalize();
    }
    let x = y.cross(z).normalize();

    Affine3A::from_mat3_translation(Mat3::from_cols(x, y, z), head)
}

/// Returns `true` when the linear part of `m` cannot be safely inverted.
#[inline]
pub(crate) fn is_singular(m: &Affine3A) -> bool {
    let det = m.matrix3.determinant();
    !det.is_finite() || det.abs() < 1e-12 || !m.translation.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_orthonormal_with_y_along_bone() {
        let m = rest_matrix(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, 5.0), Vec3::X);
        let y: Vec3 = m.matrix3.y_axis.into();
        assert!((y - Vec3::Z).length() < 1e-6);
        assert!((m.matrix3.determinant() - 1.0).abs() < 1e-5);
        assert_eq!(Vec3::from(m.translation), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn parallel_normal_falls_back() {
        let m = rest_matrix(Vec3::ZERO, Vec3::Z, Vec3::Z);
        assert!((m.matrix3.determinant() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_length_bone_is_translation_only() {
        let m = rest_matrix(Vec3::ONE, Vec3::ONE, Vec3::Z);
        assert_eq!(m, Affine3A::from_translation(Vec3::ONE));
        assert!(!is_singular(&m));
    }
}
