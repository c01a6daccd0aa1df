//! Euler angle helpers for the fixed Z·Y·X pose convention.
//!
//! Pose angles travel as degrees `[rx, ry, rz]`. The rotation they describe is
//! always `Rz · Ry · Rx` (column vectors), i.e. X is applied first.

use glam::{Mat3, Quat, Vec3};

/// Pivot threshold on `|sin(ry)|` past which the decomposition is treated as
/// gimbal locked.
const GIMBAL_EPS: f32 = 1e-6;

/// Builds `Rz · Ry · Rx` from Euler angles in degrees.
#[inline]
#[must_use]
pub fn euler_degrees_to_mat3(degrees: Vec3) -> Mat3 {
    let r = degrees * (std::f32::consts::PI / 180.0);
    Mat3::from_rotation_z(r.z) * Mat3::from_rotation_y(r.y) * Mat3::from_rotation_x(r.x)
}

#[inline]
#[must_use]
pub fn euler_degrees_to_quat(degrees: Vec3) -> Quat {
    let r = degrees * (std::f32::consts::PI / 180.0);
    Quat::from_rotation_z(r.z) * Quat::from_rotation_y(r.y) * Quat::from_rotation_x(r.x)
}

/// Decomposes a rotation matrix into Z·Y·X Euler angles (degrees).
///
/// `ry` is returned in `[-90, 90]`. At gimbal lock `rz` is pinned to zero and
/// the remaining freedom is folded into `rx`.
#[must_use]
pub fn mat3_to_euler_degrees(m: &Mat3) -> Vec3 {
    // m.col(c)[r] is row r, column c.
    let r20 = m.x_axis.z;
    let sin_y = (-r20).clamp(-1.0, 1.0);
    let y = sin_y.asin();

    let (x, z) = if (1.0 - sin_y.abs()) > GIMBAL_EPS {
        let x = m.y_axis.z.atan2(m.z_axis.z);
        let z = m.x_axis.y.atan2(m.x_axis.x);
        (x, z)
    } else {
        let x = (-m.z_axis.y).atan2(m.y_axis.y);
        (x, 0.0)
    };

    Vec3::new(x, y, z) * (180.0 / std::f32::consts::PI)
}

#[inline]
#[must_use]
pub fn quat_to_euler_degrees(q: Quat) -> Vec3 {
    mat3_to_euler_degrees(&Mat3::from_quat(q.normalize()))
}

/// Returns `true` when every component is (numerically) zero.
#[inline]
#[must_use]
pub fn is_zero_rotation(degrees: Vec3) -> bool {
    degrees.abs().max_element() <= f32::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3(a: Vec3, b: Vec3) {
        assert!((a - b).abs().max_element() < 1e-3, "{a:?} != {b:?}");
    }

    #[test]
    fn round_trip_general_angles() {
        for angles in [
            Vec3::new(10.0, 20.0, 30.0),
            Vec3::new(-45.0, 60.0, 120.0),
            Vec3::new(170.0, -80.0, -10.0),
            Vec3::ZERO,
        ] {
            let m = euler_degrees_to_mat3(angles);
            assert_vec3(mat3_to_euler_degrees(&m), angles);
        }
    }

    #[test]
    fn x_is_applied_first() {
        // Rz(90) · Rx(90) applied to +Y: Rx sends Y to Z, Rz leaves Z alone.
        let m = euler_degrees_to_mat3(Vec3::new(90.0, 0.0, 90.0));
        assert_vec3(m * Vec3::Y, Vec3::Z);
    }

    #[test]
    fn quat_and_matrix_agree() {
        let angles = Vec3::new(33.0, -12.0, 71.0);
        let m = euler_degrees_to_mat3(angles);
        let q = euler_degrees_to_quat(angles);
        assert_vec3(m * Vec3::new(1.0, 2.0, 3.0), q * Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn gimbal_lock_reproduces_rotation() {
        let angles = Vec3::new(25.0, 90.0, 40.0);
        let m = euler_degrees_to_mat3(angles);
        let back = euler_degrees_to_mat3(mat3_to_euler_degrees(&m));
        for v in [Vec3::X, Vec3::Y, Vec3::Z] {
            assert_vec3(m * v, back * v);
        }
    }
}
