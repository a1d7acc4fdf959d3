//! Rigid-body transforms for 3D trajectory estimation.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3, Vector6};
use serde::{Deserialize, Serialize};

/// A rigid-body transform in 3D: rotation (3 DoF) plus translation (3 DoF).
///
/// Composable by group multiplication, with identity and inverse. On the
/// wire a pose is a 7-tuple `[tx, ty, tz, qx, qy, qz, qw]`, matching the
/// fleet's common message layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 7]", into = "[f64; 7]")]
pub struct Pose3D(Isometry3<f64>);

impl Pose3D {
    /// Identity transform.
    #[inline]
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    /// Create from translation and rotation parts.
    #[inline]
    pub fn from_parts(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(Translation3::from(translation), rotation))
    }

    /// Pure translation, no rotation.
    #[inline]
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self::from_parts(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    /// Create from a translation and roll/pitch/yaw Euler angles.
    pub fn from_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::from_parts(
            Vector3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        )
    }

    /// Compose two transforms: `self ∘ other`.
    #[inline]
    pub fn compose(&self, other: &Pose3D) -> Pose3D {
        Self(self.0 * other.0)
    }

    /// Inverse transform.
    #[inline]
    pub fn inverse(&self) -> Pose3D {
        Self(self.0.inverse())
    }

    /// Translation component.
    #[inline]
    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// Rotation component.
    #[inline]
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.0.rotation
    }

    /// Tangent-space coordinates `[ω; v]`: axis-angle rotation followed by
    /// translation. Inverse of [`Pose3D::exp`].
    pub fn log(&self) -> Vector6<f64> {
        let w = self.0.rotation.scaled_axis();
        let t = self.0.translation.vector;
        Vector6::new(w.x, w.y, w.z, t.x, t.y, t.z)
    }

    /// Build a transform from tangent-space coordinates `[ω; v]`.
    pub fn exp(xi: &Vector6<f64>) -> Pose3D {
        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(xi[0], xi[1], xi[2]));
        Self::from_parts(Vector3::new(xi[3], xi[4], xi[5]), rotation)
    }

    /// Apply a local perturbation: `self ∘ exp(delta)`.
    #[inline]
    pub fn retract(&self, delta: &Vector6<f64>) -> Pose3D {
        self.compose(&Self::exp(delta))
    }
}

impl Default for Pose3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f64; 7]> for Pose3D {
    /// Wire quaternions are unit by contract; components are taken as-is so
    /// a round-trip reproduces the mapping exactly.
    fn from(w: [f64; 7]) -> Self {
        let rotation =
            UnitQuaternion::new_unchecked(Quaternion::new(w[6], w[3], w[4], w[5]));
        Self::from_parts(Vector3::new(w[0], w[1], w[2]), rotation)
    }
}

impl From<Pose3D> for [f64; 7] {
    fn from(pose: Pose3D) -> Self {
        let t = pose.0.translation.vector;
        let q = pose.0.rotation.coords;
        [t.x, t.y, t.z, q[0], q[1], q[2], q[3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_compose_identity() {
        let p = Pose3D::from_euler(1.0, 2.0, 3.0, 0.1, 0.2, 0.3);
        let result = p.compose(&Pose3D::identity());
        assert_relative_eq!(result.translation().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.translation().y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.translation().z, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let p = Pose3D::from_euler(1.0, -2.0, 0.5, 0.3, -0.1, 0.7);
        let result = p.compose(&p.inverse());
        assert_relative_eq!(result.translation().norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.rotation().angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_composition_rotates_translation() {
        let rot = Pose3D::from_euler(0.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2);
        let step = Pose3D::from_translation(1.0, 0.0, 0.0);
        let result = rot.compose(&step);
        assert_relative_eq!(result.translation().x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.translation().y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_log_exp_roundtrip() {
        let p = Pose3D::from_euler(0.4, -0.2, 1.1, 0.2, 0.1, -0.3);
        let back = Pose3D::exp(&p.log());
        assert_relative_eq!(
            (back.translation() - p.translation()).norm(),
            0.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(back.rotation().angle_to(&p.rotation()), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wire_tuple_roundtrip() {
        let p = Pose3D::from_euler(1.0, 2.0, 3.0, 0.1, -0.2, 0.3);
        let wire: [f64; 7] = p.into();
        let back = Pose3D::from(wire);
        assert_relative_eq!((back.translation() - p.translation()).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(back.rotation().angle_to(&p.rotation()), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wire_tuple_order() {
        let wire: [f64; 7] = Pose3D::from_translation(1.0, 2.0, 3.0).into();
        assert_eq!(&wire[..3], &[1.0, 2.0, 3.0]);
        // Identity quaternion is (0, 0, 0, 1) in xyzw order.
        assert_eq!(&wire[3..], &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_retract_zero_is_identity() {
        let p = Pose3D::from_euler(1.0, 0.0, 0.0, 0.0, 0.5, 0.0);
        let result = p.retract(&Vector6::zeros());
        assert_relative_eq!((result.translation() - p.translation()).norm(), 0.0, epsilon = 1e-12);
    }
}
