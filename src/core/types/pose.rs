//! Rigid transform type for 3D registration.

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point in meters.
pub type Point3D = Point3<f32>;

/// Rigid transform in 3D space: rotation followed by translation.
///
/// The rotation is stored as a unit quaternion, so the transform is in
/// SE(3) by construction (no scale, no shear, no reflection). Composable
/// and invertible; `a.compose(&b)` applies `b` first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose3D {
    /// Rotation component
    pub rotation: UnitQuaternion<f32>,
    /// Translation component in meters
    pub translation: Vector3<f32>,
}

impl Pose3D {
    /// Create a pose from rotation and translation parts.
    #[inline]
    pub fn from_parts(rotation: UnitQuaternion<f32>, translation: Vector3<f32>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Identity pose at the origin.
    #[inline]
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Compose two poses: self ∘ other.
    ///
    /// The returned pose applies `other` first, then `self`:
    /// `(self ∘ other).transform_point(p) == self.transform_point(&other.transform_point(p))`.
    #[inline]
    pub fn compose(&self, other: &Pose3D) -> Pose3D {
        Pose3D {
            rotation: self.rotation * other.rotation,
            translation: self.rotation.transform_vector(&other.translation) + self.translation,
        }
    }

    /// Inverse of this pose.
    #[inline]
    pub fn inverse(&self) -> Pose3D {
        let rotation = self.rotation.inverse();
        Pose3D {
            rotation,
            translation: -(rotation.transform_vector(&self.translation)),
        }
    }

    /// Transform a point from the local frame to the parent frame.
    #[inline]
    pub fn transform_point(&self, point: &Point3D) -> Point3D {
        self.rotation.transform_point(point) + self.translation
    }

    /// Rotation angle of this pose in radians, in [0, π].
    #[inline]
    pub fn rotation_angle(&self) -> f32 {
        self.rotation.angle()
    }

    /// Rotation angle between two poses in radians.
    #[inline]
    pub fn rotation_angle_to(&self, other: &Pose3D) -> f32 {
        self.rotation.angle_to(&other.rotation)
    }

    /// Euclidean distance between the translation components.
    #[inline]
    pub fn translation_distance_to(&self, other: &Pose3D) -> f32 {
        (self.translation - other.translation).norm()
    }

    /// Homogeneous 4×4 matrix form (rotation in the upper-left 3×3 block).
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(self.rotation.to_rotation_matrix().matrix());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }
}

impl Default for Pose3D {
    fn default() -> Self {
        Self::identity()
    }
}
