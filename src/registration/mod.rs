//! Rigid registration algorithms.
//!
//! [`SacIa`] estimates a coarse transform between two descriptor-annotated
//! clouds with no initial guess; [`PointToPointIcp`] refines a transform
//! iteratively from a warm start. Both express failure through
//! [`RegistrationError`] so callers can distinguish recoverable degeneracy
//! from a usable low-confidence result.

mod icp;
mod sac_ia;

pub use icp::{IcpConfig, IcpResult, PointToPointIcp};
pub use sac_ia::{SacIa, SacIaConfig, SacIaResult};

use nalgebra::{Matrix3, Rotation3, UnitQuaternion};

use crate::core::types::{Point3D, Pose3D};

/// A matched point pair found by nearest-neighbor search.
///
/// Lives for a single alignment iteration; indices refer into the source and
/// target clouds of that call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Index into the source cloud
    pub source: usize,
    /// Index into the target cloud
    pub target: usize,
    /// Euclidean distance between the pair
    pub distance: f32,
}

/// Algorithmic degeneracy during registration.
///
/// These are recoverable at the call-site: the caller decides whether to
/// retry with relaxed parameters, skip the frame, or abort the chain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistrationError {
    /// Source or target cloud has no points
    #[error("source or target cloud is empty")]
    EmptyCloud,

    /// Too few correspondences survived the distance threshold
    #[error("insufficient correspondences: found {found}, need at least {required}")]
    InsufficientCorrespondences {
        /// Correspondences found
        found: usize,
        /// Minimum required for a rigid-motion estimate
        required: usize,
    },

    /// Correspondence geometry does not constrain a rigid motion
    #[error("degenerate correspondence geometry; cannot estimate a rigid motion")]
    DegenerateCorrespondences,

    /// Neither side has enough valid descriptors to sample from
    #[error("not enough valid descriptors for feature matching")]
    NoValidFeatures,

    /// Sample consensus exhausted its iterations without a usable candidate
    #[error("sample consensus produced no valid candidate in {iterations} iterations")]
    NoValidSamples {
        /// Iterations attempted
        iterations: u32,
    },
}

/// Closed-form least-squares rigid motion mapping `source[i]` onto
/// `target[i]`.
///
/// Centroid alignment plus SVD rotation fit (Kabsch), with the reflection
/// case corrected so the result is a proper rotation. Returns `None` for
/// fewer than 3 pairs or when the SVD does not yield usable factors.
pub(crate) fn rigid_from_correspondences(source: &[Point3D], target: &[Point3D]) -> Option<Pose3D> {
    debug_assert_eq!(source.len(), target.len());
    if source.len() < 3 {
        return None;
    }
    let n = source.len() as f32;

    let mut source_centroid = nalgebra::Vector3::zeros();
    let mut target_centroid = nalgebra::Vector3::zeros();
    for (s, t) in source.iter().zip(target.iter()) {
        source_centroid += s.coords;
        target_centroid += t.coords;
    }
    source_centroid /= n;
    target_centroid /= n;

    // Cross-covariance of centered pairs
    let mut covariance = Matrix3::zeros();
    for (s, t) in source.iter().zip(target.iter()) {
        covariance += (t.coords - target_centroid) * (s.coords - source_centroid).transpose();
    }

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        let mut u_fixed = u;
        u_fixed.set_column(2, &(u.column(2) * -1.0));
        rotation = u_fixed * v_t;
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));
    let translation = target_centroid - rotation.transform_vector(&source_centroid);
    Some(Pose3D::from_parts(rotation, translation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn corner_points() -> Vec<Point3D> {
        vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(0.0, 1.0, 0.0),
            Point3D::new(0.0, 0.0, 1.0),
            Point3D::new(1.0, 1.0, 0.5),
        ]
    }

    #[test]
    fn test_recovers_known_transform() {
        let pose = Pose3D::from_parts(
            UnitQuaternion::from_euler_angles(0.4, -0.2, 1.3),
            Vector3::new(0.7, -1.5, 2.0),
        );
        let source = corner_points();
        let target: Vec<Point3D> = source.iter().map(|p| pose.transform_point(p)).collect();

        let fit = rigid_from_correspondences(&source, &target).unwrap();
        assert_relative_eq!(fit.rotation_angle_to(&pose), 0.0, epsilon = 1e-4);
        assert_relative_eq!(fit.translation_distance_to(&pose), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_identity_for_identical_sets() {
        let points = corner_points();
        let fit = rigid_from_correspondences(&points, &points).unwrap();
        assert_relative_eq!(fit.rotation_angle(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(fit.translation.norm(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_too_few_pairs() {
        let points = vec![Point3D::origin(), Point3D::new(1.0, 0.0, 0.0)];
        assert!(rigid_from_correspondences(&points, &points).is_none());
    }

    #[test]
    fn test_no_reflection() {
        // Mirrored target: best proper rotation must still have det +1,
        // which Pose3D guarantees by construction; just confirm the fit runs.
        let source = corner_points();
        let target: Vec<Point3D> = source
            .iter()
            .map(|p| Point3D::new(-p.x, p.y, p.z))
            .collect();
        let fit = rigid_from_correspondences(&source, &target).unwrap();
        assert!(fit.rotation.to_rotation_matrix().matrix().determinant() > 0.0);
    }
}
