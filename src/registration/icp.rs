//! Point-to-point Iterative Closest Point refinement.
//!
//! Given a warm-start transform, alternates nearest-neighbor correspondence
//! search against the target with a closed-form rigid-motion fit until the
//! update falls below the convergence epsilons or the iteration budget runs
//! out. Running out of iterations is not an error: the result is returned
//! with `converged = false` and the caller judges it by the fitness score.

use crate::core::types::{Point3D, PointCloud3D, Pose3D};
use crate::spatial::SpatialIndex;

use super::{rigid_from_correspondences, Correspondence, RegistrationError};

/// Configuration for point-to-point ICP.
#[derive(Debug, Clone)]
pub struct IcpConfig {
    /// Maximum number of iterations.
    pub max_iterations: u32,

    /// Maximum correspondence distance (meters).
    ///
    /// Point pairs farther apart than this are rejected as outliers.
    pub max_correspondence_distance: f32,

    /// Convergence threshold on the translation of one update (meters).
    pub translation_epsilon: f32,

    /// Convergence threshold on the rotation of one update (radians).
    pub rotation_epsilon: f32,

    /// Convergence threshold on the change in mean squared error between
    /// consecutive iterations.
    pub mse_epsilon: f32,

    /// Minimum number of valid correspondences required.
    ///
    /// Never less than 3; a rigid motion is unconstrained below that.
    pub min_correspondences: usize,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_correspondence_distance: 0.5,
            translation_epsilon: 1e-4,
            rotation_epsilon: 1e-4,
            mse_epsilon: 1e-7,
            min_correspondences: 3,
        }
    }
}

/// Result of an ICP refinement.
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Refined transform mapping source coordinates into the target frame.
    pub transform: Pose3D,

    /// Whether the convergence epsilons were met.
    ///
    /// `false` means the iteration budget ran out; the transform is still
    /// usable, just less converged.
    pub converged: bool,

    /// Iterations performed.
    pub iterations: u32,

    /// Mean squared correspondence distance of the final iteration.
    pub mse: f32,

    /// Mean correspondence distance among kept pairs of the final iteration
    /// (lower is better).
    pub fitness: f32,
}

/// Point-to-point ICP refiner.
///
/// The target's spatial index is built once by the caller and shared across
/// invocations, so tracking a sequence against a fixed template never
/// rebuilds the search structure.
#[derive(Debug, Clone)]
pub struct PointToPointIcp {
    config: IcpConfig,
}

impl PointToPointIcp {
    /// Create a refiner with the given configuration.
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// Minimum correspondences actually enforced.
    #[inline]
    fn required_correspondences(&self) -> usize {
        self.config.min_correspondences.max(3)
    }

    /// Find correspondences from the transformed source into the target.
    fn find_correspondences(
        &self,
        source: &PointCloud3D,
        target_index: &SpatialIndex,
        transform: &Pose3D,
    ) -> Vec<Correspondence> {
        let mut correspondences = Vec::with_capacity(source.len());
        for (i, point) in source.iter().enumerate() {
            let moved = transform.transform_point(point);
            if let Some(nearest) = target_index.nearest(&moved) {
                if nearest.distance <= self.config.max_correspondence_distance {
                    correspondences.push(Correspondence {
                        source: i,
                        target: nearest.index,
                        distance: nearest.distance,
                    });
                }
            }
        }
        correspondences
    }

    /// Refine `initial_guess` so the source cloud aligns onto the target.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::EmptyCloud`] for an empty input,
    /// [`RegistrationError::InsufficientCorrespondences`] when fewer than the
    /// configured minimum pairs survive the distance threshold, and
    /// [`RegistrationError::DegenerateCorrespondences`] when the surviving
    /// pairs do not constrain a rigid motion. An exhausted iteration budget
    /// is *not* an error; inspect [`IcpResult::converged`].
    pub fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        target_index: &SpatialIndex,
        initial_guess: &Pose3D,
    ) -> Result<IcpResult, RegistrationError> {
        if source.is_empty() || target.is_empty() {
            return Err(RegistrationError::EmptyCloud);
        }

        let required = self.required_correspondences();
        let mut transform = *initial_guess;
        let mut last_mse = f32::MAX;
        let mut iterations = 0u32;
        let mut converged = false;
        let mut mse = f32::MAX;
        let mut fitness = f32::MAX;

        for iter in 0..self.config.max_iterations {
            iterations = iter + 1;

            let correspondences = self.find_correspondences(source, target_index, &transform);
            if correspondences.len() < required {
                return Err(RegistrationError::InsufficientCorrespondences {
                    found: correspondences.len(),
                    required,
                });
            }

            // Fit the incremental motion between the currently-transformed
            // source points and their matched target points.
            let moved: Vec<Point3D> = correspondences
                .iter()
                .map(|c| transform.transform_point(&source.points[c.source]))
                .collect();
            let matched: Vec<Point3D> = correspondences
                .iter()
                .map(|c| target.points[c.target])
                .collect();
            let delta = rigid_from_correspondences(&moved, &matched)
                .ok_or(RegistrationError::DegenerateCorrespondences)?;

            transform = delta.compose(&transform);

            let mut total_sq = 0.0f32;
            let mut total = 0.0f32;
            for (m, t) in moved.iter().zip(matched.iter()) {
                let d = (delta.transform_point(m) - t).norm();
                total_sq += d * d;
                total += d;
            }
            mse = total_sq / correspondences.len() as f32;
            fitness = total / correspondences.len() as f32;

            let translation_change = delta.translation.norm();
            let rotation_change = delta.rotation_angle();
            if translation_change < self.config.translation_epsilon
                && rotation_change < self.config.rotation_epsilon
            {
                converged = true;
                break;
            }
            if (last_mse - mse).abs() < self.config.mse_epsilon {
                converged = true;
                break;
            }
            last_mse = mse;
        }

        Ok(IcpResult {
            transform,
            converged,
            iterations,
            mse,
            fitness,
        })
    }
}
