//! Surface normal estimation via neighborhood covariance analysis.

use nalgebra::{Matrix3, Vector3};

use crate::core::types::PointCloud3D;
use crate::spatial::SpatialIndex;

/// Minimum neighborhood size (query point included) for a plane fit.
const MIN_NEIGHBORS: usize = 3;

/// Relative eigenvalue floor below which the neighborhood is treated as
/// rank-deficient (collinear or coincident support).
const DEGENERACY_RATIO: f32 = 1e-6;

/// Estimate a unit surface normal for every point of a cloud.
///
/// For each point, gathers all neighbors within `radius` (the point itself
/// included), fits the neighborhood's principal-component plane, and returns
/// the eigenvector of smallest eigenvalue of the covariance matrix. The
/// returned vector is index-aligned with the cloud.
///
/// A point gets `None` instead of a normal when its neighborhood is too small
/// (< 3 points) or rank-deficient (collinear/coincident neighbors), rather
/// than a numerically unstable unit vector.
///
/// The eigenvector's sign is resolved by flipping each normal toward the
/// coordinate origin (a stand-in for the capture viewpoint), which makes the
/// output deterministic. This is an orientation heuristic only: a
/// surface-outward convention is not established and callers must not assume
/// one.
pub fn estimate_normals(
    cloud: &PointCloud3D,
    index: &SpatialIndex,
    radius: f32,
) -> Vec<Option<Vector3<f32>>> {
    cloud
        .iter()
        .map(|point| {
            let neighbors = index.radius(point, radius);
            if neighbors.len() < MIN_NEIGHBORS {
                return None;
            }

            let mut centroid = Vector3::zeros();
            for n in &neighbors {
                centroid += cloud.points[n.index].coords;
            }
            centroid /= neighbors.len() as f32;

            let mut covariance = Matrix3::zeros();
            for n in &neighbors {
                let d = cloud.points[n.index].coords - centroid;
                covariance += d * d.transpose();
            }
            covariance /= neighbors.len() as f32;

            smallest_eigenvector(&covariance).map(|n| {
                if n.dot(&point.coords) > 0.0 {
                    -n
                } else {
                    n
                }
            })
        })
        .collect()
}

/// Unit eigenvector of the smallest eigenvalue, or `None` when the matrix is
/// rank-deficient enough that the direction is not well defined.
fn smallest_eigenvector(covariance: &Matrix3<f32>) -> Option<Vector3<f32>> {
    let eigen = covariance.symmetric_eigen();

    let mut order = [0usize, 1, 2];
    order.sort_unstable_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let [min_i, mid_i, max_i] = order;

    let max = eigen.eigenvalues[max_i];
    if !max.is_finite() || max <= f32::EPSILON {
        // All neighbors coincident
        return None;
    }
    if eigen.eigenvalues[mid_i] / max < DEGENERACY_RATIO {
        // Collinear support: the plane fit has a free axis
        return None;
    }

    let v = eigen.eigenvectors.column(min_i).into_owned();
    let norm = v.norm();
    if norm <= f32::EPSILON {
        return None;
    }
    Some(v / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point3D;
    use approx::assert_relative_eq;

    fn plane_cloud() -> PointCloud3D {
        let mut cloud = PointCloud3D::new();
        for i in 0..6 {
            for j in 0..6 {
                cloud.push(Point3D::new(i as f32 * 0.1, j as f32 * 0.1, 0.0));
            }
        }
        cloud
    }

    #[test]
    fn test_plane_normals_unit_length_and_axis_aligned() {
        let cloud = plane_cloud();
        let index = SpatialIndex::build(&cloud);
        let normals = estimate_normals(&cloud, &index, 0.25);

        assert_eq!(normals.len(), cloud.len());
        for normal in normals.iter() {
            let n = normal.expect("plane point should get a valid normal");
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-4);
            // Sign is ambiguous; only the axis is determined.
            assert_relative_eq!(n.z.abs(), 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_isolated_point_gets_none() {
        let mut cloud = plane_cloud();
        cloud.push(Point3D::new(50.0, 50.0, 50.0));
        let index = SpatialIndex::build(&cloud);
        let normals = estimate_normals(&cloud, &index, 0.25);
        assert!(normals.last().unwrap().is_none());
    }

    #[test]
    fn test_collinear_neighborhood_gets_none() {
        let cloud = PointCloud3D::from_points(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(0.1, 0.0, 0.0),
            Point3D::new(0.2, 0.0, 0.0),
            Point3D::new(0.3, 0.0, 0.0),
        ]);
        let index = SpatialIndex::build(&cloud);
        let normals = estimate_normals(&cloud, &index, 1.0);
        for normal in normals {
            assert!(normal.is_none(), "collinear support must not yield a normal");
        }
    }

    #[test]
    fn test_too_few_neighbors_gets_none() {
        let cloud = PointCloud3D::from_points(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(0.1, 0.0, 0.0),
        ]);
        let index = SpatialIndex::build(&cloud);
        let normals = estimate_normals(&cloud, &index, 1.0);
        assert!(normals.iter().all(Option::is_none));
    }

    #[test]
    fn test_tilted_plane_normal() {
        // Plane spanned by x and the (0,1,1)/√2 direction; normal is (0,-1,1)/√2.
        let mut cloud = PointCloud3D::new();
        for i in 0..6 {
            for j in 0..6 {
                let u = i as f32 * 0.1;
                let v = j as f32 * 0.1;
                cloud.push(Point3D::new(u, v, v));
            }
        }
        let index = SpatialIndex::build(&cloud);
        let normals = estimate_normals(&cloud, &index, 0.3);
        let n = normals[14].unwrap();
        assert_relative_eq!(n.x.abs(), 0.0, epsilon = 1e-3);
        assert_relative_eq!(n.y.abs(), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
        assert_relative_eq!(n.z.abs(), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
    }
}
