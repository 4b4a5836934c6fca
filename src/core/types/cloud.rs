//! Point cloud container.

use serde::{Deserialize, Serialize};

use super::pose::{Point3D, Pose3D};

/// An ordered collection of 3D points.
///
/// Order is insertion order from the source capture. It carries no meaning
/// beyond indexing: normals and descriptors computed from a cloud are
/// index-aligned with it, and correspondences refer to points by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PointCloud3D {
    /// Point positions in meters
    pub points: Vec<Point3D>,
}

impl PointCloud3D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points.
    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: Point3D) {
        self.points.push(point);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = &Point3D> + '_ {
        self.points.iter()
    }

    /// Center of mass, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Point3D> {
        if self.points.is_empty() {
            return None;
        }
        let mut sum = nalgebra::Vector3::zeros();
        for p in &self.points {
            sum += p.coords;
        }
        Some(Point3D::from(sum / self.points.len() as f32))
    }

    /// Axis-aligned bounding box as (min, max), or `None` for an empty cloud.
    pub fn bounds(&self) -> Option<(Point3D, Point3D)> {
        let first = *self.points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }

    /// Transform all points into the pose's parent frame.
    pub fn transform(&self, pose: &Pose3D) -> PointCloud3D {
        PointCloud3D {
            points: self.points.iter().map(|p| pose.transform_point(p)).collect(),
        }
    }
}
