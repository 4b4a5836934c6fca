//! Voxel-grid downsampling.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::core::types::{Point3D, PointCloud3D};

/// Voxel-grid spatial averaging filter.
///
/// Partitions space into a regular grid of cubic cells with edge length
/// `leaf_size` and replaces all points in a populated cell by their centroid.
/// Output point count is never larger than the input count, and shrinks
/// monotonically as the leaf size grows.
///
/// The tracker applies this once, to the first scene frame only: the one-time
/// global alignment benefits from fewer descriptors, while per-frame ICP runs
/// on the full-resolution capture.
#[derive(Debug, Clone)]
pub struct VoxelGridFilter {
    leaf_size: f32,
}

impl VoxelGridFilter {
    /// Create a filter with the given voxel edge length.
    ///
    /// `leaf_size` must be strictly positive; it is validated with the rest of
    /// the numeric parameters before the pipeline starts.
    pub fn new(leaf_size: f32) -> Self {
        debug_assert!(leaf_size > 0.0);
        Self { leaf_size }
    }

    /// Downsample a cloud to one centroid per populated voxel.
    ///
    /// Output order is ascending voxel key, so repeated runs over the same
    /// input produce identical output.
    pub fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        let mut cells: HashMap<(i32, i32, i32), (Vector3<f32>, u32)> =
            HashMap::with_capacity(cloud.len() / 4 + 1);

        for p in cloud.iter() {
            let key = (
                (p.x / self.leaf_size).floor() as i32,
                (p.y / self.leaf_size).floor() as i32,
                (p.z / self.leaf_size).floor() as i32,
            );
            let cell = cells.entry(key).or_insert((Vector3::zeros(), 0));
            cell.0 += p.coords;
            cell.1 += 1;
        }

        let mut keys: Vec<_> = cells.keys().copied().collect();
        keys.sort_unstable();

        let mut out = PointCloud3D::with_capacity(keys.len());
        for key in keys {
            let (sum, count) = cells[&key];
            out.push(Point3D::from(sum / count as f32));
        }
        out
    }
}
