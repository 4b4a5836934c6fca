//! Nearest-neighbor search over a point cloud.
//!
//! Every later stage (normal estimation, descriptor computation, registration
//! correspondences) is a nearest-neighbor query; this module centralizes the
//! k-d tree so search structures are built once per cloud and reused.

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

use crate::core::types::{Point3D, PointCloud3D};

/// A neighbor returned by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index into the cloud the index was built from
    pub index: usize,
    /// Euclidean distance to the query point
    pub distance: f32,
}

/// Read-only k-d tree over a point cloud.
///
/// Built once, queried repeatedly at arbitrary query points. Indices returned
/// by queries refer to the cloud the index was built from; the index is
/// invalidated (must be rebuilt) if that cloud is downsampled or replaced.
pub struct SpatialIndex {
    tree: ImmutableKdTree<f32, u64, 3, 32>,
    len: usize,
}

impl SpatialIndex {
    /// Build an index over a cloud.
    pub fn build(cloud: &PointCloud3D) -> Self {
        let points: Vec<[f32; 3]> = cloud.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = ImmutableKdTree::new_from_slice(&points);
        Self {
            tree,
            len: cloud.len(),
        }
    }

    /// Number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest indexed point to the query, or `None` when the index is empty.
    pub fn nearest(&self, query: &Point3D) -> Option<Neighbor> {
        if self.len == 0 {
            return None;
        }
        let nn = self
            .tree
            .nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        Some(Neighbor {
            index: nn.item as usize,
            distance: nn.distance.sqrt(),
        })
    }

    /// The `k` nearest indexed points, sorted by ascending distance.
    ///
    /// Returns fewer than `k` neighbors when the index holds fewer points,
    /// and an empty vector when it is empty.
    pub fn knn(&self, query: &Point3D, k: usize) -> Vec<Neighbor> {
        if self.len == 0 || k == 0 {
            return Vec::new();
        }
        self.tree
            .nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k)
            .into_iter()
            .map(|nn| Neighbor {
                index: nn.item as usize,
                distance: nn.distance.sqrt(),
            })
            .collect()
    }

    /// All indexed points within `radius` of the query, sorted by ascending
    /// distance. Empty when the index is empty or nothing is in range.
    pub fn radius(&self, query: &Point3D, radius: f32) -> Vec<Neighbor> {
        if self.len == 0 {
            return Vec::new();
        }
        self.tree
            .within::<SquaredEuclidean>(&[query.x, query.y, query.z], radius * radius)
            .into_iter()
            .map(|nn| Neighbor {
                index: nn.item as usize,
                distance: nn.distance.sqrt(),
            })
            .collect()
    }
}
