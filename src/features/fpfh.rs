//! FPFH (Fast Point Feature Histogram) local descriptors.
//!
//! A 33-bin signature per point: three rotation/translation-invariant angular
//! features of every (point, neighbor) normal pair, each binned into 11 bins.
//! Computed in two passes — per-point simplified histograms (SPFH) first, then
//! a distance-weighted combination of each point's own SPFH with its
//! neighbors' SPFHs.

use std::f32::consts::PI;

use nalgebra::Vector3;

use crate::core::types::{Point3D, PointCloud3D};
use crate::spatial::SpatialIndex;

/// Number of bins per angular feature.
const FEATURE_BINS: usize = 11;

/// Total descriptor length (3 features × 11 bins).
pub const FPFH_BINS: usize = 3 * FEATURE_BINS;

/// Every 11-bin feature block is normalized to this total, so descriptor
/// distances are comparable across clouds regardless of neighborhood size.
const HISTOGRAM_TOTAL: f32 = 100.0;

/// A 33-bin FPFH signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FpfhDescriptor {
    /// Concatenated histograms: bins 0..11 α, 11..22 φ, 22..33 θ
    pub histogram: [f32; FPFH_BINS],
}

impl FpfhDescriptor {
    /// Euclidean distance in descriptor space.
    pub fn distance(&self, other: &FpfhDescriptor) -> f32 {
        self.histogram
            .iter()
            .zip(other.histogram.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// Compute an FPFH descriptor for every point of a cloud.
///
/// `normals` must be index-aligned with `cloud` (the output of
/// [`estimate_normals`](super::estimate_normals) over the same cloud), and
/// `radius` is the descriptor search radius — independent of, and typically
/// larger than, the normal-estimation radius.
///
/// A point gets `None` when it has no valid normal or no radius-neighbor with
/// a valid normal; such points carry no geometric signature and must be
/// excluded from correspondence search rather than matched against.
pub fn compute_fpfh(
    cloud: &PointCloud3D,
    normals: &[Option<Vector3<f32>>],
    index: &SpatialIndex,
    radius: f32,
) -> Vec<Option<FpfhDescriptor>> {
    assert_eq!(
        cloud.len(),
        normals.len(),
        "normals must be index-aligned with the cloud"
    );

    let neighborhoods: Vec<Vec<crate::spatial::Neighbor>> =
        cloud.iter().map(|p| index.radius(p, radius)).collect();

    // Pass 1: simplified histogram per point over its own pairs.
    let spfh: Vec<Option<[f32; FPFH_BINS]>> = (0..cloud.len())
        .map(|i| compute_spfh(i, cloud, normals, &neighborhoods[i]))
        .collect();

    // Pass 2: fold in neighbor SPFHs, weighted inversely by distance.
    (0..cloud.len())
        .map(|i| {
            let own = spfh[i]?;
            let mut histogram = own;

            let mut weighted = [0.0f32; FPFH_BINS];
            let mut contributors = 0u32;
            for n in &neighborhoods[i] {
                if n.index == i || n.distance <= f32::EPSILON {
                    continue;
                }
                if let Some(neighbor_spfh) = &spfh[n.index] {
                    let weight = 1.0 / n.distance;
                    for (acc, v) in weighted.iter_mut().zip(neighbor_spfh.iter()) {
                        *acc += weight * v;
                    }
                    contributors += 1;
                }
            }
            if contributors > 0 {
                for (h, w) in histogram.iter_mut().zip(weighted.iter()) {
                    *h += w / contributors as f32;
                }
            }

            normalize_blocks(&mut histogram);
            Some(FpfhDescriptor { histogram })
        })
        .collect()
}

/// SPFH of one point: binned pair features against every valid-normal
/// neighbor in range. `None` when the point has no valid normal or no usable
/// pair.
fn compute_spfh(
    i: usize,
    cloud: &PointCloud3D,
    normals: &[Option<Vector3<f32>>],
    neighborhood: &[crate::spatial::Neighbor],
) -> Option<[f32; FPFH_BINS]> {
    let own_normal = normals[i].as_ref()?;
    let point = &cloud.points[i];

    let mut pairs: Vec<(f32, f32, f32)> = Vec::with_capacity(neighborhood.len());
    for n in neighborhood {
        if n.index == i {
            continue;
        }
        let neighbor_normal = match &normals[n.index] {
            Some(nn) => nn,
            None => continue,
        };
        if let Some(features) =
            pair_features(point, own_normal, &cloud.points[n.index], neighbor_normal)
        {
            pairs.push(features);
        }
    }
    if pairs.is_empty() {
        return None;
    }

    let increment = HISTOGRAM_TOTAL / pairs.len() as f32;
    let mut histogram = [0.0f32; FPFH_BINS];
    for (alpha, phi, theta) in pairs {
        histogram[unit_bin(alpha)] += increment;
        histogram[FEATURE_BINS + unit_bin(phi)] += increment;
        histogram[2 * FEATURE_BINS + angle_bin(theta)] += increment;
    }
    Some(histogram)
}

/// Darboux-frame pair features (α, φ, θ) between two oriented points.
///
/// The roles are swapped so the normal forming the smaller angle with the
/// displacement becomes the frame source; this keeps the features independent
/// of argument order. Returns `None` for coincident points or when the
/// displacement is parallel to the source normal (the frame is undefined).
fn pair_features(
    ps: &Point3D,
    ns: &Vector3<f32>,
    pt: &Point3D,
    nt: &Vector3<f32>,
) -> Option<(f32, f32, f32)> {
    let mut dp = pt - ps;
    let dist = dp.norm();
    if dist <= f32::EPSILON {
        return None;
    }

    let mut source = *ns;
    let mut target = *nt;
    let angle_s = source.dot(&dp) / dist;
    let angle_t = target.dot(&dp) / dist;

    let phi = if angle_s.abs() < angle_t.abs() {
        std::mem::swap(&mut source, &mut target);
        dp = -dp;
        -angle_t
    } else {
        angle_s
    };

    let v = dp.cross(&source);
    let v_norm = v.norm();
    if v_norm <= f32::EPSILON {
        return None;
    }
    let v = v / v_norm;
    let w = source.cross(&v);

    let alpha = v.dot(&target);
    let theta = w.dot(&target).atan2(source.dot(&target));

    Some((alpha, phi, theta))
}

/// Bin a value in [-1, 1] into one of the 11 feature bins.
#[inline]
fn unit_bin(value: f32) -> usize {
    let idx = ((value + 1.0) * 0.5 * FEATURE_BINS as f32).floor() as isize;
    idx.clamp(0, FEATURE_BINS as isize - 1) as usize
}

/// Bin an angle in [-π, π] into one of the 11 feature bins.
#[inline]
fn angle_bin(value: f32) -> usize {
    let idx = ((value + PI) / (2.0 * PI) * FEATURE_BINS as f32).floor() as isize;
    idx.clamp(0, FEATURE_BINS as isize - 1) as usize
}

/// Rescale each 11-bin block to sum to `HISTOGRAM_TOTAL`.
fn normalize_blocks(histogram: &mut [f32; FPFH_BINS]) {
    for block in histogram.chunks_mut(FEATURE_BINS) {
        let sum: f32 = block.iter().sum();
        if sum > 0.0 {
            let scale = HISTOGRAM_TOTAL / sum;
            for bin in block {
                *bin *= scale;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::estimate_normals;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    use crate::core::types::Pose3D;

    /// Curved surface offset from the origin so normal orientation is stable.
    fn wavy_cloud() -> PointCloud3D {
        let mut cloud = PointCloud3D::new();
        for i in 0..12 {
            for j in 0..12 {
                let x = i as f32 * 0.1;
                let y = j as f32 * 0.1;
                let z = 2.0 + 0.2 * (x * 4.0).sin() * (y * 3.0).cos();
                cloud.push(Point3D::new(x, y, z));
            }
        }
        cloud
    }

    fn descriptors_for(cloud: &PointCloud3D) -> Vec<Option<FpfhDescriptor>> {
        let index = SpatialIndex::build(cloud);
        let normals = estimate_normals(cloud, &index, 0.25);
        compute_fpfh(cloud, &normals, &index, 0.35)
    }

    #[test]
    fn test_blocks_normalized_and_non_negative() {
        let cloud = wavy_cloud();
        let descriptors = descriptors_for(&cloud);

        let mut seen = 0;
        for d in descriptors.into_iter().flatten() {
            seen += 1;
            assert!(d.histogram.iter().all(|&v| v >= 0.0));
            for block in d.histogram.chunks(FEATURE_BINS) {
                let sum: f32 = block.iter().sum();
                assert_relative_eq!(sum, HISTOGRAM_TOTAL, epsilon = 1e-2);
            }
        }
        assert!(seen > 100, "most points should get descriptors");
    }

    #[test]
    fn test_deterministic() {
        let cloud = wavy_cloud();
        assert_eq!(descriptors_for(&cloud), descriptors_for(&cloud));
    }

    #[test]
    fn test_point_without_normal_gets_none() {
        let mut cloud = wavy_cloud();
        cloud.push(Point3D::new(100.0, 100.0, 100.0));
        let descriptors = descriptors_for(&cloud);
        assert!(descriptors.last().unwrap().is_none());
    }

    #[test]
    fn test_descriptor_distance_zero_for_identical() {
        let cloud = wavy_cloud();
        let descriptors = descriptors_for(&cloud);
        let d = descriptors.iter().flatten().next().unwrap();
        assert_relative_eq!(d.distance(d), 0.0);
    }

    #[test]
    fn test_matching_survives_rigid_motion() {
        // Rotation about the origin keeps the toward-origin normal orientation
        // consistent between the two clouds, so corresponding points should
        // find each other by nearest descriptor.
        let cloud = wavy_cloud();
        let pose = Pose3D::from_parts(
            UnitQuaternion::from_axis_angle(&nalgebra::Vector3::z_axis(), 0.9),
            nalgebra::Vector3::zeros(),
        );
        let moved = cloud.transform(&pose);

        let original = descriptors_for(&cloud);
        let transformed = descriptors_for(&moved);

        let valid: Vec<usize> = (0..cloud.len())
            .filter(|&i| original[i].is_some() && transformed[i].is_some())
            .collect();
        assert!(valid.len() > 80);

        let mut hits = 0;
        for &i in &valid {
            let query = original[i].as_ref().unwrap();
            let mut best = usize::MAX;
            let mut best_dist = f32::MAX;
            for &j in &valid {
                let dist = query.distance(transformed[j].as_ref().unwrap());
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            if best == i {
                hits += 1;
            }
        }
        assert!(
            hits * 10 >= valid.len() * 9,
            "only {hits}/{} descriptors matched their counterpart",
            valid.len()
        );
    }
}
