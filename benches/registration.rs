//! Registration pipeline benchmarks.
//!
//! Covers the per-frame hot path (spatial queries, ICP) and the one-time
//! initialization cost (normals, FPFH, voxel downsampling).
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{UnitQuaternion, Vector3};

use lakshya_track::{
    compute_fpfh, estimate_normals, IcpConfig, Point3D, PointCloud3D, PointToPointIcp, Pose3D,
    SpatialIndex, VoxelGridFilter,
};

/// Curved sheet with n×n points, offset from the origin.
fn benchmark_cloud(n: usize) -> PointCloud3D {
    let mut cloud = PointCloud3D::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let x = i as f32 * 0.05;
            let y = j as f32 * 0.05;
            let z = 1.5 + 0.2 * (x * 3.0).sin() * (y * 2.0).cos();
            cloud.push(Point3D::new(x, y, z));
        }
    }
    cloud
}

fn small_motion() -> Pose3D {
    Pose3D::from_parts(
        UnitQuaternion::from_euler_angles(0.02, -0.01, 0.03),
        Vector3::new(0.03, 0.02, -0.01),
    )
}

fn bench_spatial_index(c: &mut Criterion) {
    let cloud = benchmark_cloud(40);
    let index = SpatialIndex::build(&cloud);
    let query = Point3D::new(1.0, 1.0, 1.6);

    c.bench_function("spatial/build_1600", |b| {
        b.iter(|| SpatialIndex::build(black_box(&cloud)))
    });
    c.bench_function("spatial/knn_10", |b| {
        b.iter(|| index.knn(black_box(&query), 10))
    });
    c.bench_function("spatial/radius_0.2", |b| {
        b.iter(|| index.radius(black_box(&query), 0.2))
    });
}

fn bench_voxel_grid(c: &mut Criterion) {
    let cloud = benchmark_cloud(40);
    let mut group = c.benchmark_group("voxel_grid");
    for leaf in [0.05f32, 0.1, 0.2] {
        group.bench_with_input(BenchmarkId::from_parameter(leaf), &leaf, |b, &leaf| {
            let filter = VoxelGridFilter::new(leaf);
            b.iter(|| filter.filter(black_box(&cloud)))
        });
    }
    group.finish();
}

fn bench_features(c: &mut Criterion) {
    let cloud = benchmark_cloud(25);
    let index = SpatialIndex::build(&cloud);
    let normals = estimate_normals(&cloud, &index, 0.12);

    c.bench_function("features/normals_625", |b| {
        b.iter(|| estimate_normals(black_box(&cloud), &index, 0.12))
    });
    c.bench_function("features/fpfh_625", |b| {
        b.iter(|| compute_fpfh(black_box(&cloud), &normals, &index, 0.18))
    });
}

fn bench_icp(c: &mut Criterion) {
    let target = benchmark_cloud(30);
    let source = target.transform(&small_motion());
    let index = SpatialIndex::build(&target);
    let icp = PointToPointIcp::new(IcpConfig {
        max_correspondence_distance: 0.3,
        ..IcpConfig::default()
    });

    c.bench_function("icp/align_900_warm", |b| {
        b.iter(|| {
            icp.align(
                black_box(&source),
                &target,
                &index,
                &small_motion().inverse(),
            )
            .unwrap()
        })
    });
    c.bench_function("icp/align_900_cold", |b| {
        b.iter(|| {
            icp.align(black_box(&source), &target, &index, &Pose3D::identity())
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_spatial_index,
    bench_voxel_grid,
    bench_features,
    bench_icp
);
criterion_main!(benches);
