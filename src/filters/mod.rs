//! Point cloud filters.

mod voxel_grid;

pub use voxel_grid::VoxelGridFilter;
