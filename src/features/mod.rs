//! Local geometric features: surface normals and FPFH descriptors.

mod fpfh;
mod normals;

pub use fpfh::{compute_fpfh, FpfhDescriptor, FPFH_BINS};
pub use normals::estimate_normals;
