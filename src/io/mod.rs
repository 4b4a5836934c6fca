//! File I/O: cloud/mesh loaders, the PLY writer and the sequence manifest.
//!
//! The registration core consumes only ordered position lists; everything
//! format-specific stays in this layer.

mod manifest;
mod obj;
mod pcd;
mod ply;

pub use manifest::load_manifest;
pub use obj::load_obj_vertices;
pub use pcd::load_pcd;
pub use ply::{load_ply, save_ply};

use std::path::Path;

use crate::core::types::PointCloud3D;
use crate::error::{Error, Result};

/// Load a point cloud, dispatching on the file extension.
///
/// `.pcd` and `.ply` load as clouds; `.obj` loads a mesh's vertex positions.
pub fn load_cloud(path: &Path) -> Result<PointCloud3D> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pcd") => load_pcd(path),
        Some("ply") => load_ply(path),
        Some("obj") => load_obj_vertices(path),
        _ => Err(Error::UnsupportedExtension(path.to_path_buf())),
    }
}
