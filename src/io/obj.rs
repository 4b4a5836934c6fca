//! Wavefront OBJ vertex extraction.
//!
//! The template is a mesh; only its vertex positions matter for
//! registration. Faces, normals, texture coordinates and everything else in
//! the file are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::types::{Point3D, PointCloud3D};
use crate::error::{Error, Result};

/// Load the vertex positions of an OBJ mesh as a point cloud.
pub fn load_obj_vertices(path: &Path) -> Result<PointCloud3D> {
    let reader = BufReader::new(File::open(path)?);
    let mut cloud = PointCloud3D::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.starts_with("v ") {
            continue;
        }
        let mut fields = trimmed.split_whitespace().skip(1);
        let mut coord = || -> Result<f32> {
            fields
                .next()
                .ok_or(())
                .and_then(|f| f.parse::<f32>().map_err(|_| ()))
                .map_err(|_| Error::Format {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("malformed vertex line: {trimmed:?}"),
                })
        };
        let (x, y, z) = (coord()?, coord()?, coord()?);
        cloud.push(Point3D::new(x, y, z));
    }

    Ok(cloud)
}
