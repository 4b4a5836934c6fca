//! ASCII PCD (Point Cloud Data) reader.
//!
//! Reads the header fields the pipeline needs (FIELDS, DATA) and extracts
//! x/y/z columns from the data section. Binary PCD is rejected with a clear
//! error rather than misparsed. Rows with non-finite coordinates — PCL's
//! marker for invalid returns — are dropped on load.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::types::{Point3D, PointCloud3D};
use crate::error::{Error, Result};

/// Load an ASCII PCD file as a point cloud.
pub fn load_pcd(path: &Path) -> Result<PointCloud3D> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines().enumerate();

    let format_err = |line: usize, message: String| Error::Format {
        path: path.to_path_buf(),
        line,
        message,
    };

    // Header: runs until the DATA line.
    let mut xyz_columns: Option<(usize, usize, usize)> = None;
    let mut point_count: usize = 0;
    let mut data_line = 0usize;
    for (line_no, line) in lines.by_ref() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap_or_default().to_ascii_uppercase();
        match keyword.as_str() {
            "FIELDS" => {
                let fields: Vec<&str> = tokens.collect();
                let find = |name: &str| fields.iter().position(|&f| f == name);
                match (find("x"), find("y"), find("z")) {
                    (Some(x), Some(y), Some(z)) => xyz_columns = Some((x, y, z)),
                    _ => {
                        return Err(format_err(
                            line_no + 1,
                            format!("PCD without x/y/z fields: {fields:?}"),
                        ))
                    }
                }
            }
            "POINTS" => {
                point_count = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| format_err(line_no + 1, "malformed POINTS line".into()))?;
            }
            "DATA" => {
                let kind = tokens.next().unwrap_or_default();
                if !kind.eq_ignore_ascii_case("ascii") {
                    return Err(format_err(
                        line_no + 1,
                        format!("unsupported PCD data kind {kind:?} (only ascii)"),
                    ));
                }
                data_line = line_no + 1;
                break;
            }
            // VERSION, SIZE, TYPE, COUNT, WIDTH, HEIGHT, VIEWPOINT
            _ => {}
        }
    }

    let (cx, cy, cz) = xyz_columns
        .ok_or_else(|| format_err(data_line, "PCD header has no FIELDS line".into()))?;

    let mut cloud = PointCloud3D::with_capacity(point_count);
    for (line_no, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let columns: Vec<&str> = trimmed.split_whitespace().collect();
        let parse = |col: usize| -> Result<f32> {
            columns
                .get(col)
                .and_then(|t| t.parse::<f32>().ok())
                .ok_or_else(|| {
                    format_err(line_no + 1, format!("malformed data row: {trimmed:?}"))
                })
        };
        let (x, y, z) = (parse(cx)?, parse(cy)?, parse(cz)?);
        if x.is_finite() && y.is_finite() && z.is_finite() {
            cloud.push(Point3D::new(x, y, z));
        }
    }

    Ok(cloud)
}
