//! ASCII PLY reading and writing.
//!
//! Reading handles the vertex element of ASCII PLY files, honoring the
//! declared property order to locate x/y/z; other elements (faces, edges)
//! are skipped. Writing emits ASCII PLY — the output artifacts are meant for
//! inspection in standard viewers, where the text form is the more useful
//! one.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::core::types::{Point3D, PointCloud3D};
use crate::error::{Error, Result};

/// Load the vertex positions of an ASCII PLY file as a point cloud.
pub fn load_ply(path: &Path) -> Result<PointCloud3D> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines().enumerate();

    let format_err = |line: usize, message: String| Error::Format {
        path: path.to_path_buf(),
        line,
        message,
    };

    // Header: elements in declaration order, each with a row count; vertex
    // properties in declaration order.
    let mut elements: Vec<(String, usize)> = Vec::new();
    let mut vertex_properties: Vec<String> = Vec::new();
    let mut saw_magic = false;
    let mut header_end = 0usize;
    for (line_no, line) in lines.by_ref() {
        let line = line?;
        let trimmed = line.trim();
        if line_no == 0 {
            if trimmed != "ply" {
                return Err(format_err(1, "not a PLY file (missing `ply` magic)".into()));
            }
            saw_magic = true;
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        match tokens.next().unwrap_or_default() {
            "format" => {
                let kind = tokens.next().unwrap_or_default();
                if kind != "ascii" {
                    return Err(format_err(
                        line_no + 1,
                        format!("unsupported PLY format {kind:?} (only ascii)"),
                    ));
                }
            }
            "element" => {
                let name = tokens.next().unwrap_or_default().to_string();
                let count: usize = tokens
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| format_err(line_no + 1, "malformed element line".into()))?;
                elements.push((name, count));
            }
            "property" => {
                // Only vertex properties matter; list properties (faces)
                // belong to later elements anyway.
                if let Some((name, _)) = elements.last() {
                    if name == "vertex" {
                        if let Some(prop) = tokens.last() {
                            vertex_properties.push(prop.to_string());
                        }
                    }
                }
            }
            "end_header" => {
                header_end = line_no + 1;
                break;
            }
            // comment, obj_info
            _ => {}
        }
    }
    if !saw_magic {
        return Err(format_err(1, "empty file".into()));
    }

    let find = |name: &str| vertex_properties.iter().position(|p| p == name);
    let (cx, cy, cz) = match (find("x"), find("y"), find("z")) {
        (Some(x), Some(y), Some(z)) => (x, y, z),
        _ => {
            return Err(format_err(
                header_end,
                format!("vertex element lacks x/y/z properties: {vertex_properties:?}"),
            ))
        }
    };

    let mut cloud = PointCloud3D::new();
    for (name, count) in &elements {
        if name == "vertex" {
            cloud = PointCloud3D::with_capacity(*count);
            for _ in 0..*count {
                let (line_no, line) = lines.next().ok_or_else(|| {
                    format_err(header_end, "file ends before all vertices were read".into())
                })?;
                let line = line?;
                let columns: Vec<&str> = line.split_whitespace().collect();
                let parse = |col: usize| -> Result<f32> {
                    columns
                        .get(col)
                        .and_then(|t| t.parse::<f32>().ok())
                        .ok_or_else(|| {
                            format_err(line_no + 1, format!("malformed vertex row: {line:?}"))
                        })
                };
                cloud.push(Point3D::new(parse(cx)?, parse(cy)?, parse(cz)?));
            }
            break;
        }
        // Skip rows of elements declared before vertex.
        for _ in 0..*count {
            lines.next();
        }
    }

    Ok(cloud)
}

/// Write a point cloud as an ASCII PLY file.
pub fn save_ply(cloud: &PointCloud3D, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "end_header")?;
    for p in cloud.iter() {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }
    writer.flush()?;
    Ok(())
}
