//! Frame-sequence manifest.
//!
//! A manifest is a text file of newline-separated cloud filenames, relative
//! to the manifest's own directory. Blank lines and lines starting with `#`
//! are ignored; order is preserved.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Read a manifest and resolve each entry against the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let reader = BufReader::new(File::open(path)?);
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        entries.push(base.join(trimmed));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sequence.txt");
        std::fs::write(
            &path,
            "# capture session 3\n\
             frame000.pcd\n\
             \n\
             frame001.pcd\n\
             # trailing comment\n\
             frame002.pcd\n",
        )
        .unwrap();

        let entries = load_manifest(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], dir.path().join("frame000.pcd"));
        assert_eq!(entries[2], dir.path().join("frame002.pcd"));
    }

    #[test]
    fn test_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "# nothing here\n\n").unwrap();
        assert!(load_manifest(&path).unwrap().is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.txt");
        std::fs::write(&path, "b.pcd\na.pcd\nc.pcd\n").unwrap();
        let entries = load_manifest(&path).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["b.pcd", "a.pcd", "c.pcd"]);
    }
}
