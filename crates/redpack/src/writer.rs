//! Secure file writing for post-processed outputs.
//!
//! The orchestration run writes two kinds of files itself: rewritten UI
//! markup (over the bundler's emitted asset) and the package manifest.
//! Writes go through temp-file + rename so readers never see partial
//! contents, and every filename is validated so an emitted asset name can
//! never escape the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::{Error, Result};

/// Write `content` to `filename` inside `dir`, atomically.
///
/// `filename` may contain subdirectories (`resources/x.js`); parents are
/// created as needed. Returns the final path.
pub(crate) fn write_file_atomic(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let dir = normalize_dir(dir)?;
    let target = validate_output_path(&dir, filename)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::WriteFailure(format!(
                "failed to create directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let tmp = target.with_extension("tmp");
    fs::write(&tmp, content).map_err(|e| {
        Error::WriteFailure(format!(
            "failed to write temporary file '{}': {e}",
            tmp.display()
        ))
    })?;

    fs::rename(&tmp, &target).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::WriteFailure(format!(
            "failed to rename '{}' to '{}': {e}",
            tmp.display(),
            target.display()
        ))
    })?;

    Ok(target)
}

/// Resolve an output directory against the working directory and normalize
/// `.` / `..` components.
fn normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        Ok(cleaned)
    } else {
        Ok(std::env::current_dir()?.join(&cleaned).clean())
    }
}

/// Validate a relative output filename against directory traversal.
///
/// The joined, cleaned path must still start with the base directory;
/// anything else (leading `..`, absolute components, null bytes) is
/// rejected.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(base_dir) {
        return Err(Error::InvalidOutputPath(format!(
            "path '{}' escapes output directory '{}'",
            filename,
            base_dir.display()
        )));
    }

    Ok(full_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_nested_files_and_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = write_file_atomic(tmp.path(), "resources/x.js", b"ok").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"ok");
        assert!(path.starts_with(tmp.path()));
    }

    #[test]
    fn overwrites_existing_content_atomically() {
        let tmp = TempDir::new().unwrap();
        write_file_atomic(tmp.path(), "a.html", b"first").unwrap();
        let path = write_file_atomic(tmp.path(), "a.html", b"second").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second");
        assert!(!tmp.path().join("a.tmp").exists());
    }

    #[test]
    fn rejects_traversal() {
        let tmp = TempDir::new().unwrap();
        let result = write_file_atomic(tmp.path(), "../escape.js", b"no");
        assert!(matches!(result, Err(Error::InvalidOutputPath(_))));
    }

    #[test]
    fn rejects_null_bytes() {
        let tmp = TempDir::new().unwrap();
        let result = write_file_atomic(tmp.path(), "bad\0name.js", b"no");
        assert!(matches!(result, Err(Error::InvalidOutputPath(_))));
    }

    #[test]
    fn relative_components_inside_the_dir_are_allowed() {
        let tmp = TempDir::new().unwrap();
        let path = write_file_atomic(tmp.path(), "./index.html", b"hi").unwrap();
        assert_eq!(path, tmp.path().join("index.html"));
    }
}
