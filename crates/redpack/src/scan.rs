//! Node set discovery.
//!
//! Walks the nodes root and discovers one extension unit per subdirectory.
//! A unit `d` is valid when both `d/d.html` (editor UI definition) and
//! `d/d.js` or `d/d.ts` (runtime logic, `.js` preferred) exist. Units
//! missing either file are marked invalid, warned about unless silenced,
//! and excluded from every downstream output.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Result};

/// Extension of the editor-facing UI definition file.
pub const UI_EXT: &str = "html";

/// Recognized runtime-logic extensions, in preference order.
pub const RUNTIME_EXTS: [&str; 2] = ["js", "ts"];

/// One discovered extension unit. Immutable after the scan.
#[derive(Debug, Clone)]
pub struct NodeUnit {
    /// Unit identity: the subdirectory name.
    pub name: String,

    /// Path to `<name>.html`, present or not.
    pub ui_file: PathBuf,

    /// Path to the runtime-logic file, if one was found.
    pub runtime_file: Option<PathBuf>,

    /// Both required files exist.
    pub valid: bool,
}

/// Scan the nodes root for extension units.
///
/// Fails with [`Error::Config`] when the root is missing, is not a
/// directory, or contains no subdirectories (no possible entry points).
/// Invalid units are returned with `valid == false` so callers can report
/// on them, but they never become entry points.
pub fn scan_nodes(root: &Path, silent: bool) -> Result<Vec<NodeUnit>> {
    let root = resolve_root(root)?;

    let mut units = Vec::new();
    let mut entries: Vec<PathBuf> = fs::read_dir(&root)
        .map_err(|e| Error::Config(format!("cannot read nodes directory '{}': {e}", root.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Err(Error::Config(format!(
            "no node directories found under '{}'",
            root.display()
        )));
    }

    for dir in entries {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        units.push(scan_unit(&dir, name, silent));
    }

    Ok(units)
}

/// Resolve the nodes root against the working directory and require it to be
/// an existing directory.
pub(crate) fn resolve_root(root: &Path) -> Result<PathBuf> {
    let resolved = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };

    if !resolved.is_dir() {
        return Err(Error::Config(format!(
            "nodes directory '{}' does not exist or is not a directory",
            resolved.display()
        )));
    }

    Ok(resolved)
}

fn scan_unit(dir: &Path, name: &str, silent: bool) -> NodeUnit {
    let ui_file = dir.join(format!("{name}.{UI_EXT}"));
    let runtime_file = RUNTIME_EXTS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|candidate| candidate.is_file());

    let ui_present = ui_file.is_file();
    if !ui_present && !silent {
        warn!(node = name, file = %ui_file.display(), "skipping node: missing UI definition");
    }
    if runtime_file.is_none() && !silent {
        warn!(node = name, "skipping node: missing runtime logic ({name}.js or {name}.ts)");
    }

    let valid = ui_present && runtime_file.is_some();
    NodeUnit {
        name: name.to_string(),
        ui_file,
        runtime_file,
        valid,
    }
}
