//! Build plan synthesis.
//!
//! Turns the validated unit set into the entry map for the editor pass and
//! the ordered runtime-logic paths for the runtime pass. Owned exclusively
//! by one orchestration run; never persisted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::scan::NodeUnit;
use crate::{Error, Result};

/// Fixed subdirectory for bundled client-side assets. The host platform only
/// serves UI assets from this path.
pub const ASSETS_DIR: &str = "resources";

/// Bundler inputs derived from the discovered units.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    /// Editor-pass entry map: unit identity to UI definition path.
    pub entries: BTreeMap<String, PathBuf>,

    /// Runtime-pass inputs: unit identity to runtime-logic path, in unit
    /// order.
    pub runtime_modules: Vec<(String, PathBuf)>,
}

impl BuildPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Synthesize the build plan from the scanned units.
///
/// Only valid units contribute entries; invalid units are excluded, not
/// partially built. When the surrounding project configuration pins an
/// asset-output directory it must equal [`ASSETS_DIR`], otherwise the
/// editor pass would emit assets the host never serves - a mismatch is a
/// [`Error::Config`]. The check is skipped when diagnostics are silenced.
pub fn synthesize(units: &[NodeUnit], assets_dir: Option<&str>, silent: bool) -> Result<BuildPlan> {
    if !silent {
        if let Some(dir) = assets_dir {
            if dir != ASSETS_DIR {
                return Err(Error::Config(format!(
                    "asset output directory is pinned to '{dir}' but the host platform \
                     requires '{ASSETS_DIR}'"
                )));
            }
        }
    }

    let mut plan = BuildPlan::default();
    for unit in units.iter().filter(|u| u.valid) {
        plan.entries.insert(unit.name.clone(), unit.ui_file.clone());
        if let Some(runtime) = &unit.runtime_file {
            plan.runtime_modules.push((unit.name.clone(), runtime.clone()));
        }
    }

    Ok(plan)
}
