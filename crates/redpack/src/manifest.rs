//! Package manifest reading and emission.
//!
//! Two documents meet here: an optional reference descriptor (the project's
//! own `package.json`, read-only, one build invocation's lifetime) and the
//! installable [`OutputManifest`] written next to the build artifacts. The
//! output manifest maps each node identity to its compiled runtime module
//! under the host extension key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ManifestOptions;
use crate::{Error, Result};

/// Key under which the host platform looks up the node mapping.
pub const HOST_EXTENSION_KEY: &str = "node-red";

/// Fixed version stamped on every emitted manifest.
pub const MANIFEST_VERSION: &str = "1.0.0";

/// The reference package descriptor, as far as this crate cares about it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl ReferenceManifest {
    /// Load the reference descriptor from `path`, resolved against the
    /// working directory when relative. Missing file or malformed JSON is a
    /// [`Error::Config`]: this is a one-shot setup step where retrying
    /// cannot help.
    pub fn load(path: &Path) -> Result<Self> {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let raw = fs::read_to_string(&resolved).map_err(|e| {
            Error::Config(format!(
                "cannot read reference manifest '{}': {e}",
                resolved.display()
            ))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "malformed reference manifest '{}': {e}",
                resolved.display()
            ))
        })
    }
}

/// The node mapping section keyed by [`HOST_EXTENSION_KEY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSection {
    /// Node identity to relative compiled-logic filename.
    pub nodes: BTreeMap<String, String>,
}

/// The installable package descriptor emitted at the output root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputManifest {
    pub name: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,

    #[serde(
        rename = "devDependencies",
        skip_serializing_if = "Option::is_none"
    )]
    pub dev_dependencies: Option<BTreeMap<String, String>>,

    #[serde(rename = "node-red")]
    pub node_section: NodeSection,
}

impl OutputManifest {
    /// Assemble the output manifest from the resolved name, the optional
    /// reference descriptor, and the node mapping.
    ///
    /// Dependency maps are copied verbatim when `copy_dependencies` is set
    /// and a reference was loaded (empty maps when absent in the source);
    /// otherwise they are omitted.
    pub fn assemble(
        name: String,
        options: &ManifestOptions,
        reference: Option<&ReferenceManifest>,
        nodes: BTreeMap<String, String>,
    ) -> Self {
        let (dependencies, dev_dependencies) = match reference {
            Some(reference) if options.copy_dependencies => (
                Some(reference.dependencies.clone()),
                Some(reference.dev_dependencies.clone()),
            ),
            _ => (None, None),
        };

        Self {
            name,
            version: MANIFEST_VERSION.to_string(),
            dependencies,
            dev_dependencies,
            node_section: NodeSection { nodes },
        }
    }

    /// Serialize to pretty-printed JSON, the form written to disk.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::WriteFailure(format!("cannot serialize manifest: {e}")))
    }

    /// The location the manifest is written to.
    pub fn path_in(out_dir: &Path) -> PathBuf {
        out_dir.join("package.json")
    }
}

/// Resolve the name the emitted manifest (and the asset path rewriter) will
/// use.
///
/// Precedence: the reference descriptor's name when `copy_package_name` is
/// enabled and a reference was loaded, then the explicitly configured name.
/// Neither available is a [`Error::Config`].
pub fn resolve_package_name(
    options: Option<&ManifestOptions>,
    explicit: Option<&str>,
    reference: Option<&ReferenceManifest>,
) -> Result<String> {
    if let (Some(options), Some(reference)) = (options, reference) {
        if options.copy_package_name {
            if let Some(name) = reference.name.as_deref() {
                if !name.is_empty() {
                    return Ok(name.to_string());
                }
            }
        }
    }

    match explicit {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::Config(
            "no package name available: set an explicit name or provide a reference \
             manifest with one"
                .into(),
        )),
    }
}
