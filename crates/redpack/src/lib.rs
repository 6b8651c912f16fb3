//! # redpack
//!
//! Build orchestration for packaging flow-editor node sets with a web bundler.
//!
//! A node set is a directory of extension units ("nodes"), each a subdirectory
//! holding an editor-facing UI definition (`<name>.html`) and runtime logic
//! (`<name>.js` or `<name>.ts`) that executes inside the host platform's own
//! process. One source tree therefore needs two divergent build artifacts per
//! node, and this crate computes the inputs, outputs and sequencing for the
//! two bundler passes that produce them:
//!
//! 1. **Editor pass** - browser-targeted bundle of every node's UI definition,
//!    with client assets emitted under a fixed `resources/` subdirectory.
//! 2. **Runtime pass** - host-loadable CommonJS modules, one output file per
//!    node, external dependencies left unresolved so the host's own module
//!    instances are reused.
//!
//! Between the passes, generated UI markup is rewritten so asset references
//! resolve under the host's nested serving path, and an installable package
//! manifest is emitted mapping each node to its compiled runtime module.
//!
//! The bundler itself is an external collaborator behind the [`Bundler`]
//! trait; redpack never parses, transforms or resolves modules on its own.
//!
//! ## Quick Start
//!
//! ```no_run
//! use redpack::{PackOptions, pack};
//! # async fn example(bundler: &dyn redpack::Bundler) -> redpack::Result<()> {
//! let options = PackOptions::new()
//!     .nodes_dir("nodes")
//!     .out_dir("dist");
//!
//! let report = pack(&options, bundler).await?;
//! println!("packaged {} nodes", report.units.len());
//! # Ok(()) }
//! ```

pub mod bundler;
pub mod config;
pub mod manifest;
pub mod plan;
pub mod rewrite;
pub mod scan;
pub mod session;

pub(crate) mod writer;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use bundler::{
    BuildPass, BundleOutput, Bundler, EmittedAsset, OutputFormat, PassConfig, Platform,
    RuntimeOverrides,
};
pub use config::{ManifestOptions, PackOptions, RuntimeBuild};
pub use manifest::{
    HOST_EXTENSION_KEY, MANIFEST_VERSION, NodeSection, OutputManifest, ReferenceManifest,
};
pub use plan::{ASSETS_DIR, BuildPlan};
pub use rewrite::AssetPathRewriter;
pub use scan::{NodeUnit, scan_nodes};
pub use session::{PackReport, pack};

/// Error types for redpack operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration or environment; always fatal before or during a
    /// build pass.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The external bundler failed during one of the two passes.
    #[error("Bundler failed during {pass} pass: {error}")]
    Bundler { pass: BuildPass, error: anyhow::Error },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),
}

/// Result type alias for redpack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "INVALID_CONFIG",
            Error::Bundler { .. } => "BUNDLER_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(msg) => Some(Box::new(format!(
                "Check the pack options and the node set layout.\nError: {}",
                msg
            ))),
            Error::Bundler { pass, .. } => Some(Box::new(format!(
                "The external bundler reported an error while running the {} pass. \
                 See the underlying error for details.",
                pass
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Ensure it's within the output directory \
                 and doesn't contain '..' components.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            _ => None,
        }
    }
}
