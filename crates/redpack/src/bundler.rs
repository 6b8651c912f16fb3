//! The bundler seam.
//!
//! redpack does not bundle anything itself; it computes inputs, outputs and
//! sequencing for an external bundler consumed through the [`Bundler`] trait.
//! The orchestration run invokes the bundler twice with independently
//! synthesized [`PassConfig`]s and post-processes what it emits.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

/// Which of the two build passes a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPass {
    /// Pass 1: browser-targeted bundle of the node UI definitions.
    Editor,
    /// Pass 2: host-loadable runtime modules.
    Runtime,
}

impl std::fmt::Display for BuildPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildPass::Editor => write!(f, "editor"),
            BuildPass::Runtime => write!(f, "runtime"),
        }
    }
}

/// Environment the bundled code will execute in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Browser-based flow editor.
    Browser,
    /// The host platform's own Node.js process.
    Node,
}

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// ES modules, for the editor bundle.
    Esm,
    /// CommonJS, loadable by the host runtime's `require`.
    CommonJs,
}

/// One file emitted by a bundler pass.
///
/// The bundler writes the file into the pass's output directory and reports
/// it here; `filename` is relative to that directory.
#[derive(Debug, Clone)]
pub struct EmittedAsset {
    pub filename: String,
    pub source: Vec<u8>,
}

impl EmittedAsset {
    pub fn new(filename: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
        }
    }

    /// The asset content as UTF-8 text, if it is text.
    pub fn source_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.source).ok()
    }

    /// Filename stem (identity for per-node artifacts).
    pub fn stem(&self) -> &str {
        let name = self
            .filename
            .rsplit_once('/')
            .map_or(self.filename.as_str(), |(_, n)| n);
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }
}

/// Everything one bundler pass produced.
#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
    pub assets: Vec<EmittedAsset>,
}

/// Configuration for one bundler pass.
///
/// Synthesized by the orchestration run; the bundler must honor every field.
/// In particular `clear_dir` is `false` for the runtime pass because the
/// editor pass's assets and the package manifest already live in the output
/// directory and must survive.
#[derive(Debug, Clone)]
pub struct PassConfig {
    pub pass: BuildPass,

    /// Named entry points: node identity to source file.
    pub entries: BTreeMap<String, PathBuf>,

    /// Output directory, shared by both passes.
    pub out_dir: PathBuf,

    /// Subdirectory for bundled client-side assets, relative to `out_dir`.
    pub assets_dir: String,

    pub platform: Platform,
    pub format: OutputFormat,

    /// Emit one output file per entry, no chunk merging.
    pub preserve_modules: bool,

    /// Bundle imported packages into the output. `false` leaves bare imports
    /// unresolved; they are installed alongside the package. Bundling a
    /// host-runtime dependency would duplicate modules the host deduplicates
    /// and break identity checks on its own APIs.
    pub bundle: bool,

    /// Additional packages to leave external even when `bundle` is `true`.
    pub external: Vec<String>,

    /// Clear the output directory before emitting.
    pub clear_dir: bool,

    pub minify: bool,
    pub sourcemap: bool,
}

/// User-overridable subset of the runtime pass configuration.
///
/// Applied by [`RuntimeOverrides::apply`], an explicit field-by-field
/// override: only the fields listed here can change, and the forced fields
/// (platform, output directory, module format, preserve-modules, no-clear)
/// always keep their synthesized values.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub minify: Option<bool>,
    pub sourcemap: Option<bool>,

    /// Extra packages to leave external.
    pub external: Vec<String>,
}

impl RuntimeOverrides {
    /// Layer these overrides on top of a synthesized runtime pass config.
    pub(crate) fn apply(&self, mut base: PassConfig) -> PassConfig {
        if let Some(minify) = self.minify {
            base.minify = minify;
        }
        if let Some(sourcemap) = self.sourcemap {
            base.sourcemap = sourcemap;
        }
        base.external.extend(self.external.iter().cloned());
        // platform, format, out_dir, preserve_modules, bundle and clear_dir
        // are correctness-critical and never overridable.
        base
    }
}

/// The external bundler collaborator.
///
/// Implementations run one build pass: resolve and transform the configured
/// entries, write the outputs into `pass.out_dir`, and report every emitted
/// file. Failures surface as [`crate::Error::Bundler`].
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn run(&self, pass: &PassConfig) -> anyhow::Result<BundleOutput>;
}
