//! The orchestration session.
//!
//! One [`PackSession`] is constructed per invocation and threads all mutable
//! run state (resolved package name, collected warnings, pass outputs)
//! through the phases explicitly, so repeated invocations (watch mode) never
//! share state. The phases run strictly in sequence on one task:
//!
//! ```text
//! scan -> synthesize plan -> editor pass -> rewrite UI assets
//!      -> runtime pass -> emit manifest
//! ```
//!
//! The runtime pass never starts before the editor pass's outputs are fully
//! on disk, and is configured to not clear the shared output directory. The
//! manifest is finalized last, from the artifacts both passes actually
//! produced.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::bundler::{
    BuildPass, BundleOutput, Bundler, OutputFormat, PassConfig, Platform,
};
use crate::config::{PackOptions, RuntimeBuild};
use crate::manifest::{OutputManifest, ReferenceManifest, resolve_package_name};
use crate::plan::{ASSETS_DIR, BuildPlan, synthesize};
use crate::rewrite::AssetPathRewriter;
use crate::scan::{NodeUnit, UI_EXT, scan_nodes};
use crate::{Error, Result, writer};

/// What an orchestration run produced.
#[derive(Debug, Default)]
pub struct PackReport {
    /// Identities of the valid units that were built.
    pub units: Vec<String>,

    /// Identities of discovered units that were skipped as invalid.
    pub skipped: Vec<String>,

    /// Where the manifest was written, when emission succeeded.
    pub manifest_path: Option<PathBuf>,

    /// Filenames of the compiled runtime modules, relative to the output
    /// directory.
    pub runtime_modules: Vec<String>,

    /// Non-fatal diagnostics collected across the run.
    pub warnings: Vec<String>,
}

/// Run a full two-pass packaging build.
///
/// This is the crate's main entry point. Configuration errors abort the run
/// before (or, for late discoveries, during) the build passes; a manifest
/// write failure is reported in the returned [`PackReport`] instead, since
/// the functional artifacts already exist by then.
pub async fn pack(options: &PackOptions, bundler: &dyn Bundler) -> Result<PackReport> {
    PackSession::new(options, bundler)?.run().await
}

/// Per-run context. Constructed fresh for every invocation.
struct PackSession<'a> {
    options: &'a PackOptions,
    bundler: &'a dyn Bundler,

    /// Directory name of the nodes root; the duplicated path segment the
    /// rewriter collapses.
    nodes_root_name: String,

    reference: Option<ReferenceManifest>,
    package_name: String,

    warnings: Vec<String>,
}

impl<'a> PackSession<'a> {
    /// Resolve everything that can fail before any build pass starts.
    fn new(options: &'a PackOptions, bundler: &'a dyn Bundler) -> Result<Self> {
        options.validate()?;

        let root = crate::scan::resolve_root(&options.nodes_dir)?;
        let nodes_root_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Config(format!(
                    "cannot determine nodes root directory name from '{}'",
                    root.display()
                ))
            })?;

        // The reference descriptor is only consulted when something will be
        // copied out of it.
        let reference = match &options.manifest {
            Some(m) if m.copy_package_name || m.copy_dependencies => {
                Some(ReferenceManifest::load(&m.source)?)
            }
            _ => None,
        };

        let package_name = resolve_package_name(
            options.manifest.as_ref(),
            options.package_name.as_deref(),
            reference.as_ref(),
        )?;

        Ok(Self {
            options,
            bundler,
            nodes_root_name,
            reference,
            package_name,
            warnings: Vec::new(),
        })
    }

    async fn run(mut self) -> Result<PackReport> {
        let units = scan_nodes(&self.options.nodes_dir, self.options.silent)?;
        self.record_skipped(&units);

        let plan = synthesize(&units, self.options.assets_dir.as_deref(), self.options.silent)?;
        if plan.is_empty() {
            self.warn("no valid nodes found; nothing to build".to_string());
            return Ok(self.into_report(&units, None, Vec::new()));
        }

        info!(
            package = %self.package_name,
            nodes = plan.entries.len(),
            "starting editor pass"
        );
        let editor_output = self.run_pass(self.editor_pass(&plan)).await?;
        self.rewrite_ui_assets(&editor_output)?;

        let runtime_output = self.run_runtime_pass(&plan).await?;
        let runtime_modules: Vec<String> = runtime_output
            .as_ref()
            .map(|out| {
                out.assets
                    .iter()
                    .filter(|a| a.filename.ends_with(".js"))
                    .map(|a| a.filename.clone())
                    .collect()
            })
            .unwrap_or_default();

        let manifest_path = self.emit_manifest(&editor_output, runtime_output.as_ref());

        Ok(self.into_report(&units, manifest_path, runtime_modules))
    }

    /// Pass 1: browser-targeted bundle of every UI definition. May clear the
    /// output directory; client assets land under the fixed assets
    /// subdirectory.
    fn editor_pass(&self, plan: &BuildPlan) -> PassConfig {
        PassConfig {
            pass: BuildPass::Editor,
            entries: plan.entries.clone(),
            out_dir: self.options.out_dir.clone(),
            assets_dir: ASSETS_DIR.to_string(),
            platform: Platform::Browser,
            format: OutputFormat::Esm,
            preserve_modules: false,
            bundle: true,
            external: Vec::new(),
            clear_dir: true,
            minify: false,
            sourcemap: false,
        }
    }

    /// Pass 2: host-loadable runtime modules. Forced settings: Node
    /// platform, CommonJS, one output per input, dependencies external, and
    /// the output directory is not cleared - pass 1's assets and the
    /// manifest location must survive.
    fn runtime_pass(&self, plan: &BuildPlan) -> PassConfig {
        let base = PassConfig {
            pass: BuildPass::Runtime,
            entries: plan
                .runtime_modules
                .iter()
                .cloned()
                .collect::<BTreeMap<_, _>>(),
            out_dir: self.options.out_dir.clone(),
            assets_dir: ASSETS_DIR.to_string(),
            platform: Platform::Node,
            format: OutputFormat::CommonJs,
            preserve_modules: true,
            bundle: false,
            external: Vec::new(),
            clear_dir: false,
            minify: false,
            sourcemap: false,
        };

        match &self.options.runtime_build {
            RuntimeBuild::Custom(overrides) => overrides.apply(base),
            _ => base,
        }
    }

    async fn run_pass(&self, pass: PassConfig) -> Result<BundleOutput> {
        let which = pass.pass;
        self.bundler
            .run(&pass)
            .await
            .map_err(|error| Error::Bundler { pass: which, error })
    }

    async fn run_runtime_pass(&mut self, plan: &BuildPlan) -> Result<Option<BundleOutput>> {
        if !self.options.runtime_build.is_enabled() {
            self.warn(
                "runtime build disabled; no compiled logic artifacts were produced".to_string(),
            );
            return Ok(None);
        }
        if plan.runtime_modules.is_empty() {
            return Ok(None);
        }

        info!(nodes = plan.runtime_modules.len(), "starting runtime pass");
        let output = self.run_pass(self.runtime_pass(plan)).await?;
        Ok(Some(output))
    }

    /// Post-process every emitted UI definition: collapse the duplicated
    /// assets segment and namespace references under the package name, then
    /// write the corrected markup back over the emitted file.
    fn rewrite_ui_assets(&self, output: &BundleOutput) -> Result<()> {
        let rewriter = AssetPathRewriter::new(&self.nodes_root_name, &self.package_name)?;
        let ui_suffix = format!(".{UI_EXT}");

        for asset in output.assets.iter().filter(|a| a.filename.ends_with(&ui_suffix)) {
            let Some(markup) = asset.source_utf8() else {
                continue;
            };
            match rewriter.rewrite(markup) {
                std::borrow::Cow::Borrowed(_) => {}
                std::borrow::Cow::Owned(rewritten) => {
                    debug!(asset = %asset.filename, "rewrote asset references");
                    writer::write_file_atomic(
                        &self.options.out_dir,
                        &asset.filename,
                        rewritten.as_bytes(),
                    )?;
                }
            }
        }

        Ok(())
    }

    /// Finalize and write the package manifest, after both passes.
    ///
    /// The node mapping records only identities that produced both a UI
    /// artifact and a runtime artifact; when the runtime pass was skipped
    /// the mapping is empty and a warning is recorded. A write failure is
    /// non-fatal - the build's functional artifacts already exist - so it is
    /// reported through the diagnostics channel instead of aborting.
    fn emit_manifest(
        &mut self,
        editor_output: &BundleOutput,
        runtime_output: Option<&BundleOutput>,
    ) -> Option<PathBuf> {
        let manifest_options = self.options.manifest.as_ref()?;

        let ui_suffix = format!(".{UI_EXT}");
        let mut nodes = BTreeMap::new();
        if let Some(runtime_output) = runtime_output {
            let produced: BTreeMap<&str, &str> = runtime_output
                .assets
                .iter()
                .filter(|a| a.filename.ends_with(".js"))
                .map(|a| (a.stem(), a.filename.as_str()))
                .collect();

            for asset in &editor_output.assets {
                if !asset.filename.ends_with(&ui_suffix) {
                    continue;
                }
                if let Some(logic) = produced.get(asset.stem()) {
                    nodes.insert(asset.stem().to_string(), (*logic).to_string());
                }
            }
        } else {
            self.warn(
                "manifest node mapping is empty: the runtime pass did not run".to_string(),
            );
        }

        let manifest = OutputManifest::assemble(
            self.package_name.clone(),
            manifest_options,
            self.reference.as_ref(),
            nodes,
        );

        let written = manifest.to_json().and_then(|json| {
            writer::write_file_atomic(&self.options.out_dir, "package.json", json.as_bytes())
        });

        match written {
            Ok(path) => {
                info!(path = %path.display(), "wrote package manifest");
                Some(path)
            }
            Err(e) => {
                error!("failed to write package manifest: {e}");
                self.warnings
                    .push(format!("failed to write package manifest: {e}"));
                None
            }
        }
    }

    fn record_skipped(&mut self, units: &[NodeUnit]) {
        if self.options.silent {
            return;
        }
        for unit in units.iter().filter(|u| !u.valid) {
            self.warnings
                .push(format!("skipped invalid node '{}'", unit.name));
        }
    }

    fn warn(&mut self, message: String) {
        if !self.options.silent {
            warn!("{message}");
        }
        self.warnings.push(message);
    }

    fn into_report(
        self,
        units: &[NodeUnit],
        manifest_path: Option<PathBuf>,
        runtime_modules: Vec<String>,
    ) -> PackReport {
        PackReport {
            units: units
                .iter()
                .filter(|u| u.valid)
                .map(|u| u.name.clone())
                .collect(),
            skipped: units
                .iter()
                .filter(|u| !u.valid)
                .map(|u| u.name.clone())
                .collect(),
            manifest_path,
            runtime_modules,
            warnings: self.warnings,
        }
    }
}
