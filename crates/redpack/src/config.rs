//! Pack configuration types.
//!
//! [`PackOptions`] is the single configuration surface for an orchestration
//! run. Every field has a stated default; use the builder methods for
//! ergonomic configuration.

use std::path::PathBuf;

use crate::bundler::RuntimeOverrides;

/// Options controlling manifest emission.
///
/// By default a reference `package.json` next to the invocation's working
/// directory is consulted and its name and dependency maps are propagated
/// into the emitted manifest.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    /// Path to the reference package descriptor, resolved against the
    /// working directory when relative.
    pub source: PathBuf,

    /// Use the reference descriptor's `name` for the emitted manifest.
    pub copy_package_name: bool,

    /// Copy `dependencies` and `devDependencies` verbatim from the reference
    /// descriptor into the emitted manifest.
    pub copy_dependencies: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("package.json"),
            copy_package_name: true,
            copy_dependencies: true,
        }
    }
}

/// How the second (runtime) build pass behaves.
#[derive(Debug, Clone, Default)]
pub enum RuntimeBuild {
    /// Run the runtime pass with the forced settings (default).
    #[default]
    Enabled,

    /// Skip the runtime pass. No compiled logic artifacts are produced;
    /// documented limitation, not a failure.
    Disabled,

    /// Run the runtime pass with user overrides layered on top of the
    /// forced settings. Forced settings always win for target environment,
    /// output directory and module format.
    Custom(RuntimeOverrides),
}

impl RuntimeBuild {
    /// Whether the runtime pass will run at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, RuntimeBuild::Disabled)
    }
}

/// Configuration for one orchestration run.
///
/// # Example
///
/// ```
/// use redpack::PackOptions;
///
/// let options = PackOptions::new()
///     .nodes_dir("nodes")
///     .out_dir("dist")
///     .package_name("my-node-set")
///     .silent(false);
/// ```
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Root directory containing one subdirectory per node.
    pub nodes_dir: PathBuf,

    /// Output directory shared by both build passes.
    pub out_dir: PathBuf,

    /// Explicit package name. Used when no reference descriptor supplies one.
    pub package_name: Option<String>,

    /// Manifest emission behavior; `None` disables the emitter entirely.
    pub manifest: Option<ManifestOptions>,

    /// Runtime pass behavior.
    pub runtime_build: RuntimeBuild,

    /// Suppress validation warnings (never suppresses errors).
    pub silent: bool,

    /// Client-asset subdirectory pinned by the surrounding project
    /// configuration, if any. Must equal `resources` when set; the host
    /// platform only serves UI assets from that path.
    pub assets_dir: Option<String>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            nodes_dir: PathBuf::from("nodes"),
            out_dir: PathBuf::from("dist"),
            package_name: None,
            manifest: Some(ManifestOptions::default()),
            runtime_build: RuntimeBuild::Enabled,
            silent: false,
            assets_dir: None,
        }
    }
}

impl PackOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nodes root directory.
    pub fn nodes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.nodes_dir = dir.into();
        self
    }

    /// Set the output directory.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Set the explicit package name.
    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.package_name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Configure manifest emission.
    pub fn manifest(mut self, manifest: ManifestOptions) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Disable manifest emission entirely.
    pub fn without_manifest(mut self) -> Self {
        self.manifest = None;
        self
    }

    /// Configure the runtime pass.
    pub fn runtime_build(mut self, runtime_build: RuntimeBuild) -> Self {
        self.runtime_build = runtime_build;
        self
    }

    /// Suppress validation warnings.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Record the client-asset subdirectory pinned by the surrounding
    /// project configuration.
    pub fn assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    /// Validate the options for internal consistency.
    pub fn validate(&self) -> crate::Result<()> {
        if self.nodes_dir.as_os_str().is_empty() {
            return Err(crate::Error::Config("nodes directory must not be empty".into()));
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(crate::Error::Config("output directory must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let opts = PackOptions::new();
        assert_eq!(opts.nodes_dir, PathBuf::from("nodes"));
        assert_eq!(opts.out_dir, PathBuf::from("dist"));
        assert!(opts.package_name.is_none());
        assert!(!opts.silent);
        assert!(opts.runtime_build.is_enabled());

        let manifest = opts.manifest.expect("manifest emission enabled by default");
        assert_eq!(manifest.source, PathBuf::from("package.json"));
        assert!(manifest.copy_package_name);
        assert!(manifest.copy_dependencies);
    }

    #[test]
    fn empty_package_name_is_treated_as_unset() {
        let opts = PackOptions::new().package_name("");
        assert!(opts.package_name.is_none());
    }

    #[test]
    fn validate_rejects_empty_dirs() {
        let opts = PackOptions::new().nodes_dir("");
        assert!(opts.validate().is_err());

        let opts = PackOptions::new().out_dir("");
        assert!(opts.validate().is_err());
    }

    #[test]
    fn runtime_build_enabled_flags() {
        assert!(RuntimeBuild::Enabled.is_enabled());
        assert!(RuntimeBuild::Custom(RuntimeOverrides::default()).is_enabled());
        assert!(!RuntimeBuild::Disabled.is_enabled());
    }
}
