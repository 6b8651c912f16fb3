//! End-to-end orchestration tests against a scripted bundler.
//!
//! The mock bundler materializes plausible outputs for whichever pass it is
//! handed: one HTML file per editor entry (with the duplicated asset path
//! the real bundler produces), a shared client asset under `resources/`, and
//! one CommonJS file per runtime entry. It records every pass configuration
//! it receives so tests can assert on sequencing and forced settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use redpack::{
    BuildPass, BundleOutput, Bundler, EmittedAsset, Error, ManifestOptions, OutputFormat,
    PackOptions, PassConfig, Platform, RuntimeBuild, RuntimeOverrides, pack,
};

#[derive(Default)]
struct MockBundler {
    /// Pass to fail on, if any.
    fail_on: Option<BuildPass>,
    /// Every configuration this bundler was invoked with, in order.
    calls: Mutex<Vec<PassConfig>>,
}

impl MockBundler {
    fn failing_on(pass: BuildPass) -> Self {
        Self {
            fail_on: Some(pass),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<PassConfig> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bundler for MockBundler {
    async fn run(&self, pass: &PassConfig) -> anyhow::Result<BundleOutput> {
        self.calls.lock().unwrap().push(pass.clone());

        if self.fail_on == Some(pass.pass) {
            anyhow::bail!("scripted failure");
        }

        fs::create_dir_all(&pass.out_dir)?;

        let mut assets = Vec::new();
        match pass.pass {
            BuildPass::Editor => {
                // The entry HTML is served from under the nodes-root segment,
                // so emitted references carry that segment duplicated.
                let root_name = pass
                    .entries
                    .values()
                    .next()
                    .and_then(|p| p.parent()?.parent()?.file_name())
                    .and_then(|n| n.to_str())
                    .unwrap_or("nodes")
                    .to_string();

                for name in pass.entries.keys() {
                    let markup = format!(
                        r#"<script src="/{assets}/{root_name}/{assets}/editor.js"></script>"#,
                        assets = pass.assets_dir,
                    );
                    assets.push(emit(&pass.out_dir, &format!("{name}.html"), markup.as_bytes())?);
                }
                assets.push(emit(
                    &pass.out_dir,
                    &format!("{}/editor.js", pass.assets_dir),
                    b"console.log('editor');",
                )?);
            }
            BuildPass::Runtime => {
                for name in pass.entries.keys() {
                    assets.push(emit(
                        &pass.out_dir,
                        &format!("{name}.js"),
                        b"module.exports = function (RED) {};",
                    )?);
                }
            }
        }

        Ok(BundleOutput { assets })
    }
}

fn emit(out_dir: &Path, filename: &str, content: &[u8]) -> anyhow::Result<EmittedAsset> {
    let path = out_dir.join(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(EmittedAsset::new(filename, content))
}

/// A project tree with a nodes root, per-node files, and an optional
/// reference package.json.
struct Fixture {
    _tmp: TempDir,
    nodes_dir: PathBuf,
    out_dir: PathBuf,
    package_json: PathBuf,
}

impl Fixture {
    fn new(nodes: &[(&str, &[&str])]) -> Self {
        let tmp = TempDir::new().unwrap();
        let nodes_dir = tmp.path().join("nodes");
        for (name, exts) in nodes {
            let dir = nodes_dir.join(name);
            fs::create_dir_all(&dir).unwrap();
            for ext in *exts {
                fs::write(dir.join(format!("{name}.{ext}")), "").unwrap();
            }
        }

        Self {
            nodes_dir,
            out_dir: tmp.path().join("dist"),
            package_json: tmp.path().join("package.json"),
            _tmp: tmp,
        }
    }

    fn with_reference(self, json: &str) -> Self {
        fs::write(&self.package_json, json).unwrap();
        self
    }

    fn options(&self) -> PackOptions {
        PackOptions::new()
            .nodes_dir(&self.nodes_dir)
            .out_dir(&self.out_dir)
            .manifest(ManifestOptions {
                source: self.package_json.clone(),
                ..Default::default()
            })
    }
}

#[tokio::test]
async fn full_run_produces_artifacts_and_manifest() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"]), ("beta", &["html", "js"])])
        .with_reference(r#"{"name":"pkg-a","dependencies":{"x":"1.0.0"}}"#);
    let bundler = MockBundler::default();

    let report = pack(&fixture.options(), &bundler).await.unwrap();

    assert_eq!(report.units, vec!["alpha", "beta"]);
    assert_eq!(report.runtime_modules, vec!["alpha.js", "beta.js"]);

    // Both passes' artifacts coexist in the output directory.
    assert!(fixture.out_dir.join("alpha.html").is_file());
    assert!(fixture.out_dir.join("alpha.js").is_file());
    assert!(fixture.out_dir.join("resources/editor.js").is_file());

    // Markup was rewritten under the resolved package name.
    let markup = fs::read_to_string(fixture.out_dir.join("alpha.html")).unwrap();
    assert!(markup.contains(r#"src="/resources/pkg-a/editor.js""#), "got: {markup}");

    // Manifest merges reference metadata with the produced runtime modules.
    let manifest_path = report.manifest_path.unwrap();
    assert_eq!(manifest_path, fixture.out_dir.join("package.json"));
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(manifest["name"], "pkg-a");
    assert_eq!(manifest["version"], "1.0.0");
    assert_eq!(manifest["dependencies"]["x"], "1.0.0");
    assert_eq!(manifest["node-red"]["nodes"]["alpha"], "alpha.js");
    assert_eq!(manifest["node-red"]["nodes"]["beta"], "beta.js");
}

#[tokio::test]
async fn passes_run_in_order_with_forced_settings() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"])])
        .with_reference(r#"{"name":"pkg-a"}"#);
    let bundler = MockBundler::default();

    pack(&fixture.options(), &bundler).await.unwrap();

    let calls = bundler.calls();
    assert_eq!(calls.len(), 2);

    let editor = &calls[0];
    assert_eq!(editor.pass, BuildPass::Editor);
    assert_eq!(editor.platform, Platform::Browser);
    assert!(editor.bundle);
    assert!(editor.clear_dir);
    assert_eq!(editor.assets_dir, "resources");

    let runtime = &calls[1];
    assert_eq!(runtime.pass, BuildPass::Runtime);
    assert_eq!(runtime.platform, Platform::Node);
    assert_eq!(runtime.format, OutputFormat::CommonJs);
    assert!(runtime.preserve_modules);
    assert!(!runtime.bundle);
    assert!(!runtime.clear_dir, "runtime pass must not clear pass 1's outputs");
    assert_eq!(runtime.out_dir, editor.out_dir);
}

#[tokio::test]
async fn runtime_overrides_cannot_unforce_critical_settings() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"])])
        .with_reference(r#"{"name":"pkg-a"}"#);
    let bundler = MockBundler::default();

    let options = fixture.options().runtime_build(RuntimeBuild::Custom(RuntimeOverrides {
        minify: Some(true),
        sourcemap: Some(true),
        external: vec!["lodash".into()],
    }));
    pack(&options, &bundler).await.unwrap();

    let runtime = bundler.calls().into_iter().last().unwrap();
    assert!(runtime.minify);
    assert!(runtime.sourcemap);
    assert_eq!(runtime.external, vec!["lodash".to_string()]);
    assert_eq!(runtime.platform, Platform::Node);
    assert_eq!(runtime.format, OutputFormat::CommonJs);
    assert!(!runtime.clear_dir);
}

#[tokio::test]
async fn invalid_units_are_excluded_end_to_end() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"]), ("beta", &["html"])])
        .with_reference(r#"{"name":"pkg-a"}"#);
    let bundler = MockBundler::default();

    let report = pack(&fixture.options(), &bundler).await.unwrap();

    assert_eq!(report.units, vec!["alpha"]);
    assert_eq!(report.skipped, vec!["beta"]);
    assert!(report.warnings.iter().any(|w| w.contains("beta")));

    let editor = &bundler.calls()[0];
    assert_eq!(editor.entries.len(), 1);
    assert!(editor.entries.contains_key("alpha"));

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(report.manifest_path.unwrap()).unwrap(),
    )
    .unwrap();
    assert!(manifest["node-red"]["nodes"].get("beta").is_none());
}

#[tokio::test]
async fn disabled_runtime_build_skips_pass_two_and_empties_the_mapping() {
    let fixture = Fixture::new(&[
        ("alpha", &["html", "js"]),
        ("beta", &["html", "js"]),
        ("gamma", &["html", "js"]),
    ])
    .with_reference(r#"{"name":"pkg-a"}"#);
    let bundler = MockBundler::default();

    let options = fixture.options().runtime_build(RuntimeBuild::Disabled);
    let report = pack(&options, &bundler).await.unwrap();

    // Only the editor pass ran.
    assert_eq!(bundler.calls().len(), 1);
    assert!(fixture.out_dir.join("alpha.html").is_file());
    assert!(fixture.out_dir.join("resources/editor.js").is_file());
    assert!(!fixture.out_dir.join("alpha.js").exists());
    assert!(report.runtime_modules.is_empty());

    // The manifest never references artifacts that were not produced.
    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(report.manifest_path.unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["node-red"]["nodes"], serde_json::json!({}));
    assert!(report.warnings.iter().any(|w| w.contains("runtime")));
}

#[tokio::test]
async fn missing_package_name_fails_before_any_pass() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"])]);
    // Reference exists but carries no name, and no explicit name is set.
    let fixture = fixture.with_reference(r#"{"dependencies":{}}"#);
    let bundler = MockBundler::default();

    let result = pack(&fixture.options(), &bundler).await;
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(bundler.calls().is_empty());
}

#[tokio::test]
async fn explicit_name_serves_disabled_manifest_runs() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"])]);
    let bundler = MockBundler::default();

    let options = PackOptions::new()
        .nodes_dir(&fixture.nodes_dir)
        .out_dir(&fixture.out_dir)
        .package_name("standalone-pkg")
        .without_manifest();
    let report = pack(&options, &bundler).await.unwrap();

    assert!(report.manifest_path.is_none());
    assert!(!fixture.out_dir.join("package.json").exists());

    // The rewriter still namespaces assets under the explicit name.
    let markup = fs::read_to_string(fixture.out_dir.join("alpha.html")).unwrap();
    assert!(markup.contains(r#"src="/resources/standalone-pkg/editor.js""#));
}

#[tokio::test]
async fn bundler_failure_aborts_the_run() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"])])
        .with_reference(r#"{"name":"pkg-a"}"#);

    let bundler = MockBundler::failing_on(BuildPass::Editor);
    let result = pack(&fixture.options(), &bundler).await;
    assert!(matches!(result, Err(Error::Bundler { pass: BuildPass::Editor, .. })));

    let bundler = MockBundler::failing_on(BuildPass::Runtime);
    let result = pack(&fixture.options(), &bundler).await;
    assert!(matches!(result, Err(Error::Bundler { pass: BuildPass::Runtime, .. })));
}

#[tokio::test]
async fn manifest_write_failure_is_non_fatal() {
    let fixture = Fixture::new(&[("alpha", &["html", "js"])])
        .with_reference(r#"{"name":"pkg-a"}"#);
    let bundler = MockBundler::default();

    // Occupy the manifest location with a directory so the write fails.
    fs::create_dir_all(fixture.out_dir.join("package.json")).unwrap();

    let report = pack(&fixture.options(), &bundler).await.unwrap();

    assert!(report.manifest_path.is_none());
    assert!(report.warnings.iter().any(|w| w.contains("manifest")));
    // Functional artifacts still exist.
    assert!(fixture.out_dir.join("alpha.html").is_file());
    assert!(fixture.out_dir.join("alpha.js").is_file());
}

#[tokio::test]
async fn missing_nodes_root_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    let options = PackOptions::new()
        .nodes_dir(tmp.path().join("absent"))
        .out_dir(tmp.path().join("dist"))
        .package_name("pkg")
        .without_manifest();

    let result = pack(&options, &MockBundler::default()).await;
    assert!(matches!(result, Err(Error::Config(_))));
}
