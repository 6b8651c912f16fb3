//! Asset path rewriting for generated UI markup.
//!
//! The host platform serves package assets under
//! `/resources/<package-name>/...`, but because the entry HTML itself is
//! treated as living under `/resources/<nodes-root-name>/`, the bundler
//! emits references with the segment duplicated:
//! `/resources/<nodes-root-name>/resources/...`. This transform collapses
//! the duplicated `resources/` segment and substitutes the resolved package
//! name for the nodes-root name.
//!
//! Pure string substitution over `src=` and `href=` attributes - no HTML
//! parsing. Idempotent by construction: the pattern only matches the
//! duplicated form, so already-correct markup is left alone.

use std::borrow::Cow;

use regex::Regex;

use crate::plan::ASSETS_DIR;
use crate::{Error, Result};

/// Rewrites asset references in one run's emitted UI markup.
#[derive(Debug)]
pub struct AssetPathRewriter {
    pattern: Regex,
    replacement: String,
}

impl AssetPathRewriter {
    /// Build a rewriter for the given nodes-root directory name and resolved
    /// package name.
    pub fn new(nodes_root_name: &str, package_name: &str) -> Result<Self> {
        let pattern = format!(
            r#"(?P<attr>src|href)="/{assets}/{root}/{assets}/"#,
            assets = ASSETS_DIR,
            root = regex::escape(nodes_root_name),
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid asset path pattern: {e}")))?;

        let replacement = format!(r#"${{attr}}="/{ASSETS_DIR}/{package_name}/"#);

        Ok(Self { pattern, replacement })
    }

    /// Rewrite all duplicated asset references in `markup`. Attributes that
    /// do not match the duplicated form are left untouched.
    pub fn rewrite<'a>(&self, markup: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(markup, self.replacement.as_str())
    }
}
