//! The per-module `.env` store.
//!
//! A module's parameters come from three layers: identity keys derived from the subdomain,
//! module-type defaults (generated passwords, allocated ports, literals) and whatever is
//! already persisted on disk. Later layers win, so a value written by a previous run or by
//! the operator is never replaced, while keys introduced by a newer module definition are
//! added.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub type EnvMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvLayerKind {
    /// Identity keys every module receives.
    Base,
    /// Freshly generated module-type defaults.
    Module,
    /// Values read back from the `.env` file.
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayer {
    pub kind: EnvLayerKind,
    pub vars: EnvMap,
}

impl EnvLayer {
    #[must_use]
    pub const fn new(kind: EnvLayerKind, vars: EnvMap) -> Self {
        Self { kind, vars }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvVar {
    pub value: String,
    pub source: EnvLayerKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedEnv {
    pub vars: BTreeMap<String, ResolvedEnvVar>,
}

impl ResolvedEnv {
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.value.as_str())
    }

    /// Keys whose winning value did not come from disk, i.e. what a write adds.
    pub fn fresh_keys(&self) -> impl Iterator<Item = &str> {
        self.vars
            .iter()
            .filter(|(_, v)| v.source != EnvLayerKind::Persisted)
            .map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn to_map(&self) -> EnvMap {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

#[must_use]
pub fn merge_env_layers(layers: &[EnvLayer]) -> ResolvedEnv {
    let mut resolved = ResolvedEnv::default();

    for layer in layers {
        for (key, value) in &layer.vars {
            resolved.vars.insert(
                key.clone(),
                ResolvedEnvVar {
                    value: value.clone(),
                    source: layer.kind,
                },
            );
        }
    }

    resolved
}

/// Parse `KEY=VALUE` lines.
///
/// Each line is trimmed and split on its first `=`. Lines without a `=` (blank lines
/// included) are skipped.
#[must_use]
pub fn parse_env(content: &str) -> EnvMap {
    content
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Render a mapping as `KEY=VALUE` lines in key order.
#[must_use]
pub fn render_env(vars: &EnvMap) -> String {
    let mut out = String::new();
    for (key, value) in vars {
        let _ = writeln!(out, "{key}={value}");
    }
    out
}

/// A `KEY=VALUE` file on disk.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub const FILE_NAME: &'static str = ".env";

    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::with_path(dir.join(Self::FILE_NAME))
    }

    #[must_use]
    pub const fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the file; a missing file is an empty mapping.
    pub fn read(&self) -> Result<EnvMap> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_env(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EnvMap::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    pub fn write(&self, vars: &EnvMap) -> Result<()> {
        std::fs::write(&self.path, render_env(vars))
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Merge `layers` under the persisted values, write the result back and return it.
    pub fn reconcile(&self, layers: Vec<EnvLayer>) -> Result<ResolvedEnv> {
        let persisted = self.read()?;
        let mut layers = layers;
        layers.push(EnvLayer::new(EnvLayerKind::Persisted, persisted));
        let resolved = merge_env_layers(&layers);

        let added: Vec<&str> = resolved.fresh_keys().collect();
        if !added.is_empty() {
            tracing::debug!("Adding {:?} to {}", added, self.path.display());
        }

        self.write(&resolved.to_map())?;
        Ok(resolved)
    }

    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn later_layers_win_and_sources_are_tracked() {
        let resolved = merge_env_layers(&[
            EnvLayer::new(EnvLayerKind::Base, map(&[("DOMAIN", "a.example.com")])),
            EnvLayer::new(
                EnvLayerKind::Module,
                map(&[("PASSWORD", "fresh"), ("HTTP_PORT", "4000")]),
            ),
            EnvLayer::new(EnvLayerKind::Persisted, map(&[("PASSWORD", "existing123")])),
        ]);

        assert_eq!(resolved.get_value("PASSWORD"), Some("existing123"));
        assert_eq!(resolved.get_value("HTTP_PORT"), Some("4000"));
        assert_eq!(
            resolved.vars["PASSWORD"].source,
            EnvLayerKind::Persisted
        );
        let fresh: Vec<&str> = resolved.fresh_keys().collect();
        assert_eq!(fresh, vec!["DOMAIN", "HTTP_PORT"]);
    }

    #[test]
    fn parse_skips_lines_without_separator() {
        let vars = parse_env("A=1\n\nnot a pair\nB=x=y\n   \nC=\n");
        assert_eq!(vars, map(&[("A", "1"), ("B", "x=y"), ("C", "")]));
    }

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvFile::in_dir(dir.path());
        assert!(file.read().unwrap().is_empty());

        let vars = map(&[("B", "2"), ("A", "1")]);
        file.write(&vars).unwrap();
        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "A=1\nB=2\n"
        );
        assert_eq!(file.read().unwrap(), vars);

        file.remove().unwrap();
        file.remove().unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn reconcile_keeps_persisted_values_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvFile::in_dir(dir.path());
        std::fs::write(file.path(), "PASSWORD=existing123\n").unwrap();

        for generated in ["first", "second"] {
            let resolved = file
                .reconcile(vec![EnvLayer::new(
                    EnvLayerKind::Module,
                    map(&[("PASSWORD", generated), ("NEW_KEY", generated)]),
                )])
                .unwrap();
            assert_eq!(resolved.get_value("PASSWORD"), Some("existing123"));
        }

        let on_disk = file.read().unwrap();
        assert_eq!(on_disk["PASSWORD"], "existing123");
        // Added by the first run, then persisted.
        assert_eq!(on_disk["NEW_KEY"], "first");
    }

    proptest! {
        #[test]
        fn render_then_parse_is_identity(
            vars in proptest::collection::btree_map("[A-Z_][A-Z0-9_]{0,12}", "[!-~]{0,20}", 0..8)
        ) {
            prop_assert_eq!(parse_env(&render_env(&vars)), vars);
        }
    }
}
