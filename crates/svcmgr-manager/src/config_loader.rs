use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use svcmgr_core::GlobalConfig;
use svcmgr_utils::env;
use tracing::{debug, info};

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Default,
    File(PathBuf),
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File(p) => write!(f, "{}", p.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub config: GlobalConfig,
    pub source: Provenance,
}

impl ConfigLoader {
    /// Loads `$SVCMGR_CONFIG` or the XDG `config.toml` and validates it once.
    ///
    /// `root_dir` (from `--root-dir`) takes precedence over `$SVCMGR_ROOT_DIR`.
    pub fn load(root_dir: Option<PathBuf>) -> Result<Self> {
        Self::resolve(&env::config_file(), root_dir.or_else(env::root_dir_override))
    }

    /// [`Self::load_from`] followed by the root override and validation.
    pub fn resolve(path: &Path, root_dir: Option<PathBuf>) -> Result<Self> {
        let mut loader = Self::load_from(path)?;
        loader.apply_root_override(root_dir);
        loader.validate()?;
        Ok(loader)
    }

    /// Loads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self {
                config: GlobalConfig::default(),
                source: Provenance::Default,
            });
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());

        Ok(Self {
            config,
            source: Provenance::File(path.to_path_buf()),
        })
    }

    pub fn apply_root_override(&mut self, root_dir: Option<PathBuf>) {
        if let Some(root_dir) = root_dir {
            debug!("root_dir overridden to {}", root_dir.display());
            self.config.root_dir = root_dir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.config
            .validate()
            .with_context(|| format!("Invalid configuration ({})", self.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcmgr_core::config::ProxyKind;

    #[test]
    fn missing_file_means_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::load_from(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(loader.source, Provenance::Default);
        assert_eq!(loader.config, GlobalConfig::default());
    }

    #[test]
    fn file_values_and_root_override() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "root_dir = \"/data/services\"\n[proxy]\nkind = \"other\"\n",
        )
        .unwrap();

        let mut loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.source, Provenance::File(path.clone()));
        assert_eq!(loader.config.root_dir, PathBuf::from("/data/services"));
        assert_eq!(loader.config.proxy.kind, ProxyKind::Other);

        loader.apply_root_override(Some(PathBuf::from("/elsewhere")));
        assert_eq!(loader.config.root_dir, PathBuf::from("/elsewhere"));
        loader.apply_root_override(None);
        assert_eq!(loader.config.root_dir, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn parse_and_validation_errors_name_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        std::fs::write(&path, "root_dir = [").unwrap();
        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));

        std::fs::write(&path, "[compose]\ncommand = []\n").unwrap();
        let loader = ConfigLoader::load_from(&path).unwrap();
        let err = loader.validate().unwrap_err();
        assert!(format!("{err:#}").contains("compose.command"));

        let err = ConfigLoader::resolve(&path, None).unwrap_err();
        assert!(format!("{err:#}").contains("compose.command"));
    }

    #[test]
    fn resolve_applies_the_root_override() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "root_dir = \"/data/services\"\n").unwrap();

        let loader = ConfigLoader::resolve(&path, Some(PathBuf::from("/elsewhere"))).unwrap();
        assert_eq!(loader.config.root_dir, PathBuf::from("/elsewhere"));

        let loader = ConfigLoader::resolve(&path, None).unwrap();
        assert_eq!(loader.config.root_dir, PathBuf::from("/data/services"));
    }
}
