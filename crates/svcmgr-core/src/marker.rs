//! The `.module` marker recording which module type is bound to a subdomain.

use crate::env::parse_env;
use crate::module::ModuleKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = ".module";
const KEY: &str = "MODULE_NAME";

#[derive(Debug, Clone)]
pub struct ModuleMarker {
    path: PathBuf,
}

impl ModuleMarker {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(FILE_NAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recorded type name, if the marker exists and carries one.
    pub fn read_name(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_env(&content).remove(KEY)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    pub fn write(&self, kind: ModuleKind) -> Result<()> {
        std::fs::write(&self.path, format!("{KEY}={kind}\n"))
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
