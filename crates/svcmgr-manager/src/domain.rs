use crate::context::HostContext;
use crate::subdomain::Subdomain;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use svcmgr_core::names;
use svcmgr_utils::fs;
use tracing::{debug, info};

/// A top-level DNS name and the subdomains found in its directory.
///
/// The directory tree is the only record of which subdomains exist: every sub-directory
/// named `<domain>` or `<label>.<domain>` is one.
#[derive(Debug)]
pub struct Domain {
    ctx: Rc<HostContext>,
    name: String,
    root_dir: PathBuf,
    subdomains: BTreeMap<String, Subdomain>,
}

impl Domain {
    pub(crate) fn open(ctx: Rc<HostContext>, name: &str) -> Result<Self> {
        names::validate(name)?;
        let root_dir = ctx.config().root_dir.join(name);
        std::fs::create_dir_all(&root_dir)
            .with_context(|| format!("Failed to create {}", root_dir.display()))?;

        let mut domain = Self {
            ctx,
            name: name.to_string(),
            root_dir,
            subdomains: BTreeMap::new(),
        };
        domain.load_subdomains()?;
        Ok(domain)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Rescans the domain directory and returns the names of all known subdomains.
    ///
    /// Subdomains already loaded are kept as they are.
    pub fn load_subdomains(&mut self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root_dir)
            .with_context(|| format!("Failed to read {}", self.root_dir.display()))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(dir_name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if names::is_subdomain_dir(&dir_name, &self.name) {
                found.push(dir_name);
            }
        }

        for fqdn in found {
            self.get_or_open(&fqdn)?;
        }
        Ok(self.subdomains.keys().cloned().collect())
    }

    /// The subdomain `label` (`blog`, `blog.example.com` or the domain name for the apex),
    /// created if it does not exist yet.
    pub fn subdomain(&mut self, label: &str) -> Result<&mut Subdomain> {
        names::validate(label)?;
        let fqdn = names::qualify(label, &self.name);
        self.get_or_open(&fqdn)
    }

    fn get_or_open(&mut self, fqdn: &str) -> Result<&mut Subdomain> {
        if !self.subdomains.contains_key(fqdn) {
            debug!("Loading subdomain {}", fqdn);
            let sub = Subdomain::open(Rc::clone(&self.ctx), &self.name, &self.root_dir, fqdn)?;
            self.subdomains.insert(fqdn.to_string(), sub);
        }
        self.subdomains
            .get_mut(fqdn)
            .with_context(|| format!("Subdomain {fqdn} vanished"))
    }

    /// A known subdomain, without creating it.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Subdomain> {
        self.subdomains.get(&names::qualify(label, &self.name))
    }

    pub fn subdomain_names(&self) -> impl Iterator<Item = &str> {
        self.subdomains.keys().map(String::as_str)
    }

    /// Tears down and removes the subdomain `label`. Returns false if it was not known.
    pub fn delete_subdomain(&mut self, label: &str) -> Result<bool> {
        let fqdn = names::qualify(label, &self.name);
        match self.subdomains.remove(&fqdn) {
            Some(sub) => {
                sub.delete()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tears down every subdomain, then removes the domain directory.
    pub(crate) fn delete(mut self) -> Result<()> {
        let subdomains = std::mem::take(&mut self.subdomains);
        for (_, sub) in subdomains {
            sub.delete()?;
        }
        fs::remove_dir_best_effort(&self.root_dir);
        info!("Deleted domain {}", self.name);
        Ok(())
    }
}
