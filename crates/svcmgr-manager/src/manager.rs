use crate::context::HostContext;
use crate::domain::Domain;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::rc::Rc;
use svcmgr_core::names;
use tracing::{debug, warn};

/// The set of managed domains, rebuilt from the services root on startup.
#[derive(Debug)]
pub struct ServiceManager {
    ctx: Rc<HostContext>,
    domains: BTreeMap<String, Domain>,
}

impl ServiceManager {
    /// Opens every domain directory under the configured root.
    pub fn load(ctx: HostContext) -> Result<Self> {
        let ctx = Rc::new(ctx);
        let root = ctx.config().root_dir.clone();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create {}", root.display()))?;

        let mut manager = Self {
            ctx,
            domains: BTreeMap::new(),
        };

        let entries =
            std::fs::read_dir(&root).with_context(|| format!("Failed to read {}", root.display()))?;
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if names::IGNORED_DIRS.contains(&name.as_str()) {
                continue;
            }
            if let Err(e) = names::validate(&name) {
                warn!("Skipping {}: {}", root.join(&name).display(), e);
                continue;
            }
            found.push(name);
        }

        for name in found {
            manager.domain(&name)?;
        }
        debug!("Loaded {} domains from {}", manager.domains.len(), root.display());
        Ok(manager)
    }

    #[must_use]
    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    /// The domain `name`, created if it does not exist yet.
    pub fn domain(&mut self, name: &str) -> Result<&mut Domain> {
        if !self.domains.contains_key(name) {
            let domain = Domain::open(Rc::clone(&self.ctx), name)?;
            self.domains.insert(name.to_string(), domain);
        }
        self.domains
            .get_mut(name)
            .with_context(|| format!("Domain {name} vanished"))
    }

    /// A known domain, without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Domain> {
        self.domains.get(name)
    }

    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Tears down every subdomain of `name` and removes its directory. Returns false if the
    /// domain was not known.
    pub fn delete_domain(&mut self, name: &str) -> Result<bool> {
        match self.domains.remove(name) {
            Some(domain) => {
                domain.delete()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
