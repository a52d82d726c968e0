use crate::context::HostContext;
use crate::module::Module;
use crate::{proxy, registry};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use svcmgr_core::haproxy::{Route, RouteChange};
use svcmgr_core::state::ModuleState;
use svcmgr_core::{ModuleKind, ModuleMarker, names};
use svcmgr_utils::cert::CertificateStatus;
use svcmgr_utils::fs;
use tracing::{debug, info, warn};

/// A routable host name under a domain, carrying at most one module.
#[derive(Debug)]
pub struct Subdomain {
    ctx: Rc<HostContext>,
    domain: String,
    name: String,
    root_dir: PathBuf,
    certificate: PathBuf,
    module: Module,
}

/// What `module status` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub kind: ModuleKind,
    pub state: ModuleState,
    pub running: Vec<String>,
    pub exposed_port: Option<u16>,
    /// The proxy's current target for this subdomain.
    pub route: Option<String>,
}

impl Subdomain {
    /// Ensures the directory and certificate of `fqdn` and loads its bound module.
    pub(crate) fn open(ctx: Rc<HostContext>, domain: &str, domain_root: &Path, fqdn: &str) -> Result<Self> {
        let root_dir = domain_root.join(fqdn);
        std::fs::create_dir_all(&root_dir)
            .with_context(|| format!("Failed to create {}", root_dir.display()))?;

        let certificate = ctx.certificates().path_for(domain, fqdn);
        match ctx.certificates().ensure(domain, fqdn)? {
            CertificateStatus::Issued => info!("Issued certificate for {}", fqdn),
            CertificateStatus::Failed => warn!("Certificate request for {} failed", fqdn),
            CertificateStatus::Disabled | CertificateStatus::Present => {}
        }

        let module = registry::load_bound_module(&ctx, fqdn, &root_dir)?;
        Ok(Self {
            ctx,
            domain: domain.to_string(),
            name: fqdn.to_string(),
            root_dir,
            certificate,
            module,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The label under the domain, or the domain itself for the apex.
    #[must_use]
    pub fn label(&self) -> &str {
        names::label_of(&self.name, &self.domain)
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    #[must_use]
    pub fn certificate_path(&self) -> &Path {
        &self.certificate
    }

    /// The sanitized identifier used for proxy rules and the compose project.
    #[must_use]
    pub fn id(&self) -> String {
        names::escape(&self.name)
    }

    #[must_use]
    pub const fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    #[must_use]
    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    /// Replaces the bound module with a new one of type `type_name`.
    ///
    /// The previous module is torn down completely first. Unknown type names leave the
    /// subdomain without a module.
    pub fn bind(&mut self, type_name: &str) -> Result<&mut Module> {
        self.unbind()?;
        let module = registry::create_module(&self.ctx, type_name, &self.name, &self.root_dir)?;
        if !module.is_none() {
            ModuleMarker::in_dir(&self.root_dir).write(module.kind())?;
            info!("Bound {} to {}", module.kind(), self.name);
        }
        self.module = module;
        Ok(&mut self.module)
    }

    /// Tears down the bound module, unroutes the subdomain and forgets the module.
    pub fn unbind(&mut self) -> Result<()> {
        if !self.module.is_none() {
            info!("Unbinding {} from {}", self.module.kind(), self.name);
        }
        self.module.delete(&self.ctx)?;
        self.sync_proxy(&RouteChange::Remove)?;
        self.module = Module::none(&self.name, &self.root_dir);
        ModuleMarker::in_dir(&self.root_dir).remove()
    }

    /// Starts the module and routes the subdomain to it.
    pub fn up(&mut self) -> Result<()> {
        if self.module.is_none() {
            return Ok(());
        }
        self.module.up(&self.ctx)?;
        match self.module.exposed_port() {
            Some(port) => {
                let change = RouteChange::Add {
                    server: self.module.kind().to_string(),
                    port,
                };
                self.sync_proxy(&change)?;
            }
            None => warn!("{} has no usable HTTP_PORT, not routing it", self.name),
        }
        ModuleMarker::in_dir(&self.root_dir).write(self.module.kind())
    }

    /// Stops the module and removes its route.
    pub fn down(&mut self) -> Result<()> {
        if self.module.is_none() {
            return Ok(());
        }
        self.module.down(&self.ctx)?;
        self.sync_proxy(&RouteChange::Remove)?;
        ModuleMarker::in_dir(&self.root_dir).write(self.module.kind())
    }

    pub fn status(&self) -> Result<ModuleStatus> {
        Ok(ModuleStatus {
            kind: self.module.kind(),
            state: self.module.observed_state(&self.ctx)?,
            running: self.module.running_services(&self.ctx)?,
            exposed_port: self.module.exposed_port(),
            route: proxy::current_target(&self.ctx, &self.id()),
        })
    }

    /// Unbinds the module and removes the subdomain directory.
    pub(crate) fn delete(mut self) -> Result<()> {
        self.unbind()?;
        fs::remove_dir_best_effort(&self.root_dir);
        info!("Deleted subdomain {}", self.name);
        Ok(())
    }

    fn sync_proxy(&self, change: &RouteChange) -> Result<()> {
        let id = self.id();
        let certificate = self.certificate.to_string_lossy();
        // Only reference a certificate the proxy can actually load.
        let has_certificate = matches!(change, RouteChange::Remove) || self.certificate.is_file();
        let route = Route {
            id: &id,
            host: &self.name,
            certificate: has_certificate.then_some(certificate.as_ref()),
        };
        let outcome = proxy::sync(&self.ctx, &route, change)?;
        debug!("Proxy sync for {}: {:?}", self.name, outcome);
        Ok(())
    }
}
