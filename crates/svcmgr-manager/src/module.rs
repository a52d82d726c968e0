use crate::context::HostContext;
use crate::hooks;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use svcmgr_core::env::{EnvFile, EnvLayer, EnvLayerKind, EnvMap};
use svcmgr_core::module::{self as catalog, ModuleKind};
use svcmgr_core::state::ModuleState;
use svcmgr_core::{names, template};
use svcmgr_utils::compose::ComposeProject;
use svcmgr_utils::fs;
use tracing::{debug, info, warn};

/// Name of the rendered compose file in the subdomain directory.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Result of an attached session on one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Finished,
    /// The service is not part of the project; carries the valid names.
    UnknownService(Vec<String>),
}

/// A module type bound to one subdomain, with its resolved environment.
///
/// The `NoModule` variant accepts every operation and does nothing.
#[derive(Debug, Clone)]
pub struct Module {
    kind: ModuleKind,
    fqdn: String,
    root_dir: PathBuf,
    env: EnvMap,
    exposed_port: Option<u16>,
    state: ModuleState,
    notices: Vec<String>,
}

impl Module {
    #[must_use]
    pub fn none(fqdn: &str, root_dir: &Path) -> Self {
        Self {
            kind: ModuleKind::NoModule,
            fqdn: fqdn.to_string(),
            root_dir: root_dir.to_path_buf(),
            env: EnvMap::new(),
            exposed_port: None,
            state: ModuleState::Unbound,
            notices: Vec::new(),
        }
    }

    /// Creates the data directories and reconciles the `.env` file of `kind` on `root_dir`.
    pub(crate) fn materialize(
        ctx: &HostContext,
        kind: ModuleKind,
        fqdn: &str,
        root_dir: &Path,
    ) -> Result<Self> {
        if kind.is_none() {
            return Ok(Self::none(fqdn, root_dir));
        }
        let spec = kind.spec();

        let created = fs::ensure_owned_dirs(root_dir, spec.required_dirs, ctx.config().data_owner)?;
        if !created.is_empty() {
            debug!("Created {} data directories for {} on {}", created.len(), kind, fqdn);
        }

        let env_file = EnvFile::in_dir(root_dir);
        let fresh_env = !env_file.exists();
        let persisted = env_file.read()?;
        let base = catalog::base_env(fqdn, root_dir, &ctx.config().proxy.network_name);
        let generated = ctx.with_values(|values| kind.missing_env(fqdn, &persisted, values))?;
        let env = env_file
            .reconcile(vec![
                EnvLayer::new(EnvLayerKind::Base, base),
                EnvLayer::new(EnvLayerKind::Module, generated),
            ])?
            .to_map();

        let exposed_port = match env.get("HTTP_PORT") {
            Some(raw) => {
                let port = raw.parse::<u16>().ok();
                if port.is_none() {
                    warn!("HTTP_PORT={} in {} is not a port", raw, env_file.path().display());
                }
                port
            }
            None => None,
        };

        let notices = hooks::setup(ctx, kind, root_dir, &env, fresh_env)?;
        info!("Materialized {} on {}", kind, fqdn);

        Ok(Self {
            kind,
            fqdn: fqdn.to_string(),
            root_dir: root_dir.to_path_buf(),
            env,
            exposed_port,
            state: ModuleState::Materialized,
            notices,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ModuleKind {
        self.kind
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.kind.is_none()
    }

    #[must_use]
    pub const fn env(&self) -> &EnvMap {
        &self.env
    }

    #[must_use]
    pub const fn exposed_port(&self) -> Option<u16> {
        self.exposed_port
    }

    #[must_use]
    pub const fn state(&self) -> ModuleState {
        self.state
    }

    /// Messages for the operator produced while materializing, drained on read.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    #[must_use]
    pub fn project(&self) -> ComposeProject {
        ComposeProject::new(self.root_dir.join(COMPOSE_FILE), names::escape(&self.fqdn))
    }

    /// Renders `<templates_dir>/<Type>.yml` with the module environment.
    fn write_compose_file(&self, ctx: &HostContext) -> Result<()> {
        let template_path = ctx
            .config()
            .templates_dir
            .join(format!("{}.yml", self.kind));
        let template = std::fs::read_to_string(&template_path)
            .with_context(|| format!("Failed to read template {}", template_path.display()))?;
        let target = self.root_dir.join(COMPOSE_FILE);
        std::fs::write(&target, template::render(&template, &self.env))
            .with_context(|| format!("Failed to write {}", target.display()))
    }

    pub fn up(&mut self, ctx: &HostContext) -> Result<()> {
        if self.is_none() {
            return Ok(());
        }
        let next = self.state.up()?;
        self.write_compose_file(ctx)?;
        ctx.runtime().up(&self.project())?;
        self.state = next;
        info!("{} on {} is up", self.kind, self.fqdn);
        Ok(())
    }

    pub fn down(&mut self, ctx: &HostContext) -> Result<()> {
        if self.is_none() {
            return Ok(());
        }
        let next = self.state.down()?;
        self.write_compose_file(ctx)?;
        ctx.runtime().down(&self.project())?;
        self.state = next;
        info!("{} on {} is down", self.kind, self.fqdn);
        Ok(())
    }

    /// Stops the containers and deletes every generated artifact and data directory.
    pub fn delete(&mut self, ctx: &HostContext) -> Result<()> {
        if self.is_none() || self.state == ModuleState::Removed {
            return Ok(());
        }
        self.down(ctx)?;
        ctx.runtime().remove(&self.project())?;

        EnvFile::in_dir(&self.root_dir).remove()?;
        hooks::cleanup(self.kind, &self.root_dir)?;
        for dir in self.kind.spec().required_dirs {
            fs::remove_dir_best_effort(&self.root_dir.join(dir));
        }
        fs::remove_file_if_exists(&self.root_dir.join(COMPOSE_FILE))?;

        self.state = self.state.delete();
        info!("{} removed from {}", self.kind, self.fqdn);
        Ok(())
    }

    /// Service names declared by the project.
    pub fn services(&self, ctx: &HostContext) -> Result<Vec<String>> {
        if self.is_none() {
            return Ok(Vec::new());
        }
        self.write_compose_file(ctx)?;
        ctx.runtime().services(&self.project())
    }

    /// Services currently running.
    pub fn running_services(&self, ctx: &HostContext) -> Result<Vec<String>> {
        if self.is_none() {
            return Ok(Vec::new());
        }
        self.write_compose_file(ctx)?;
        ctx.runtime().running_services(&self.project())
    }

    /// Lifecycle state as far as the runtime can tell.
    pub fn observed_state(&self, ctx: &HostContext) -> Result<ModuleState> {
        Ok(match self.state {
            ModuleState::Materialized | ModuleState::Stopped | ModuleState::Running => {
                if self.running_services(ctx)?.is_empty() {
                    if self.state == ModuleState::Running {
                        ModuleState::Stopped
                    } else {
                        self.state
                    }
                } else {
                    ModuleState::Running
                }
            }
            ModuleState::Unbound | ModuleState::Removed => self.state,
        })
    }

    fn checked_service(&self, ctx: &HostContext, service: &str) -> Result<Option<Vec<String>>> {
        let services = self.services(ctx)?;
        if services.iter().any(|s| s == service) {
            Ok(None)
        } else {
            Ok(Some(services))
        }
    }

    /// Follows the logs of `service` until the session ends.
    pub fn logs(&self, ctx: &HostContext, service: &str) -> Result<Session> {
        if let Some(valid) = self.checked_service(ctx, service)? {
            return Ok(Session::UnknownService(valid));
        }
        ctx.runtime().logs(&self.project(), service)?;
        Ok(Session::Finished)
    }

    /// Runs `command` interactively inside `service`.
    pub fn exec(&self, ctx: &HostContext, service: &str, command: &[String]) -> Result<Session> {
        if let Some(valid) = self.checked_service(ctx, service)? {
            return Ok(Session::UnknownService(valid));
        }
        ctx.runtime().exec(&self.project(), service, command)?;
        Ok(Session::Finished)
    }
}
