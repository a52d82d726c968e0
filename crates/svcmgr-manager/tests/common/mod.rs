#![allow(dead_code)]

use anyhow::Result;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use svcmgr_core::ValueSource;
use svcmgr_core::config::{GlobalConfig, ProxyKind};
use svcmgr_manager::{HostContext, ServiceManager};
use svcmgr_utils::compose::{ComposeProject, ContainerRuntime};
use tempfile::TempDir;

pub const HAPROXY_CFG: &str = "\
global
\tlog /dev/log local0

defaults
\tmode http

frontend http
\tbind *:80
\t# SERVICES
\t# END OF SERVICES
\tdefault_backend fallback

# SERVICES
# END OF SERVICES

backend fallback
\tserver local 127.0.0.1:8080
";

const COMPOSE_TEMPLATE: &str = "\
name: ${PROJECT_NAME}
services:
  wordpress:
    image: wordpress
    ports:
      - \"127.0.0.1:${HTTP_PORT}:80\"
  mysql:
    image: mysql
    environment:
      MYSQL_ROOT_PASSWORD: ${MYSQL_ROOT_PASSWORD}
";

/// What the fake runtime remembers between calls.
#[derive(Debug, Default)]
pub struct RuntimeState {
    pub calls: Vec<String>,
    pub services: Vec<String>,
    pub running: BTreeSet<String>,
    pub stdin_files: Vec<PathBuf>,
}

/// A [`ContainerRuntime`] that records every call instead of talking to an engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingRuntime {
    pub state: Rc<RefCell<RuntimeState>>,
}

impl RecordingRuntime {
    fn record(&self, verb: &str, project: &ComposeProject) {
        self.state
            .borrow_mut()
            .calls
            .push(format!("{verb} {}", project.name));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }
}

impl ContainerRuntime for RecordingRuntime {
    fn up(&self, project: &ComposeProject) -> Result<()> {
        self.record("up", project);
        let mut state = self.state.borrow_mut();
        let services = state.services.clone();
        state.running.extend(services);
        Ok(())
    }

    fn down(&self, project: &ComposeProject) -> Result<()> {
        self.record("down", project);
        self.state.borrow_mut().running.clear();
        Ok(())
    }

    fn remove(&self, project: &ComposeProject) -> Result<()> {
        self.record("rm", project);
        Ok(())
    }

    fn services(&self, project: &ComposeProject) -> Result<Vec<String>> {
        self.record("ps", project);
        Ok(self.state.borrow().services.clone())
    }

    fn running_services(&self, project: &ComposeProject) -> Result<Vec<String>> {
        self.record("ps-running", project);
        Ok(self.state.borrow().running.iter().cloned().collect())
    }

    fn exec(&self, project: &ComposeProject, service: &str, command: &[String]) -> Result<()> {
        self.record(&format!("exec {service} {}", command.join(" ")), project);
        Ok(())
    }

    fn exec_with_input(
        &self,
        project: &ComposeProject,
        service: &str,
        command: &[String],
        input: &Path,
    ) -> Result<()> {
        self.record(&format!("exec-T {service} {}", command.join(" ")), project);
        self.state.borrow_mut().stdin_files.push(input.to_path_buf());
        Ok(())
    }

    fn logs(&self, project: &ComposeProject, service: &str) -> Result<()> {
        self.record(&format!("logs {service}"), project);
        Ok(())
    }
}

/// Deterministic values: fixed passwords, ports counting up from 20000.
#[derive(Debug)]
pub struct FixedValues {
    next_port: u16,
}

impl Default for FixedValues {
    fn default() -> Self {
        Self { next_port: 20000 }
    }
}

impl ValueSource for FixedValues {
    fn password(&mut self, len: usize) -> String {
        "p".repeat(len.min(16))
    }

    fn free_port(&mut self) -> Result<u16> {
        let port = self.next_port;
        self.next_port += 1;
        Ok(port)
    }

    fn url_safe_secret(&mut self, _bytes: usize) -> String {
        "c2VjcmV0".to_string()
    }
}

/// A services root, a template directory and a haproxy file inside one temp dir.
pub struct Fixture {
    pub tmp: TempDir,
    pub config: GlobalConfig,
    pub runtime: RecordingRuntime,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_proxy(ProxyKind::Haproxy)
    }

    pub fn with_proxy(kind: ProxyKind) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let templates = tmp.path().join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("WordPress.yml"), COMPOSE_TEMPLATE).unwrap();
        fs::write(templates.join("Webserver.yml"), COMPOSE_TEMPLATE).unwrap();

        let haproxy = tmp.path().join("haproxy.cfg");
        fs::write(&haproxy, HAPROXY_CFG).unwrap();

        let mut config = GlobalConfig::default();
        config.root_dir = tmp.path().join("services");
        config.templates_dir = templates;
        config.proxy.kind = kind;
        config.proxy.config_path = haproxy;
        config.proxy.reload_command = vec!["true".to_string()];
        config.certificates.cert_root = tmp.path().join("certs");
        config.data_owner.chown = false;

        let runtime = RecordingRuntime::default();
        runtime.state.borrow_mut().services = vec!["mysql".to_string(), "wordpress".to_string()];

        Self {
            tmp,
            config,
            runtime,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.config.root_dir.clone()
    }

    pub fn haproxy(&self) -> String {
        fs::read_to_string(&self.config.proxy.config_path).unwrap()
    }

    /// A fresh manager over the fixture, as if the process had just started.
    pub fn manager(&self) -> ServiceManager {
        let ctx = HostContext::new(
            self.config.clone(),
            Box::new(self.runtime.clone()),
            Box::new(FixedValues::default()),
        );
        ServiceManager::load(ctx).unwrap()
    }
}
