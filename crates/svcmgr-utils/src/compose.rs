//! The container runtime seen by a module.
//!
//! Every call is `<prefix> -f <compose file> -p <project> <verb...>`, blocking until the
//! process exits. Exit codes are logged by [`crate::process`] and otherwise not inspected.

use crate::process;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One compose project: the generated file plus the project name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    pub file: PathBuf,
    pub name: String,
}

impl ComposeProject {
    #[must_use]
    pub fn new(file: PathBuf, name: impl Into<String>) -> Self {
        Self {
            file,
            name: name.into(),
        }
    }
}

/// Operations the lifecycle needs from a container engine.
pub trait ContainerRuntime {
    /// `up -d`
    fn up(&self, project: &ComposeProject) -> Result<()>;
    /// `down`
    fn down(&self, project: &ComposeProject) -> Result<()>;
    /// `rm -v`, dropping stopped containers and their anonymous volumes.
    fn remove(&self, project: &ComposeProject) -> Result<()>;
    /// `ps --services`
    fn services(&self, project: &ComposeProject) -> Result<Vec<String>>;
    /// `ps --services --status running`
    fn running_services(&self, project: &ComposeProject) -> Result<Vec<String>>;
    /// `exec -it <service> <command...>`, attached to the terminal.
    fn exec(&self, project: &ComposeProject, service: &str, command: &[String]) -> Result<()>;
    /// `exec -T <service> <command...>` with `input` on stdin.
    fn exec_with_input(
        &self,
        project: &ComposeProject,
        service: &str,
        command: &[String],
        input: &Path,
    ) -> Result<()>;
    /// `logs -f <service>`, attached to the terminal until interrupted.
    fn logs(&self, project: &ComposeProject, service: &str) -> Result<()>;
}

/// [`ContainerRuntime`] backed by a compose command line such as `docker compose`.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    prefix: Vec<String>,
}

impl ComposeCli {
    #[must_use]
    pub const fn new(prefix: Vec<String>) -> Self {
        Self { prefix }
    }

    fn command(&self, project: &ComposeProject) -> Result<Command> {
        let mut cmd = process::command_from(&self.prefix)?;
        cmd.arg("-f").arg(&project.file).arg("-p").arg(&project.name);
        Ok(cmd)
    }

    fn list(&self, project: &ComposeProject, extra: &[&str]) -> Result<Vec<String>> {
        let mut cmd = self.command(project)?;
        cmd.args(["ps", "--services"]).args(extra);
        let (_, stdout) = process::capture(&mut cmd)?;
        Ok(parse_services(&stdout))
    }
}

impl ContainerRuntime for ComposeCli {
    fn up(&self, project: &ComposeProject) -> Result<()> {
        process::run_logged(self.command(project)?.args(["up", "-d"]))?;
        Ok(())
    }

    fn down(&self, project: &ComposeProject) -> Result<()> {
        process::run_logged(self.command(project)?.arg("down"))?;
        Ok(())
    }

    fn remove(&self, project: &ComposeProject) -> Result<()> {
        process::run_logged(self.command(project)?.args(["rm", "-v", "-f"]))?;
        Ok(())
    }

    fn services(&self, project: &ComposeProject) -> Result<Vec<String>> {
        self.list(project, &[])
    }

    fn running_services(&self, project: &ComposeProject) -> Result<Vec<String>> {
        self.list(project, &["--status", "running"])
    }

    fn exec(&self, project: &ComposeProject, service: &str, command: &[String]) -> Result<()> {
        let mut cmd = self.command(project)?;
        cmd.args(["exec", "-it", service]).args(command);
        process::attach(&mut cmd)?;
        Ok(())
    }

    fn exec_with_input(
        &self,
        project: &ComposeProject,
        service: &str,
        command: &[String],
        input: &Path,
    ) -> Result<()> {
        let file =
            File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
        let mut cmd = self.command(project)?;
        cmd.args(["exec", "-T", service]).args(command);
        process::run_with_input(&mut cmd, file)?;
        Ok(())
    }

    fn logs(&self, project: &ComposeProject, service: &str) -> Result<()> {
        let mut cmd = self.command(project)?;
        cmd.args(["logs", "-f", service]);
        process::attach(&mut cmd)?;
        Ok(())
    }
}

/// One service name per non-empty line.
#[must_use]
pub fn parse_services(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
