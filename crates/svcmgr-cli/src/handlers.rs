use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use dialoguer::Confirm;
use svcmgr_core::ModuleKind;
use svcmgr_manager::capabilities;
use svcmgr_manager::{ServiceManager, Session, Subdomain};

use crate::cli::{Commands, DomainArg, DomainCommands, ModuleCommands, SubdomainCommands, Target};
use crate::style;

/// The domain and subdomain that commands without `--domain`/`--subdomain` act on.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    pub domain: Option<String>,
    pub subdomain: Option<String>,
}

impl Selection {
    fn domain<'a>(&'a self, arg: &'a DomainArg) -> Result<&'a str> {
        arg.domain
            .as_deref()
            .or(self.domain.as_deref())
            .context("No domain selected (use --domain or `domain select <name>`)")
    }

    fn target<'a>(&'a self, target: &'a Target) -> Result<(&'a str, &'a str)> {
        let domain = target
            .domain
            .as_deref()
            .or(self.domain.as_deref())
            .context("No domain selected (use --domain or `domain select <name>`)")?;
        let subdomain = target
            .subdomain
            .as_deref()
            .or(self.subdomain.as_deref())
            .context("No subdomain selected (use --subdomain or `subdomain select <label>`)")?;
        Ok((domain, subdomain))
    }
}

/// Runs commands against one loaded [`ServiceManager`].
pub struct App {
    manager: ServiceManager,
    pub selection: Selection,
}

impl App {
    pub fn new(manager: ServiceManager) -> Self {
        Self {
            manager,
            selection: Selection::default(),
        }
    }

    /// Short prompt label for the shell, e.g. `example.com/blog`.
    pub fn prompt(&self) -> String {
        match (&self.selection.domain, &self.selection.subdomain) {
            (Some(d), Some(s)) => format!("{d}/{s}"),
            (Some(d), None) => d.clone(),
            _ => String::new(),
        }
    }

    pub fn run(&mut self, command: &Commands) -> Result<()> {
        match command {
            Commands::Domain { command } => self.domain(command),
            Commands::Subdomain { command } => self.subdomain(command),
            Commands::Module { command } => self.module(command),
            Commands::Shell => {
                println!("Already in the shell.");
                Ok(())
            }
        }
    }

    fn domain(&mut self, command: &DomainCommands) -> Result<()> {
        match command {
            DomainCommands::List => {
                for name in self.manager.domain_names() {
                    println!("{name}");
                }
            }
            DomainCommands::Select { name } => {
                self.manager.domain(name)?;
                if self.selection.domain.as_deref() != Some(name.as_str()) {
                    self.selection.subdomain = None;
                }
                self.selection.domain = Some(name.clone());
                println!("{} Selected {}", style::CHECK, name.as_str().bold());
            }
            DomainCommands::Delete { name, yes } => {
                if !confirm(&format!("Delete {name} and every module under it?"), *yes)? {
                    return Ok(());
                }
                if self.manager.delete_domain(name)? {
                    if self.selection.domain.as_deref() == Some(name.as_str()) {
                        self.selection = Selection::default();
                    }
                    println!("{} Deleted {}", style::CHECK, name);
                } else {
                    println!("{} Unknown domain {}", style::CROSS, name);
                }
            }
        }
        Ok(())
    }

    fn subdomain(&mut self, command: &SubdomainCommands) -> Result<()> {
        match command {
            SubdomainCommands::List { domain } => {
                let name = self.selection.domain(domain)?.to_string();
                let domain = self.manager.domain(&name)?;
                for sub in domain.subdomain_names() {
                    let kind = domain
                        .get(sub)
                        .map_or(ModuleKind::NoModule, |s| s.module().kind());
                    println!("{sub:<40} {kind}");
                }
            }
            SubdomainCommands::Select { label, domain } => {
                let name = self.selection.domain(domain)?.to_string();
                let fqdn = self.manager.domain(&name)?.subdomain(label)?.name().to_string();
                self.selection.domain = Some(name);
                self.selection.subdomain = Some(label.clone());
                println!("{} Selected {}", style::CHECK, fqdn.as_str().bold());
            }
            SubdomainCommands::Delete { label, domain, yes } => {
                let name = self.selection.domain(domain)?.to_string();
                if !confirm(&format!("Delete {label} under {name} and its module?"), *yes)? {
                    return Ok(());
                }
                if self.manager.domain(&name)?.delete_subdomain(label)? {
                    if self.selection.subdomain.as_deref() == Some(label.as_str()) {
                        self.selection.subdomain = None;
                    }
                    println!("{} Deleted {}", style::CHECK, label);
                } else {
                    println!("{} Unknown subdomain {}", style::CROSS, label);
                }
            }
        }
        Ok(())
    }

    fn subdomain_mut(&mut self, target: &Target) -> Result<&mut Subdomain> {
        let (domain, label) = self.selection.target(target)?;
        let (domain, label) = (domain.to_string(), label.to_string());
        self.manager.domain(&domain)?.subdomain(&label)
    }

    fn module(&mut self, command: &ModuleCommands) -> Result<()> {
        match command {
            ModuleCommands::List => {
                for kind in ModuleKind::CATALOG {
                    println!("{:<16} {}", kind.name(), kind.spec().description);
                }
            }
            ModuleCommands::Add {
                module_type,
                target,
            } => {
                // Checked before binding: `bind` tears down the current module first.
                if ModuleKind::parse_or_none(module_type).is_none() {
                    println!("{} Unknown module type {}", style::CROSS, module_type);
                    println!("Run `module list` for the available types.");
                    return Ok(());
                }
                let sub = self.subdomain_mut(target)?;
                let fqdn = sub.name().to_string();
                let module = sub.bind(module_type)?;
                for notice in module.take_notices() {
                    println!("{} {}", style::WARN, notice);
                }
                println!(
                    "{} Bound {} to {}",
                    style::MODULE,
                    module.kind().name().bold(),
                    fqdn
                );
            }
            ModuleCommands::Get { target } => {
                let sub = self.subdomain_mut(target)?;
                println!("{}", sub.module().kind());
            }
            ModuleCommands::Up { target } => {
                let sub = self.subdomain_mut(target)?;
                require_module(sub)?;
                sub.up()?;
                println!("{} {} is up", style::CHECK, sub.name());
            }
            ModuleCommands::Down { target } => {
                let sub = self.subdomain_mut(target)?;
                require_module(sub)?;
                sub.down()?;
                println!("{} {} is down", style::CHECK, sub.name());
            }
            ModuleCommands::Status { target } => {
                let sub = self.subdomain_mut(target)?;
                let status = sub.status()?;
                println!("{} on {}: {}", status.kind, sub.name(), status.state);
                if !status.running.is_empty() {
                    println!("  running: {}", status.running.join(", "));
                }
                if let Some(port) = status.exposed_port {
                    println!("  port:    {port}");
                }
                if let Some(route) = status.route {
                    println!("  route:   {route}");
                }
            }
            ModuleCommands::Log { service, target } => {
                let sub = self.subdomain_mut(target)?;
                let session = sub.module().logs(sub.context(), service)?;
                report_session(&session);
            }
            ModuleCommands::Command {
                service,
                command,
                target,
            } => {
                let sub = self.subdomain_mut(target)?;
                let command = if command.is_empty() {
                    vec!["sh".to_string()]
                } else {
                    command.clone()
                };
                let session = sub.module().exec(sub.context(), service, &command)?;
                report_session(&session);
            }
            ModuleCommands::Delete { target, yes } => {
                let sub = self.subdomain_mut(target)?;
                if sub.module().is_none() {
                    println!("No module bound to {}", sub.name());
                    return Ok(());
                }
                let prompt = format!(
                    "Delete {} on {} including its data?",
                    sub.module().kind(),
                    sub.name()
                );
                if !confirm(&prompt, *yes)? {
                    return Ok(());
                }
                sub.unbind()?;
                println!("{} Removed the module from {}", style::CHECK, sub.name());
            }
            ModuleCommands::ImportDb { dump, target } => {
                let sub = self.subdomain_mut(target)?;
                capabilities::import_db(sub.context(), sub.module(), dump)?;
                println!("{} Imported {}", style::CHECK, dump.display());
            }
            ModuleCommands::Mysql { target } => {
                let sub = self.subdomain_mut(target)?;
                capabilities::mysql_prompt(sub.context(), sub.module())?;
            }
            ModuleCommands::CopyWeb {
                source,
                web_dir,
                target,
            } => {
                let sub = self.subdomain_mut(target)?;
                let copied = capabilities::copy_web(sub.module(), source, web_dir)?;
                println!("{} Copied {} files", style::CHECK, copied);
            }
        }
        Ok(())
    }
}

fn require_module(sub: &Subdomain) -> Result<()> {
    if sub.module().is_none() {
        bail!("No module bound to {} (use `module add <type>`)", sub.name());
    }
    Ok(())
}

fn report_session(session: &Session) {
    if let Session::UnknownService(valid) = session {
        println!("{} Invalid container name", style::CROSS);
        if !valid.is_empty() {
            println!("Services: {}", valid.join(", "));
        }
    }
}

/// Asks before destructive operations when a terminal is attached.
fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes || !std::io::stdin().is_tty() {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
