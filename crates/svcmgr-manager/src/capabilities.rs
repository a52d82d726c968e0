//! Optional helpers a module type can opt into.

use crate::context::HostContext;
use crate::module::Module;
use anyhow::{Context, Result, bail};
use std::path::Path;
use svcmgr_core::Capability;
use svcmgr_core::state::LifecycleError;
use svcmgr_utils::fs;
use tracing::info;

/// Service the MySQL helpers talk to.
pub const MYSQL_SERVICE: &str = "mysql";
/// Web root used by `copy-web` unless another is given.
pub const DEFAULT_WEB_DIR: &str = "httpdocs";

fn require(module: &Module, capability: Capability, label: &'static str) -> Result<()> {
    if module.is_none() {
        bail!(LifecycleError::NotBound(module.project().name));
    }
    if !module.kind().has_capability(capability) {
        bail!(LifecycleError::MissingCapability {
            module: module.kind().to_string(),
            capability: label,
        });
    }
    Ok(())
}

fn mysql_root_command(module: &Module) -> Result<Vec<String>> {
    let password = module
        .env()
        .get("MYSQL_ROOT_PASSWORD")
        .context("MYSQL_ROOT_PASSWORD is missing from the module environment")?;
    Ok(vec![
        "mysql".to_string(),
        "-uroot".to_string(),
        format!("-p{password}"),
    ])
}

/// Feeds the SQL dump at `dump` to the module's MySQL server.
pub fn import_db(ctx: &HostContext, module: &Module, dump: &Path) -> Result<()> {
    require(module, Capability::MysqlClient, "MySQL")?;
    if !dump.is_file() {
        bail!("{} is not a file", dump.display());
    }
    let command = mysql_root_command(module)?;
    ctx.runtime()
        .exec_with_input(&module.project(), MYSQL_SERVICE, &command, dump)?;
    info!("Imported {} into {}", dump.display(), module.project().name);
    Ok(())
}

/// Opens an interactive MySQL prompt as root.
pub fn mysql_prompt(ctx: &HostContext, module: &Module) -> Result<()> {
    require(module, Capability::MysqlClient, "MySQL")?;
    let command = mysql_root_command(module)?;
    ctx.runtime().exec(&module.project(), MYSQL_SERVICE, &command)
}

/// Copies the directory `source` into `<DOMAIN_PATH>/<web_dir>`. Returns the number of
/// files copied.
pub fn copy_web(module: &Module, source: &Path, web_dir: &str) -> Result<usize> {
    require(module, Capability::WebContent, "web content")?;
    if !source.is_dir() {
        bail!("{} is not a directory", source.display());
    }
    let domain_path = module
        .env()
        .get("DOMAIN_PATH")
        .context("DOMAIN_PATH is missing from the module environment")?;
    let target = fs::safe_join(Path::new(domain_path), web_dir)?;
    let copied = fs::copy_tree(source, &target)?;
    info!("Copied {} files into {}", copied, target.display());
    Ok(copied)
}
