//! Per-type setup beyond directories and env keys.

use crate::context::HostContext;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use svcmgr_core::EnvMap;
use svcmgr_core::module::{DEFAULT_PASSWORD_LENGTH, ModuleKind, SetupHook};
use svcmgr_utils::{fs, process};
use tracing::{info, warn};

const REGISTRY_BUILDER_REPO: &str = "https://github.com/JonFStr/ContainerBuilder";

const ODOO_CONFIG: &str = "\
[options]
addons_path = /mnt/extra-addons
data_dir = /var/lib/odoo

";

/// Runs the setup hook of `kind` and returns messages meant for the operator.
///
/// Every step checks for its own artifact first, so running it again on load is harmless.
/// `fresh_env` is true when the `.env` file was created by this materialization.
pub(crate) fn setup(
    ctx: &HostContext,
    kind: ModuleKind,
    root_dir: &Path,
    env: &EnvMap,
    fresh_env: bool,
) -> Result<Vec<String>> {
    match kind.spec().setup {
        SetupHook::None => Ok(Vec::new()),
        SetupHook::OdooConfig => {
            seed(&root_dir.join("odoo/etc/odoo.conf"), ODOO_CONFIG)?;
            Ok(Vec::new())
        }
        SetupHook::ParseDmarcConfig => {
            seed(&root_dir.join("config.json"), &parse_dmarc_config()?)?;
            Ok(Vec::new())
        }
        SetupHook::RegistryBuilder => registry_builder(ctx, root_dir, env),
        SetupHook::OAuthNotice if fresh_env => Ok(vec![format!(
            "Please update the OAUTH2_PROXY_* values in {} with your OAuth2 provider configuration",
            root_dir.join(svcmgr_core::EnvFile::FILE_NAME).display()
        )]),
        SetupHook::OAuthNotice => Ok(Vec::new()),
    }
}

/// Removes the files `kind` creates outside its data directories.
pub(crate) fn cleanup(kind: ModuleKind, root_dir: &Path) -> Result<()> {
    for file in kind.spec().generated_files {
        fs::remove_file_if_exists(&root_dir.join(file))?;
    }
    Ok(())
}

fn seed(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Seeded {}", path.display());
    Ok(())
}

fn parse_dmarc_config() -> Result<String> {
    let config = serde_json::json!({
        "imap": {
            "host": "",
            "port": 993,
            "username": "",
            "password": "",
            "use_tls": true
        },
        "database": {
            "path": "/data/db.sqlite"
        },
        "server": {
            "port": 8080,
            "host": "0.0.0.0"
        }
    });
    let mut out = serde_json::to_string_pretty(&config)?;
    out.push('\n');
    Ok(out)
}

fn registry_builder(ctx: &HostContext, root_dir: &Path, env: &EnvMap) -> Result<Vec<String>> {
    let mut notices = Vec::new();
    let builder = root_dir.join("builder");

    let builder_is_empty = std::fs::read_dir(&builder)
        .with_context(|| format!("Failed to read {}", builder.display()))?
        .next()
        .is_none();
    if builder_is_empty {
        let status = process::run_logged(
            Command::new("git")
                .args(["clone", REGISTRY_BUILDER_REPO, "builder"])
                .current_dir(root_dir),
        )?;
        if !status.success() {
            warn!("The registry builder could not be cloned into {}", builder.display());
        }
    }

    let crontab = builder.join("crontab");
    let crontab_dist = builder.join("crontab.dist");
    if !crontab.exists() && crontab_dist.is_file() {
        std::fs::copy(&crontab_dist, &crontab)
            .with_context(|| format!("Failed to copy {}", crontab_dist.display()))?;
    }

    let htpasswd = root_dir.join("htpasswd");
    if htpasswd.exists() {
        return Ok(notices);
    }
    std::fs::write(&htpasswd, "")
        .with_context(|| format!("Failed to create {}", htpasswd.display()))?;

    let user = env.get("REGISTRY_BUILDER_USER").map_or("builder", String::as_str);
    let pass = env
        .get("REGISTRY_BUILDER_PASS")
        .context("REGISTRY_BUILDER_PASS is missing from the module environment")?;
    let registry_pass = ctx.with_values(|values| values.password(DEFAULT_PASSWORD_LENGTH));

    for (name, password) in [(user, pass.as_str()), ("registry", registry_pass.as_str())] {
        let mut cmd = Command::new("htpasswd");
        cmd.arg("-Bb").arg(&htpasswd).args([name, password]);
        process::run_logged(&mut cmd)?;
    }

    notices.push(format!(
        "The following users were saved to {}:",
        htpasswd.display()
    ));
    notices.push(format!("Username: {user} --- Password: {pass}"));
    notices.push(format!("Username: registry --- Password: {registry_pass}"));
    notices.push(format!(
        "Use `htpasswd -Bb {} <user> <password>` to add or update credentials.",
        htpasswd.display()
    ));
    Ok(notices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dmarc_config_is_valid_json() {
        let text = parse_dmarc_config().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["imap"]["port"], 993);
        assert_eq!(value["database"]["path"], "/data/db.sqlite");
    }

    #[test]
    fn seeding_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("odoo.conf");
        std::fs::write(&path, "[options]\ncustom = 1\n").unwrap();
        seed(&path, ODOO_CONFIG).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[options]\ncustom = 1\n");
    }

    #[test]
    fn cleanup_removes_generated_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.json"), "{}").unwrap();
        cleanup(ModuleKind::ParseDmarc, tmp.path()).unwrap();
        assert!(!tmp.path().join("config.json").exists());
        cleanup(ModuleKind::ParseDmarc, tmp.path()).unwrap();
    }
}
