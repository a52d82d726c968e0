//! Keeping the shared haproxy configuration in step with the running modules.
//!
//! The file is read, rewritten by [`svcmgr_core::haproxy::rewrite`] and written back in
//! place, then the proxy is reloaded. Nothing is locked: a concurrent writer (another
//! svcmgr, an editor) can lose its change. A failed reload is reported and the rewritten
//! file stays.

use crate::context::HostContext;
use anyhow::{Context, Result};
use std::path::Path;
use svcmgr_core::config::ProxyKind;
use svcmgr_core::haproxy::{self, Route, RouteChange};
use svcmgr_utils::process;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another proxy product is in use, or there is nothing to route.
    Skipped,
    /// The file already matched.
    Unchanged,
    /// The file was rewritten and a reload was requested.
    Rewritten,
}

/// Adds or removes the rules for one subdomain.
///
/// A missing configuration file is an error when adding and nothing to do when removing.
pub fn sync(ctx: &HostContext, route: &Route<'_>, change: &RouteChange) -> Result<SyncOutcome> {
    let proxy = &ctx.config().proxy;
    if proxy.kind != ProxyKind::Haproxy {
        debug!("Proxy is {}, not touching {}", proxy.kind, proxy.config_path.display());
        return Ok(SyncOutcome::Skipped);
    }

    let original = match std::fs::read_to_string(&proxy.config_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && *change == RouteChange::Remove => {
            debug!("{} does not exist, nothing to remove", proxy.config_path.display());
            return Ok(SyncOutcome::Skipped);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read {}", proxy.config_path.display()));
        }
    };

    let rewritten = haproxy::rewrite(&original, route, change);
    if rewritten == original {
        debug!("{} already up to date for {}", proxy.config_path.display(), route.host);
        return Ok(SyncOutcome::Unchanged);
    }

    std::fs::write(&proxy.config_path, rewritten)
        .with_context(|| format!("Failed to write {}", proxy.config_path.display()))?;
    match change {
        RouteChange::Add { port, .. } => {
            info!("Routed {} to 127.0.0.1:{}", route.host, port);
        }
        RouteChange::Remove => info!("Removed route for {}", route.host),
    }

    reload(&proxy.reload_command)?;
    Ok(SyncOutcome::Rewritten)
}

fn reload(command: &[String]) -> Result<()> {
    let mut cmd = process::command_from(command)?;
    let status = process::run_logged(&mut cmd)?;
    if !status.success() {
        warn!("The proxy did not reload; the new configuration takes effect on its next reload");
    }
    Ok(())
}

/// The `server` target currently configured for `id`, if the file has one.
pub fn current_target(ctx: &HostContext, id: &str) -> Option<String> {
    let proxy = &ctx.config().proxy;
    if proxy.kind != ProxyKind::Haproxy {
        return None;
    }
    read_target(&proxy.config_path, id)
}

fn read_target(path: &Path, id: &str) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    haproxy::backend_target(&text, id).map(String::from)
}
