use crate::process;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use svcmgr_core::config::CertificateConfig;
use tracing::{info, warn};

/// Outcome of [`CertificateProvisioner::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    /// Certificate handling is switched off.
    Disabled,
    /// A combined certificate already exists; nothing was requested.
    Present,
    /// A certificate was issued and combined.
    Issued,
    /// The ACME client failed; no combined file was written.
    Failed,
}

/// Requests certificates from an ACME client and combines them for the proxy.
///
/// Forced renewal is not implemented: an existing combined file is always kept.
#[derive(Debug, Clone)]
pub struct CertificateProvisioner {
    config: CertificateConfig,
}

impl CertificateProvisioner {
    #[must_use]
    pub const fn new(config: CertificateConfig) -> Self {
        Self { config }
    }

    /// `<cert_root>/<domain>/<fqdn>.pem`
    #[must_use]
    pub fn path_for(&self, domain: &str, fqdn: &str) -> PathBuf {
        self.config
            .cert_root
            .join(domain)
            .join(format!("{fqdn}.pem"))
    }

    /// Makes sure a combined certificate for `fqdn` exists.
    ///
    /// An ACME client that cannot be run, exits non-zero, or leaves no readable files
    /// behind is logged and reported as [`CertificateStatus::Failed`].
    ///
    /// # Errors
    ///
    /// Returns an error only if `acme_command` is empty.
    pub fn ensure(&self, domain: &str, fqdn: &str) -> Result<CertificateStatus> {
        if !self.config.enabled {
            return Ok(CertificateStatus::Disabled);
        }

        let target = self.path_for(domain, fqdn);
        if target.is_file() {
            return Ok(CertificateStatus::Present);
        }

        info!("Requesting certificate for {}", fqdn);
        let mut cmd = self.acme_command(fqdn)?;
        let issued = process::run_logged(&mut cmd)
            .and_then(|status| {
                if status.success() {
                    self.combine(fqdn, &target).map(|()| true)
                } else {
                    Ok(false)
                }
            })
            .unwrap_or_else(|e| {
                warn!("{:#}", e);
                false
            });

        if !issued {
            warn!("No certificate for {}; TLS will not be served for it", fqdn);
            return Ok(CertificateStatus::Failed);
        }
        info!("Certificate for {} written to {}", fqdn, target.display());
        Ok(CertificateStatus::Issued)
    }

    fn acme_command(&self, fqdn: &str) -> Result<Command> {
        let mut cmd = process::command_from(&self.config.acme_command)?;
        cmd.args(["certonly", "--standalone", "-d", fqdn])
            .args(["--non-interactive", "--agree-tos"]);
        match &self.config.email {
            Some(email) => cmd.args(["--email", email.as_str()]),
            None => cmd.arg("--register-unsafely-without-email"),
        };
        cmd.arg(format!("--http-01-port={}", self.config.challenge_port));
        Ok(cmd)
    }

    /// Concatenates `fullchain.pem` and `privkey.pem` into `target`.
    fn combine(&self, fqdn: &str, target: &Path) -> Result<()> {
        let live = self.config.live_dir.join(fqdn);
        let fullchain = live.join("fullchain.pem");
        let privkey = live.join("privkey.pem");

        let chain = std::fs::read(&fullchain)
            .with_context(|| format!("Failed to read {}", fullchain.display()))?;
        let key = std::fs::read(&privkey)
            .with_context(|| format!("Failed to read {}", privkey.display()))?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut out = std::fs::File::create(target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        out.write_all(&chain)
            .and_then(|()| out.write_all(&key))
            .with_context(|| format!("Failed to write {}", target.display()))
    }
}
