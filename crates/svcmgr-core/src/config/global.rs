use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which reverse proxy fronts the managed services.
///
/// Only [`ProxyKind::Haproxy`] has its configuration file patched. The other kinds route
/// through container labels or an externally managed proxy, so synchronization is skipped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Other,
    #[default]
    Haproxy,
    Traefik,
}

impl std::fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other => write!(f, "other"),
            Self::Haproxy => write!(f, "haproxy"),
            Self::Traefik => write!(f, "traefik"),
        }
    }
}

/// Host-wide configuration.
///
/// # Example
/// ```toml
/// root_dir = "/srv/services"
///
/// [proxy]
/// kind = "haproxy"
/// config_path = "/etc/haproxy/haproxy.cfg"
///
/// [certificates]
/// enabled = true
/// email = "ops@example.com"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Directory holding one sub-directory per managed domain.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Directory holding the `<ModuleType>.yml` compose templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub certificates: CertificateConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    #[serde(default)]
    pub data_owner: DataOwnerConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            templates_dir: default_templates_dir(),
            proxy: ProxyConfig::default(),
            certificates: CertificateConfig::default(),
            compose: ComposeConfig::default(),
            data_owner: DataOwnerConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Check the values that cannot be expressed through the schema alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compose.command.is_empty() {
            return Err(ConfigError::EmptyCommand("compose.command"));
        }
        if self.proxy.kind == ProxyKind::Haproxy && self.proxy.reload_command.is_empty() {
            return Err(ConfigError::EmptyCommand("proxy.reload_command"));
        }
        if self.certificates.enabled && self.certificates.acme_command.is_empty() {
            return Err(ConfigError::EmptyCommand("certificates.acme_command"));
        }
        if self.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("root_dir"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` must contain at least the program name")]
    EmptyCommand(&'static str),
    #[error("`{0}` must not be empty")]
    EmptyPath(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    #[serde(default)]
    pub kind: ProxyKind,
    /// The shared, hand-maintained haproxy configuration.
    #[serde(default = "default_haproxy_config")]
    pub config_path: PathBuf,
    /// Command that makes the live proxy pick up a rewritten configuration.
    #[serde(default = "default_reload_command")]
    pub reload_command: Vec<String>,
    /// Docker network the module containers join to be reachable by the proxy.
    #[serde(default = "default_network_name")]
    pub network_name: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            kind: ProxyKind::default(),
            config_path: default_haproxy_config(),
            reload_command: default_reload_command(),
            network_name: default_network_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateConfig {
    /// Whether certificates are requested at all. Disabled by default because it needs
    /// public DNS and a reachable challenge port.
    #[serde(default)]
    pub enabled: bool,
    /// Combined PEM files land in `<cert_root>/<domain>/<fqdn>.pem`.
    #[serde(default = "default_cert_root")]
    pub cert_root: PathBuf,
    /// Where the ACME client leaves `<fqdn>/fullchain.pem` and `<fqdn>/privkey.pem`.
    #[serde(default = "default_live_dir")]
    pub live_dir: PathBuf,
    #[serde(default = "default_acme_command")]
    pub acme_command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_challenge_port")]
    pub challenge_port: u16,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_root: default_cert_root(),
            live_dir: default_live_dir(),
            acme_command: default_acme_command(),
            email: None,
            challenge_port: default_challenge_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeConfig {
    /// Program and leading arguments, e.g. `["docker", "compose"]`.
    #[serde(default = "default_compose_command")]
    pub command: Vec<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            command: default_compose_command(),
        }
    }
}

/// Ownership given to freshly created module data directories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataOwnerConfig {
    #[serde(default = "default_true")]
    pub chown: bool,
    #[serde(default = "default_id")]
    pub uid: u32,
    #[serde(default = "default_id")]
    pub gid: u32,
}

impl Default for DataOwnerConfig {
    fn default() -> Self {
        Self {
            chown: true,
            uid: default_id(),
            gid: default_id(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("/srv/services")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("/usr/share/svcmgr/module-templates")
}

fn default_haproxy_config() -> PathBuf {
    PathBuf::from("/etc/haproxy/haproxy.cfg")
}

fn default_reload_command() -> Vec<String> {
    vec!["systemctl".into(), "reload".into(), "haproxy".into()]
}

fn default_network_name() -> String {
    "proxy".to_string()
}

fn default_cert_root() -> PathBuf {
    PathBuf::from("/etc/ssl")
}

fn default_live_dir() -> PathBuf {
    PathBuf::from("/etc/letsencrypt/live")
}

fn default_acme_command() -> Vec<String> {
    vec!["certbot".into()]
}

const fn default_challenge_port() -> u16 {
    8888
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".into(), "compose".into()]
}

const fn default_true() -> bool {
    true
}

const fn default_id() -> u32 {
    1000
}
