pub mod global;
pub use global::{
    CertificateConfig, ComposeConfig, ConfigError, DataOwnerConfig, GlobalConfig, ProxyConfig,
    ProxyKind,
};

// File lookup and environment overrides live in `svcmgr-manager::config_loader`; this
// module only describes the schema.

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.root_dir, PathBuf::from("/srv/services"));
        assert_eq!(config.proxy.kind, ProxyKind::Haproxy);
        assert!(!config.certificates.enabled);
        assert_eq!(config.compose.command, vec!["docker", "compose"]);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config: GlobalConfig = toml::from_str(
            r#"
root_dir = "/tmp/services"

[proxy]
kind = "traefik"

[certificates]
enabled = true
email = "ops@example.com"

[data_owner]
chown = false
"#,
        )
        .unwrap();

        assert_eq!(config.root_dir, PathBuf::from("/tmp/services"));
        assert_eq!(config.proxy.kind, ProxyKind::Traefik);
        assert_eq!(
            config.proxy.config_path,
            PathBuf::from("/etc/haproxy/haproxy.cfg")
        );
        assert_eq!(config.certificates.email.as_deref(), Some("ops@example.com"));
        assert_eq!(config.certificates.challenge_port, 8888);
        assert!(!config.data_owner.chown);
        assert_eq!(config.data_owner.uid, 1000);
    }

    #[test]
    fn validate_rejects_empty_commands() {
        let mut config = GlobalConfig::default();
        assert_eq!(config.validate(), Ok(()));

        config.compose.command.clear();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyCommand("compose.command"))
        );

        let mut config = GlobalConfig::default();
        config.proxy.reload_command.clear();
        assert!(config.validate().is_err());

        // A non-haproxy host never reloads, so an empty reload command is fine.
        config.proxy.kind = ProxyKind::Traefik;
        assert_eq!(config.validate(), Ok(()));
    }
}
