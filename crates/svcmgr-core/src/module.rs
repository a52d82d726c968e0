//! The module catalog.
//!
//! Every bundled application is one [`ModuleKind`] variant with a static [`ModuleSpec`]:
//! the data directories it needs, the environment keys it generates, the optional
//! capabilities it offers and any extra setup it performs. [`ModuleKind::NoModule`] is the
//! explicit "nothing bound" state.

use crate::env::EnvMap;
use crate::names;
use anyhow::Result;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Length of generated passwords unless a module asks for less.
pub const DEFAULT_PASSWORD_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleKind {
    NoModule,
    Codeigniter,
    Collabora,
    FreeScout,
    Leantime,
    LinkStack,
    Mumble,
    Nextcloud,
    OAuthWebserver,
    Odoo,
    ParseDmarc,
    Registry,
    UptimeKuma,
    Webserver,
    WordPress,
    Yopass,
    Zammad,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown module type {0:?}")]
pub struct UnknownModule(pub String);

impl ModuleKind {
    /// Every bindable module type, in display order.
    pub const CATALOG: &'static [Self] = &[
        Self::Codeigniter,
        Self::Collabora,
        Self::FreeScout,
        Self::Leantime,
        Self::LinkStack,
        Self::Mumble,
        Self::Nextcloud,
        Self::OAuthWebserver,
        Self::Odoo,
        Self::ParseDmarc,
        Self::Registry,
        Self::UptimeKuma,
        Self::Webserver,
        Self::WordPress,
        Self::Yopass,
        Self::Zammad,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoModule => "NoModule",
            Self::Codeigniter => "Codeigniter",
            Self::Collabora => "Collabora",
            Self::FreeScout => "FreeScout",
            Self::Leantime => "Leantime",
            Self::LinkStack => "LinkStack",
            Self::Mumble => "Mumble",
            Self::Nextcloud => "Nextcloud",
            Self::OAuthWebserver => "OAuthWebserver",
            Self::Odoo => "Odoo",
            Self::ParseDmarc => "ParseDmarc",
            Self::Registry => "Registry",
            Self::UptimeKuma => "UptimeKuma",
            Self::Webserver => "Webserver",
            Self::WordPress => "WordPress",
            Self::Yopass => "Yopass",
            Self::Zammad => "Zammad",
        }
    }

    /// Resolve a persisted or user-supplied type name, falling back to `NoModule`.
    #[must_use]
    pub fn parse_or_none(name: &str) -> Self {
        name.parse().unwrap_or(Self::NoModule)
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::NoModule)
    }

    #[must_use]
    pub fn has_capability(self, capability: Capability) -> bool {
        self.spec().capabilities.contains(&capability)
    }

    /// Generate defaults for the module-specific keys that `existing` does not hold yet.
    ///
    /// Values are only produced for missing keys, so no port is allocated and no password
    /// generated for a key that is already persisted.
    pub fn missing_env(
        self,
        fqdn: &str,
        existing: &EnvMap,
        values: &mut dyn ValueSource,
    ) -> Result<EnvMap> {
        let mut out = EnvMap::new();
        for (key, default) in self.spec().env {
            if existing.contains_key(*key) {
                continue;
            }
            out.insert((*key).to_string(), default.resolve(fqdn, values)?);
        }
        Ok(out)
    }

    #[must_use]
    pub const fn spec(self) -> &'static ModuleSpec {
        match self {
            Self::NoModule => &NO_MODULE,
            Self::Codeigniter => &CODEIGNITER,
            Self::Collabora => &COLLABORA,
            Self::FreeScout => &FREESCOUT,
            Self::Leantime => &LEANTIME,
            Self::LinkStack => &LINKSTACK,
            Self::Mumble => &MUMBLE,
            Self::Nextcloud => &NEXTCLOUD,
            Self::OAuthWebserver => &OAUTH_WEBSERVER,
            Self::Odoo => &ODOO,
            Self::ParseDmarc => &PARSE_DMARC,
            Self::Registry => &REGISTRY,
            Self::UptimeKuma => &UPTIME_KUMA,
            Self::Webserver => &WEBSERVER,
            Self::WordPress => &WORDPRESS,
            Self::Yopass => &YOPASS,
            Self::Zammad => &ZAMMAD,
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CATALOG
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}

/// Identity keys every module's environment starts from.
#[must_use]
pub fn base_env(fqdn: &str, root_dir: &Path, network_name: &str) -> EnvMap {
    let escaped = names::escape(fqdn);
    [
        ("DOMAIN", fqdn.to_string()),
        ("DOMAIN_ESCAPED", escaped.clone()),
        ("DOMAIN_URL", format!("https://{fqdn}")),
        ("DOMAIN_PATH", root_dir.display().to_string()),
        ("PROJECT_NAME", escaped),
        ("PROXY_NETWORK", network_name.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Source of generated values, so tests can swap randomness and port probing out.
pub trait ValueSource {
    /// An alphanumeric password of `len` characters.
    fn password(&mut self, len: usize) -> String;
    /// A currently unused TCP port on loopback.
    fn free_port(&mut self) -> Result<u16>;
    /// `bytes` random bytes, URL-safe base64 encoded.
    fn url_safe_secret(&mut self, bytes: usize) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvDefault {
    Literal(&'static str),
    Password(usize),
    FreePort,
    UrlSafeSecret(usize),
    /// `https://<fqdn>`
    DomainUrl,
    /// `admin@<fqdn>`
    AdminEmail,
}

impl EnvDefault {
    pub fn resolve(self, fqdn: &str, values: &mut dyn ValueSource) -> Result<String> {
        Ok(match self {
            Self::Literal(value) => value.to_string(),
            Self::Password(len) => values.password(len),
            Self::FreePort => values.free_port()?.to_string(),
            Self::UrlSafeSecret(bytes) => values.url_safe_secret(bytes),
            Self::DomainUrl => format!("https://{fqdn}"),
            Self::AdminEmail => format!("admin@{fqdn}"),
        })
    }
}

/// Optional helpers a module type opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// SQL dump import and an interactive prompt against the `mysql` service.
    MysqlClient,
    /// Copying host directories into the web root under `DOMAIN_PATH`.
    WebContent,
}

/// Extra work a module type does when it is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupHook {
    None,
    /// Seed `odoo/etc/odoo.conf`.
    OdooConfig,
    /// Seed `config.json`.
    ParseDmarcConfig,
    /// Clone the image builder and create `htpasswd` credentials.
    RegistryBuilder,
    /// Remind the operator to fill in the OAuth provider settings.
    OAuthNotice,
}

#[derive(Debug)]
pub struct ModuleSpec {
    pub description: &'static str,
    /// Data directories relative to the subdomain root, parents before children.
    pub required_dirs: &'static [&'static str],
    pub env: &'static [(&'static str, EnvDefault)],
    pub capabilities: &'static [Capability],
    pub setup: SetupHook,
    /// Files outside `required_dirs` that the module creates and removes on clean.
    pub generated_files: &'static [&'static str],
}

const PORT: (&str, EnvDefault) = ("HTTP_PORT", EnvDefault::FreePort);
const PASSWORD: EnvDefault = EnvDefault::Password(DEFAULT_PASSWORD_LENGTH);

static NO_MODULE: ModuleSpec = ModuleSpec {
    description: "No module bound",
    required_dirs: &[],
    env: &[],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static CODEIGNITER: ModuleSpec = ModuleSpec {
    description: "PHP web server for CodeIgniter applications with MySQL",
    required_dirs: &["mysql", "php"],
    env: &[
        PORT,
        ("MYSQL_PASSWORD", PASSWORD),
        ("MYSQL_ROOT_PASSWORD", PASSWORD),
    ],
    capabilities: &[Capability::MysqlClient, Capability::WebContent],
    setup: SetupHook::None,
    generated_files: &[],
};

static COLLABORA: ModuleSpec = ModuleSpec {
    description: "Collabora Online document server",
    required_dirs: &[],
    env: &[PORT, ("ADMIN_PASSWORD", PASSWORD)],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static FREESCOUT: ModuleSpec = ModuleSpec {
    description: "FreeScout help desk with MariaDB",
    required_dirs: &["mariadb", "data"],
    env: &[
        PORT,
        ("MARIADB_PASSWORD", PASSWORD),
        ("MARIADB_ROOT_PASSWORD", PASSWORD),
    ],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static LEANTIME: ModuleSpec = ModuleSpec {
    description: "Leantime project management with MySQL",
    required_dirs: &[
        "mysql",
        "leantime",
        "leantime/public_userfiles",
        "leantime/userfiles",
        "leantime/plugins",
        "leantime/logs",
    ],
    env: &[
        PORT,
        ("PUID", EnvDefault::Literal("1000")),
        ("PGID", EnvDefault::Literal("1000")),
        ("LEAN_PORT", EnvDefault::Literal("8080")),
        ("LEAN_APP_URL", EnvDefault::DomainUrl),
        ("LEAN_APP_DIR", EnvDefault::Literal("")),
        ("LEAN_DEBUG", EnvDefault::Literal("0")),
        ("MYSQL_ROOT_PASSWORD", PASSWORD),
        ("LEAN_DB_HOST", EnvDefault::Literal("db")),
        ("LEAN_DB_USER", EnvDefault::Literal("lean")),
        ("LEAN_DB_PASSWORD", EnvDefault::Password(200)),
        ("LEAN_DB_DATABASE", EnvDefault::Literal("leantime")),
        ("LEAN_DB_PORT", EnvDefault::Literal("3306")),
        ("LEAN_SESSION_PASSWORD", PASSWORD),
        ("LEAN_SESSION_EXPIRATION", EnvDefault::Literal("28800")),
        ("LEAN_SESSION_SECURE", EnvDefault::Literal("true")),
        ("LEAN_EMAIL_RETURN", EnvDefault::Literal("")),
        ("LEAN_EMAIL_USE_SMTP", EnvDefault::Literal("false")),
        ("LEAN_EMAIL_SMTP_HOSTS", EnvDefault::Literal("")),
        ("LEAN_EMAIL_SMTP_USERNAME", EnvDefault::Literal("")),
        ("LEAN_EMAIL_SMTP_PASSWORD", EnvDefault::Literal("")),
        ("LEAN_EMAIL_SMTP_SECURE", EnvDefault::Literal("STARTTLS")),
        ("LEAN_EMAIL_SMTP_PORT", EnvDefault::Literal("587")),
    ],
    capabilities: &[Capability::MysqlClient],
    setup: SetupHook::None,
    generated_files: &[],
};

static LINKSTACK: ModuleSpec = ModuleSpec {
    description: "LinkStack link page",
    required_dirs: &["src"],
    env: &[
        PORT,
        ("ADMIN_EMAIL", EnvDefault::AdminEmail),
        ("TIMEZONE", EnvDefault::Literal("Europe/Berlin")),
    ],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static MUMBLE: ModuleSpec = ModuleSpec {
    description: "Mumble voice chat server",
    required_dirs: &["mumble"],
    env: &[PORT],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static NEXTCLOUD: ModuleSpec = ModuleSpec {
    description: "Nextcloud with MySQL and Redis",
    required_dirs: &["mysql", "nextcloud", "redis"],
    env: &[
        PORT,
        ("MYSQL_PASSWORD", PASSWORD),
        ("MYSQL_ROOT_PASSWORD", PASSWORD),
        ("REDIS_PASSWORD", PASSWORD),
    ],
    capabilities: &[Capability::MysqlClient, Capability::WebContent],
    setup: SetupHook::None,
    generated_files: &[],
};

static OAUTH_WEBSERVER: ModuleSpec = ModuleSpec {
    description: "NGINX web server behind oauth2-proxy",
    required_dirs: &["data"],
    env: &[
        PORT,
        ("OAUTH2_PROXY_PROVIDER", EnvDefault::Literal("<PROVIDER ID>")),
        (
            "OAUTH2_PROXY_PROVIDER_DISPLAY_NAME",
            EnvDefault::Literal("<PROVIDER DISPLAY NAME>"),
        ),
        ("OAUTH2_PROXY_CLIENT_ID", EnvDefault::Literal("<CLIENT ID HERE>")),
        (
            "OAUTH2_PROXY_CLIENT_SECRET",
            EnvDefault::Literal("<CLIENT SECRET HERE>"),
        ),
        ("OAUTH2_PROXY_LOGIN_URL", EnvDefault::Literal("<LOGIN URL>")),
        ("OAUTH2_PROXY_REDEEM_URL", EnvDefault::Literal("<TOKEN URL>")),
        (
            "OAUTH2_PROXY_VALIDATE_URL",
            EnvDefault::Literal("<VALIDATION URL>"),
        ),
        ("OAUTH2_PROXY_COOKIE_SECRET", EnvDefault::UrlSafeSecret(32)),
    ],
    capabilities: &[Capability::WebContent],
    setup: SetupHook::OAuthNotice,
    generated_files: &[],
};

static ODOO: ModuleSpec = ModuleSpec {
    description: "Odoo ERP with PostgreSQL",
    required_dirs: &["postgresql", "odoo", "odoo/addons", "odoo/etc", "odoo/lib"],
    env: &[
        PORT,
        ("POSTGRES_PASSWORD", PASSWORD),
        ("LIVECHAT_PORT", EnvDefault::FreePort),
    ],
    capabilities: &[],
    setup: SetupHook::OdooConfig,
    generated_files: &[],
};

static PARSE_DMARC: ModuleSpec = ModuleSpec {
    description: "parsedmarc report viewer",
    required_dirs: &["data"],
    env: &[PORT],
    capabilities: &[],
    setup: SetupHook::ParseDmarcConfig,
    generated_files: &["config.json"],
};

static REGISTRY: ModuleSpec = ModuleSpec {
    description: "Container registry with a daily image builder",
    required_dirs: &["builder", "registry"],
    env: &[
        PORT,
        ("REGISTRY_BUILDER_USER", EnvDefault::Literal("builder")),
        ("REGISTRY_BUILDER_PASS", PASSWORD),
    ],
    capabilities: &[],
    setup: SetupHook::RegistryBuilder,
    generated_files: &["htpasswd"],
};

static UPTIME_KUMA: ModuleSpec = ModuleSpec {
    description: "Uptime Kuma monitoring",
    required_dirs: &["uptime-kuma"],
    env: &[PORT],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static WEBSERVER: ModuleSpec = ModuleSpec {
    description: "PHP web server",
    required_dirs: &["php"],
    env: &[PORT],
    capabilities: &[Capability::WebContent],
    setup: SetupHook::None,
    generated_files: &[],
};

static WORDPRESS: ModuleSpec = ModuleSpec {
    description: "WordPress with MySQL",
    required_dirs: &["mysql", "wordpress"],
    env: &[
        PORT,
        ("MYSQL_PASSWORD", PASSWORD),
        ("MYSQL_ROOT_PASSWORD", PASSWORD),
    ],
    capabilities: &[Capability::MysqlClient],
    setup: SetupHook::None,
    generated_files: &[],
};

static YOPASS: ModuleSpec = ModuleSpec {
    description: "Yopass one-time secret sharing",
    required_dirs: &[],
    env: &[PORT],
    capabilities: &[],
    setup: SetupHook::None,
    generated_files: &[],
};

static ZAMMAD: ModuleSpec = ModuleSpec {
    description: "Zammad help desk with PostgreSQL and Elasticsearch",
    required_dirs: &["zammad", "zammad-backup", "elasticsearch", "postgresql"],
    env: &[
        PORT,
        ("POSTGRES_USER", EnvDefault::Literal("zammad")),
        // PostgreSQL rejects very long passwords in the zammad image.
        ("POSTGRES_PASSWORD", EnvDefault::Password(30)),
        (
            "IMAGE_REPO",
            EnvDefault::Literal("zammad/zammad-docker-compose"),
        ),
        ("VERSION", EnvDefault::Literal("-latest")),
    ],
    capabilities: &[Capability::WebContent],
    setup: SetupHook::None,
    generated_files: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ValueSource for Fixed {
        fn password(&mut self, len: usize) -> String {
            "p".repeat(len)
        }
        fn free_port(&mut self) -> Result<u16> {
            Ok(4242)
        }
        fn url_safe_secret(&mut self, _bytes: usize) -> String {
            "secret".to_string()
        }
    }

    #[test]
    fn names_round_trip_through_the_catalog() {
        for kind in ModuleKind::CATALOG {
            assert_eq!(ModuleKind::parse_or_none(kind.name()), *kind);
            assert!(!kind.is_none());
        }
    }

    #[test]
    fn unknown_names_fall_back_to_no_module() {
        assert_eq!(ModuleKind::parse_or_none("Joomla"), ModuleKind::NoModule);
        assert_eq!(ModuleKind::parse_or_none("wordpress"), ModuleKind::NoModule);
        assert_eq!(ModuleKind::parse_or_none("NoModule"), ModuleKind::NoModule);
        assert_eq!(
            "Joomla".parse::<ModuleKind>(),
            Err(UnknownModule("Joomla".to_string()))
        );
    }

    #[test]
    fn every_catalog_module_is_routable() {
        for kind in ModuleKind::CATALOG {
            assert!(
                kind.spec().env.iter().any(|(k, _)| *k == "HTTP_PORT"),
                "{kind} has no HTTP_PORT"
            );
        }
    }

    #[test]
    fn required_dirs_list_parents_first() {
        for kind in ModuleKind::CATALOG {
            let dirs = kind.spec().required_dirs;
            for (i, dir) in dirs.iter().enumerate() {
                if let Some((parent, _)) = dir.rsplit_once('/') {
                    assert!(dirs[..i].contains(&parent), "{kind}: {dir} before {parent}");
                }
            }
        }
    }

    #[test]
    fn missing_env_only_fills_absent_keys() {
        let mut existing = EnvMap::new();
        existing.insert("MYSQL_PASSWORD".into(), "existing123".into());

        let generated = ModuleKind::WordPress
            .missing_env("blog.example.com", &existing, &mut Fixed)
            .unwrap();

        assert!(!generated.contains_key("MYSQL_PASSWORD"));
        assert_eq!(generated["HTTP_PORT"], "4242");
        assert_eq!(generated["MYSQL_ROOT_PASSWORD"].len(), DEFAULT_PASSWORD_LENGTH);
    }

    #[test]
    fn linkstack_admin_email_is_an_address() {
        let generated = ModuleKind::LinkStack
            .missing_env("links.example.com", &EnvMap::new(), &mut Fixed)
            .unwrap();
        assert_eq!(generated["ADMIN_EMAIL"], "admin@links.example.com");
    }

    #[test]
    fn base_env_carries_identity_keys() {
        let env = base_env("blog.example.com", Path::new("/srv/x/blog.example.com"), "proxy");
        assert_eq!(env["DOMAIN_ESCAPED"], "blog-example-com");
        assert_eq!(env["DOMAIN_URL"], "https://blog.example.com");
        assert_eq!(env["DOMAIN_PATH"], "/srv/x/blog.example.com");
        assert_eq!(env["PROJECT_NAME"], "blog-example-com");
        assert_eq!(env["PROXY_NETWORK"], "proxy");
    }
}
