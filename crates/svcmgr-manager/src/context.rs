use std::cell::RefCell;
use std::fmt;
use svcmgr_core::{GlobalConfig, ValueSource};
use svcmgr_utils::cert::CertificateProvisioner;
use svcmgr_utils::compose::{ComposeCli, ContainerRuntime};
use svcmgr_utils::secret::SystemValues;

/// Everything a domain, subdomain or module needs from the host.
///
/// Built once at startup and shared (behind an `Rc`) by the whole topology, so tests can
/// run against a fresh context with a fake runtime and deterministic values.
pub struct HostContext {
    config: GlobalConfig,
    runtime: Box<dyn ContainerRuntime>,
    values: RefCell<Box<dyn ValueSource>>,
    certificates: CertificateProvisioner,
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("config", &self.config)
            .field("runtime", &"ContainerRuntime(...)")
            .field("values", &"ValueSource(...)")
            .finish_non_exhaustive()
    }
}

impl HostContext {
    #[must_use]
    pub fn new(
        config: GlobalConfig,
        runtime: Box<dyn ContainerRuntime>,
        values: Box<dyn ValueSource>,
    ) -> Self {
        let certificates = CertificateProvisioner::new(config.certificates.clone());
        Self {
            config,
            runtime,
            values: RefCell::new(values),
            certificates,
        }
    }

    /// The production context: the configured compose command and OS randomness.
    #[must_use]
    pub fn from_config(config: GlobalConfig) -> Self {
        let runtime = ComposeCli::new(config.compose.command.clone());
        Self::new(config, Box::new(runtime), Box::new(SystemValues))
    }

    #[must_use]
    pub const fn config(&self) -> &GlobalConfig {
        &self.config
    }

    #[must_use]
    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    #[must_use]
    pub const fn certificates(&self) -> &CertificateProvisioner {
        &self.certificates
    }

    /// Runs `f` with exclusive access to the value source.
    pub fn with_values<R>(&self, f: impl FnOnce(&mut dyn ValueSource) -> R) -> R {
        let mut values = self.values.borrow_mut();
        f(values.as_mut())
    }
}
