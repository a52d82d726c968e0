use std::fmt;

/// Where a subdomain's module is in its lifecycle.
///
/// ```text
/// Unbound -> Materialized -> Running <-> Stopped
///                 \              \         /
///                  +------------> Removed <
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// No module is bound to the subdomain.
    Unbound,
    /// Directories and env file exist, containers were never started.
    Materialized,
    /// Containers are up and the proxy routes to them.
    Running,
    /// Containers are down and the route is gone.
    Stopped,
    /// Every generated artifact has been deleted.
    Removed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot {action} a module that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: ModuleState,
    },
    #[error("no module is bound to {0}")]
    NotBound(String),
    #[error("{module} has no {capability} support")]
    MissingCapability {
        module: String,
        capability: &'static str,
    },
}

impl ModuleState {
    /// The state after `up`.
    pub fn up(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Materialized | Self::Stopped | Self::Running => Ok(Self::Running),
            Self::Unbound | Self::Removed => Err(LifecycleError::InvalidTransition {
                action: "start",
                state: self,
            }),
        }
    }

    /// The state after `down`. Stopping something that never ran is allowed.
    pub fn down(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Materialized | Self::Stopped | Self::Running => Ok(Self::Stopped),
            Self::Unbound | Self::Removed => Err(LifecycleError::InvalidTransition {
                action: "stop",
                state: self,
            }),
        }
    }

    /// The state after `delete`; valid from anywhere.
    #[must_use]
    pub const fn delete(self) -> Self {
        Self::Removed
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unbound => "unbound",
            Self::Materialized => "materialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_and_down_cycle() {
        let state = ModuleState::Materialized.up().unwrap();
        assert_eq!(state, ModuleState::Running);
        let state = state.down().unwrap();
        assert_eq!(state, ModuleState::Stopped);
        assert_eq!(state.up(), Ok(ModuleState::Running));
    }

    #[test]
    fn removed_modules_cannot_start() {
        let removed = ModuleState::Running.delete();
        assert_eq!(
            removed.up(),
            Err(LifecycleError::InvalidTransition {
                action: "start",
                state: ModuleState::Removed
            })
        );
        assert_eq!(
            removed.up().unwrap_err().to_string(),
            "cannot start a module that is removed"
        );
    }

    #[test]
    fn delete_is_valid_everywhere() {
        for state in [
            ModuleState::Unbound,
            ModuleState::Materialized,
            ModuleState::Running,
            ModuleState::Stopped,
            ModuleState::Removed,
        ] {
            assert_eq!(state.delete(), ModuleState::Removed);
        }
    }
}
