//! # svcmgr-manager
//!
//! The domain → subdomain → module topology and everything that happens when a module
//! changes state.
//!
//! ## Lifecycle
//!
//! 1.  **Startup**: [`ServiceManager::load`] scans the services root; each domain scans
//!     its directory for subdomains, and each subdomain reads its `.module` marker.
//! 2.  **Binding**: [`Subdomain::bind`] tears down the previous module, materializes the
//!     new one (data directories, `.env`) and records it in the marker.
//! 3.  **Running**: [`Subdomain::up`] renders the compose file, starts the containers and
//!     adds the proxy route; [`Subdomain::down`] reverses the last two.
//! 4.  **Removal**: [`Subdomain::unbind`] stops the module and deletes its artifacts.
//!
//! ## Entry Points
//!
//! *   **Topology**: [`ServiceManager`], [`Domain`], [`Subdomain`]
//! *   **Configuration**: [`config_loader::ConfigLoader`]
//! *   **Host services**: [`HostContext`]

#![warn(clippy::manual_let_else)] // Enforces clean "Guard Clause" style
#![warn(clippy::unwrap_used)] // Force error propagation (no panics)
#![warn(clippy::expect_used)] // Force error propagation
#![warn(clippy::print_stdout)] // Ban println! (Use tracing::info!)
#![warn(clippy::print_stderr)] // Ban eprintln! (Use tracing::error!)
#![warn(clippy::wildcard_imports)] // Ban `use crate::*` (Explicit imports only)
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod config_loader;
pub mod context;
#[doc(inline)]
pub use context::HostContext;
pub mod domain;
#[doc(inline)]
pub use domain::Domain;
mod hooks;
pub mod manager;
#[doc(inline)]
pub use manager::ServiceManager;
pub mod module;
#[doc(inline)]
pub use module::{Module, Session};
pub mod proxy;
pub mod registry;
pub mod subdomain;
#[doc(inline)]
pub use subdomain::{ModuleStatus, Subdomain};
