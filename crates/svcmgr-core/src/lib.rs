//! # svcmgr-core
//!
//! `svcmgr-core` holds the types and pure text transforms shared by the manager and the
//! CLI. Nothing in here spawns processes; the only I/O is reading and writing the small
//! per-module files.
//!
//! ## Architecture
//!
//! ```mermaid
//! graph TD
//!     CLI[svcmgr-cli] -->|Uses| Manager[svcmgr-manager]
//!     Manager -->|Uses| Core[svcmgr-core]
//!     Manager -->|Uses| Utils[svcmgr-utils]
//!     Utils -->|Uses| Core
//!
//!     Core --> Config[Configuration]
//!     Core --> Catalog[Module Catalog]
//!     Core --> Haproxy[Proxy Rules]
//! ```
//!
//! ## Key Modules
//!
//! *   [`config`]: The host-wide `config.toml` schema.
//! *   [`env`]: The `.env` store and its layered merge.
//! *   [`module`]: The closed catalog of module types.
//! *   [`marker`]: The `.module` file recording the bound module type.
//! *   [`haproxy`]: Adding and removing route rules in a shared haproxy configuration.
//! *   [`state`]: Module lifecycle states.

// =========================================================================
//  Strict Lints: Safety, Hygiene, and Documentation
// =========================================================================

// 1. Logic & Safety
#![warn(clippy::manual_let_else)] // Enforces clean "Guard Clause" style
#![warn(clippy::unwrap_used)] // Force error propagation (no panics)
#![warn(clippy::expect_used)] // Force error propagation

// 2. Numeric Safety
#![warn(clippy::cast_possible_truncation)] // Warn on u64 -> u32 (potential data loss)

// 3. Observability
#![warn(clippy::print_stdout)] // Ban println! (Use tracing::info!)
#![warn(clippy::print_stderr)] // Ban eprintln! (Use tracing::error!)

// 4. Import Hygiene
#![warn(clippy::wildcard_imports)] // Ban `use crate::*` (Explicit imports only)

// 5. Documentation
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod config;
#[doc(inline)]
pub use config::GlobalConfig;
pub mod env;
#[doc(inline)]
pub use env::{EnvFile, EnvLayer, EnvLayerKind, EnvMap};
pub mod haproxy;
pub mod marker;
#[doc(inline)]
pub use marker::ModuleMarker;
pub mod module;
#[doc(inline)]
pub use module::{Capability, ModuleKind, ValueSource};
pub mod names;
pub mod state;
#[doc(inline)]
pub use state::{LifecycleError, ModuleState};
pub mod template;
