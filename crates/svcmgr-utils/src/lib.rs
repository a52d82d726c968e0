//! Side-effecting adapters for svcmgr.
//!
//! Everything that spawns a process, touches ownership, asks the OS for a port or draws
//! randomness lives here, behind small types the manager can swap out in tests.

#![warn(clippy::unwrap_used)] // Force error propagation (no panics)
#![warn(clippy::expect_used)] // Force error propagation
#![warn(clippy::print_stderr)] // Ban eprintln! (Use tracing::error!)
#![warn(clippy::wildcard_imports)] // Ban `use crate::*` (Explicit imports only)
#![allow(clippy::missing_errors_doc)]

/// Certificate provisioning through an ACME client.
pub mod cert;
/// Container runtime (compose CLI) adapter.
pub mod compose;
/// Environment variable and path utilities.
pub mod env;
/// Filesystem utilities.
pub mod fs;
/// Process invocation utilities.
pub mod process;
/// Passwords, secrets and free ports.
pub mod secret;
