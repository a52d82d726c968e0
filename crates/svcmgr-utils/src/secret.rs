use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use svcmgr_core::ValueSource;

/// A password drawn from the 62 ASCII letters and digits using the OS CSPRNG.
#[must_use]
pub fn password(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// `bytes` random bytes, URL-safe base64 encoded (padding included).
#[must_use]
pub fn url_safe_secret(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE.encode(buf)
}

/// Asks the OS for an unused loopback port.
///
/// The listener is dropped before returning, so another process may take the port before
/// the caller binds it.
pub fn free_port() -> Result<u16> {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").context("Failed to bind an ephemeral port")?;
    Ok(listener
        .local_addr()
        .context("Failed to read the ephemeral port")?
        .port())
}

/// The production [`ValueSource`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemValues;

impl ValueSource for SystemValues {
    fn password(&mut self, len: usize) -> String {
        password(len)
    }

    fn free_port(&mut self) -> Result<u16> {
        free_port()
    }

    fn url_safe_secret(&mut self, bytes: usize) -> String {
        url_safe_secret(bytes)
    }
}
