//! IMAP connection configuration

use crate::error::{Error, Result};
use std::env;

/// Port for IMAP over implicit TLS.
pub const DEFAULT_PORT: u16 = 993;

/// GSSAPI service name used to build the `service@host` principal.
pub const DEFAULT_SERVICE: &str = "imap";

/// IMAP connection configuration
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub service: String,
    /// Connect in plain text and upgrade with STARTTLS instead of
    /// speaking TLS from the first byte.
    pub starttls: bool,
    /// Skip certificate verification (self-signed test servers).
    pub accept_invalid_certs: bool,
}

impl ImapConfig {
    /// Configuration for `host` with every other field at its default.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            service: DEFAULT_SERVICE.to_string(),
            starttls: false,
            accept_invalid_certs: false,
        }
    }

    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. `host_override` takes
    /// precedence over `IMAP_HOST`; one of the two is required.
    ///
    /// Optional (with defaults):
    /// - `IMAP_PORT` (default: `993`)
    /// - `IMAP_USERNAME` (default: `USER`, then `LOGNAME`)
    /// - `IMAP_SERVICE` (default: `imap`)
    /// - `IMAP_STARTTLS` (default: `false`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    pub fn from_env(host_override: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = match host_override {
            Some(host) => host.to_string(),
            None => env::var("IMAP_HOST")
                .map_err(|_| Error::Config("IMAP_HOST not set and no host given".into()))?,
        };

        let username = env::var("IMAP_USERNAME")
            .or_else(|_| env::var("USER"))
            .or_else(|_| env::var("LOGNAME"))
            .map_err(|_| Error::Config("Cannot determine username: set IMAP_USERNAME".into()))?;

        Ok(Self {
            host,
            port: env::var("IMAP_PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?,
            username,
            service: env::var("IMAP_SERVICE").unwrap_or_else(|_| DEFAULT_SERVICE.to_string()),
            starttls: env_flag("IMAP_STARTTLS")?,
            accept_invalid_certs: env_flag("IMAP_ACCEPT_INVALID_CERTS")?,
        })
    }

    /// The host-based GSSAPI service name, e.g. `imap@mail.example.com`.
    #[must_use]
    pub fn service_principal(&self) -> String {
        format!("{}@{}", self.service, self.host)
    }
}

fn env_flag(key: &str) -> Result<bool> {
    env::var(key).map_or(Ok(false), |value| parse_flag(&value).ok_or_else(|| {
        Error::Config(format!("Invalid {key}: expected true/false, got {value:?}"))
    }))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
