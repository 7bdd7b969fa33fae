//! Application settings loaded via OrthoConfig.
//!
//! Every value can come from CLI flags, `APP_`-prefixed environment
//! variables, or a config file, with the usual OrthoConfig precedence.

use std::net::SocketAddr;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_COLLABORATION_FANOUT: usize = 4;

/// Configuration values controlling the server process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "APP")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL. Required to serve requests.
    pub database_url: Option<String>,
    /// Maximum connections in the database pool.
    pub pool_max_size: Option<u32>,
    /// Whether session cookies carry the `Secure` flag.
    pub cookie_secure: Option<bool>,
    /// Bound on concurrently processed invitees per collaboration call.
    pub collaboration_fanout: Option<usize>,
    /// File holding the session signing key material.
    pub session_key_file: Option<PathBuf>,
}

impl AppSettings {
    /// The configured bind address, parsed, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
    }

    /// The configured pool size, falling back to 10.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Whether session cookies are `Secure`; defaults to true.
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    /// The configured fan-out bound, falling back to 4.
    pub fn collaboration_fanout(&self) -> usize {
        self.collaboration_fanout
            .unwrap_or(DEFAULT_COLLABORATION_FANOUT)
    }

    /// The configured session key path, falling back to the conventional
    /// secrets mount.
    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("/var/run/secrets/session_key"))
    }
}
