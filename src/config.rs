//! Server configuration
//!
//! Read once at startup from the command line, the environment and an
//! optional `.env` file.

use std::net::IpAddr;

use crate::error::AppError;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Environment variable holding the bind address
pub const ADDR_VAR: &str = "CHAT_ADDR";

/// Environment variable holding the privileged operator address
pub const OWNER_IP_VAR: &str = "OWNER_IP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Connections from this address are made owner of any room they join
    pub privileged_addr: Option<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            privileged_addr: None,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from the process environment.
    ///
    /// `addr_arg` (first CLI argument) wins over `CHAT_ADDR`.
    pub fn from_env(addr_arg: Option<String>) -> Result<Self, AppError> {
        Self::from_lookup(addr_arg, |key| dotenv::var(key).ok())
    }

    fn from_lookup(
        addr_arg: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let bind_addr = addr_arg
            .or_else(|| lookup(ADDR_VAR))
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());

        let privileged_addr = match lookup(OWNER_IP_VAR) {
            Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                AppError::Config(format!("{} is not an IP address: {}", OWNER_IP_VAR, raw))
            })?),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            privileged_addr,
        })
    }

    /// Whether `origin` is the privileged operator address
    pub fn is_privileged(&self, origin: IpAddr) -> bool {
        self.privileged_addr == Some(origin)
    }
}
