//! Harness configuration

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ContainerError;

/// Environment variable overriding the host of the base URI
pub const HOST_VAR: &str = "TESTBED_HOST";
/// Environment variable overriding the port of the base URI
pub const PORT_VAR: &str = "TESTBED_PORT";

/// Where the harness deploys the application under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Host clients use to reach the container
    pub host: String,
    /// Port the container listens on
    pub port: u16,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9998,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `TESTBED_HOST` / `TESTBED_PORT`
    pub fn from_env() -> Result<Self, ContainerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ContainerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(HOST_VAR).filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }

        if let Some(port) = lookup(PORT_VAR) {
            config.port = port.trim().parse().map_err(|_| {
                ContainerError::invalid(format!("{} is not a valid port: '{}'", PORT_VAR, port))
            })?;
        }

        Ok(config)
    }

    /// `http://<host>:<port>/`
    pub fn base_uri(&self) -> Result<Url, ContainerError> {
        let raw = format!("http://{}:{}/", self.host, self.port);
        Url::parse(&raw)
            .map_err(|e| ContainerError::invalid(format!("invalid base URI '{}': {}", raw, e)))
    }
}
