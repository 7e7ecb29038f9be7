//! Server configuration.
//!
//! Values come from built-in defaults, then an optional YAML file, then
//! command-line flags or environment variables (see [`ConfigOverrides`]).
//!
//! ```yaml
//! port: 3535
//! host: 127.0.0.1
//! proxy_prefix: /api
//! proxy_target: https://www.example.com/
//! body_limit: 104857600
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// 100 MiB
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen port. `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Unmatched requests under this prefix are proxied to `proxy_target`.
    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_target: Option<String>,
    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_port() -> u16 {
    3535
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_proxy_prefix() -> String {
    "/api".to_string()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            proxy_prefix: default_proxy_prefix(),
            proxy_target: None,
            body_limit: default_body_limit(),
        }
    }
}

/// Values that take precedence over the file. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub proxy_prefix: Option<String>,
    pub proxy_target: Option<String>,
    pub body_limit: Option<usize>,
}

impl ServerConfig {
    /// Load a YAML file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ServerConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Start from the file at `path` (or defaults) and apply `overrides`.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(prefix) = overrides.proxy_prefix {
            self.proxy_prefix = prefix;
        }
        if let Some(target) = overrides.proxy_target {
            self.proxy_target = Some(target).filter(|t| !t.is_empty());
        }
        if let Some(limit) = overrides.body_limit {
            self.body_limit = limit;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.host
            .parse::<IpAddr>()
            .map_err(|_| Error::Config(format!("host '{}' is not an IP address", self.host)))?;

        if !self.proxy_prefix.is_empty() && !self.proxy_prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "proxy_prefix '{}' must start with '/'",
                self.proxy_prefix
            )));
        }

        if let Some(target) = &self.proxy_target {
            if !(target.starts_with("http://") || target.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "proxy_target '{target}' must be an http:// or https:// URL"
                )));
            }
        }

        if self.body_limit == 0 {
            return Err(Error::Config("body_limit must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| Error::Config(format!("host '{}' is not an IP address", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
