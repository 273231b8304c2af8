//! Target server selection
//!
//! Every call picks independently and uniformly at random. There is no
//! round-robin state, stickiness or health tracking: a dead server is
//! discovered by the exchange timing out.

use crate::error::ConfigError;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Configured RADIUS host: one address or a pool of them
///
/// Accepts either a JSON string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostConfig {
    Single(String),
    Pool(Vec<String>),
}

impl HostConfig {
    /// All configured addresses
    pub fn hosts(&self) -> &[String] {
        match self {
            HostConfig::Single(host) => std::slice::from_ref(host),
            HostConfig::Pool(hosts) => hosts,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let HostConfig::Pool(hosts) = self
            && hosts.is_empty()
        {
            return Err(ConfigError::EmptyHostList);
        }

        if self.hosts().iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid("Host cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl From<&str> for HostConfig {
    fn from(host: &str) -> Self {
        HostConfig::Single(host.to_string())
    }
}

impl From<String> for HostConfig {
    fn from(host: String) -> Self {
        HostConfig::Single(host)
    }
}

impl From<Vec<String>> for HostConfig {
    fn from(hosts: Vec<String>) -> Self {
        HostConfig::Pool(hosts)
    }
}

impl From<Vec<&str>> for HostConfig {
    fn from(hosts: Vec<&str>) -> Self {
        HostConfig::Pool(hosts.into_iter().map(str::to_string).collect())
    }
}

/// Pick the server for one call
pub fn select_host<R: Rng + ?Sized>(hosts: &HostConfig, rng: &mut R) -> Result<String, ConfigError> {
    match hosts {
        HostConfig::Single(host) => Ok(host.clone()),
        HostConfig::Pool(pool) => pool.choose(rng).cloned().ok_or(ConfigError::EmptyHostList),
    }
}
