use crate::client::ClientOptions;
use crate::error::ConfigError;
use crate::host::{HostConfig, select_host};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

/// Standard RADIUS authentication port
pub const DEFAULT_PORT: u16 = 1812;
/// Per-attempt wait for a response, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
/// Additional attempts after the first one times out
pub const DEFAULT_RETRIES: u32 = 3;

/// Static adapter configuration
///
/// Deserialized from JSON with camelCase keys. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthConfig {
    /// This client's own address, sent as NAS-IP-Address / NAS-IPv6-Address
    pub ip_address: IpAddr,

    /// Shared secret with the RADIUS servers
    pub secret: String,

    /// Fixed packet identifier; a random one is drawn once per validator otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<u8>,

    /// Where and how to reach the servers
    pub options: ClientOptionsConfig,

    /// Sign every Access-Request with a Message-Authenticator (RFC 2869)
    #[serde(default)]
    pub require_message_authenticator: bool,

    /// Log level for the command-line tool: "trace" .. "error" (default: "info")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// JSON-lines audit log for diagnostic events (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log_path: Option<String>,
}

/// Connection parameters shared by every exchange
///
/// This is the runtime-adjustable part of the configuration; see
/// [`RadiusValidator::set_client_options`](crate::RadiusValidator::set_client_options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientOptionsConfig {
    /// One server, or a pool picked from at random per call
    pub host: HostConfig,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl ClientOptionsConfig {
    /// Options with defaults for everything but the host
    pub fn new(host: impl Into<HostConfig>) -> Self {
        ClientOptionsConfig {
            host: host.into(),
            port: default_port(),
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.host.validate()?;

        if self.port == 0 {
            return Err(ConfigError::Invalid("Port cannot be 0".to_string()));
        }

        if self.timeout == 0 {
            return Err(ConfigError::Invalid("Timeout cannot be 0".to_string()));
        }

        Ok(())
    }

    /// Pick a host and produce the options for one exchange
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ClientOptions, ConfigError> {
        Ok(ClientOptions {
            host: select_host(&self.host, rng)?,
            port: self.port,
            timeout: Duration::from_millis(self.timeout),
            retries: self.retries,
        })
    }
}

impl AuthConfig {
    /// Minimal configuration: everything else takes its default
    pub fn new(ip_address: IpAddr, secret: impl Into<String>, host: impl Into<HostConfig>) -> Self {
        AuthConfig {
            ip_address,
            secret: secret.into(),
            identifier: None,
            options: ClientOptionsConfig::new(host),
            require_message_authenticator: false,
            log_level: None,
            audit_log_path: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AuthConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("Secret cannot be empty".to_string()));
        }

        if let Some(ref level) = self.log_level
            && !["trace", "debug", "info", "warn", "error"].contains(&level.as_str())
        {
            return Err(ConfigError::Invalid(format!("Unknown log level: {}", level)));
        }

        self.options.validate()
    }

    /// Example configuration written by the command-line tool
    pub fn example() -> Self {
        AuthConfig {
            ip_address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            secret: "testing123".to_string(),
            identifier: None,
            options: ClientOptionsConfig {
                host: HostConfig::Pool(vec![
                    "192.168.1.1".to_string(),
                    "192.168.1.2".to_string(),
                ]),
                port: DEFAULT_PORT,
                timeout: DEFAULT_TIMEOUT_MS,
                retries: DEFAULT_RETRIES,
            },
            require_message_authenticator: false,
            log_level: Some("info".to_string()),
            audit_log_path: None,
        }
    }
}
