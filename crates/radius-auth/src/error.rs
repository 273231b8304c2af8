//! Error types for the authentication adapter

use radius_proto::{Attribute, Code, MAX_PASSWORD_LENGTH, PacketError};
use thiserror::Error;

/// Malformed or incomplete static configuration
///
/// Always detected before any network I/O and never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid configuration: host list is empty")]
    EmptyHostList,
}

/// Failure to obtain an Access-Accept or Access-Reject from the server
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to resolve RADIUS host '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error talking to {host}: {source}")]
    Io {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("No response from {host} after {attempts} attempt(s)")]
    Timeout { host: String, attempts: u32 },

    #[error("Unexpected {code} from {host}")]
    UnexpectedCode { host: String, code: Code },
}

impl TransportError {
    /// True when the server never answered
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Credentials that do not fit in an Access-Request
///
/// Detected while building the request, before any network I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("User-Name too long: {0} bytes (max {max})", max = Attribute::MAX_VALUE_LENGTH)]
    UserNameTooLong(usize),
    #[error("User-Password too long: {0} bytes (max {max})", max = MAX_PASSWORD_LENGTH)]
    PasswordTooLong(usize),
}

/// Error half of a `validate` outcome
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AuthError {
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            AuthError::Transport(e) => Some(e),
            AuthError::Configuration(_) | AuthError::Request(_) => None,
        }
    }
}
