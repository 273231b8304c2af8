//! RADIUS Username/Password Authentication
//!
//! Checks a username/password pair against one of a pool of RADIUS servers
//! using PAP and reports whether the server accepted it. Packets are built
//! and verified with the `radius-proto` crate.
//!
//! # Features
//!
//! - Random server selection per call from a configured pool
//! - Per-attempt timeout with a bounded retry budget
//! - Response correlation by identifier, Response Authenticator and
//!   Message-Authenticator
//! - Runtime-adjustable connection options
//! - JSON configuration and optional JSON-lines audit log
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_auth::{AuthConfig, RadiusValidator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new(
//!         "192.168.1.10".parse()?,
//!         "testing123",
//!         vec!["192.168.1.1", "192.168.1.2"],
//!     );
//!     let validator = RadiusValidator::new(config)?;
//!
//!     let validation = validator.validate("alice", "password").await?;
//!     println!("{} accepted: {}", validation.credentials.id, validation.is_valid);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod request;
pub mod response;
pub mod validator;

pub use audit::{AuditEntry, AuditLog, AuthLog, TRANSPORT_ERROR_TAGS, TracingLog};
pub use client::{ClientOptions, ExchangeStats, RadiusExchange, UdpExchange, encode_access_request};
pub use config::{AuthConfig, ClientOptionsConfig};
pub use error::{AuthError, ConfigError, RequestError, TransportError};
pub use host::{HostConfig, select_host};
pub use request::{AccessRequest, RequestAttribute};
pub use response::{AuthResponse, is_authenticated};
pub use validator::{Credentials, RadiusValidator, Validation};
