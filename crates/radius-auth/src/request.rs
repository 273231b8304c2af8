//! Access-Request construction

use crate::config::AuthConfig;
use crate::error::RequestError;
use radius_proto::{Attribute, AttributeType, Code, MAX_PASSWORD_LENGTH};
use std::fmt;
use std::net::IpAddr;

/// One attribute of an outgoing Access-Request
#[derive(Clone, PartialEq, Eq)]
pub enum RequestAttribute {
    NasIpAddress(IpAddr),
    UserName(String),
    /// Plaintext here; hidden with the shared secret when encoded
    UserPassword(String),
}

impl RequestAttribute {
    /// Dictionary name of the attribute
    pub fn name(&self) -> &'static str {
        self.attribute_type().name()
    }

    /// Wire type; an IPv6 NAS address goes out as NAS-IPv6-Address
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            RequestAttribute::NasIpAddress(IpAddr::V4(_)) => AttributeType::NasIpAddress,
            RequestAttribute::NasIpAddress(IpAddr::V6(_)) => AttributeType::NasIpv6Address,
            RequestAttribute::UserName(_) => AttributeType::UserName,
            RequestAttribute::UserPassword(_) => AttributeType::UserPassword,
        }
    }
}

impl fmt::Debug for RequestAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestAttribute::NasIpAddress(ip) => write!(f, "({}, {})", self.name(), ip),
            RequestAttribute::UserName(name) => write!(f, "({}, {:?})", self.name(), name),
            RequestAttribute::UserPassword(_) => write!(f, "({}, <redacted>)", self.name()),
        }
    }
}

/// An Access-Request ready to be put on the wire
///
/// Built fresh for every `validate` call and immutable afterwards. It owns
/// copies of everything it took from the configuration, so swapping the
/// configuration cannot change a request already in flight.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessRequest {
    secret: Vec<u8>,
    identifier: u8,
    attributes: Vec<RequestAttribute>,
    message_authenticator: bool,
}

impl AccessRequest {
    /// Build the request for one credential check
    ///
    /// Attributes are NAS-IP-Address, User-Name and User-Password, in that
    /// order. Fails when either credential is too long to encode.
    pub fn build(
        user_name: &str,
        user_password: &str,
        config: &AuthConfig,
        identifier: u8,
    ) -> Result<Self, RequestError> {
        if user_name.len() > Attribute::MAX_VALUE_LENGTH {
            return Err(RequestError::UserNameTooLong(user_name.len()));
        }
        if user_password.len() > MAX_PASSWORD_LENGTH {
            return Err(RequestError::PasswordTooLong(user_password.len()));
        }

        Ok(AccessRequest {
            secret: config.secret.as_bytes().to_vec(),
            identifier,
            attributes: vec![
                RequestAttribute::NasIpAddress(config.ip_address),
                RequestAttribute::UserName(user_name.to_string()),
                RequestAttribute::UserPassword(user_password.to_string()),
            ],
            message_authenticator: config.require_message_authenticator,
        })
    }

    pub fn code(&self) -> Code {
        Code::AccessRequest
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn attributes(&self) -> &[RequestAttribute] {
        &self.attributes
    }

    /// Whether the encoded packet carries a Message-Authenticator
    pub fn message_authenticator(&self) -> bool {
        self.message_authenticator
    }

    /// Our own address as carried in NAS-IP-Address / NAS-IPv6-Address
    pub fn nas_address(&self) -> Option<IpAddr> {
        self.attributes.iter().find_map(|a| match a {
            RequestAttribute::NasIpAddress(ip) => Some(*ip),
            _ => None,
        })
    }

    pub fn user_name(&self) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a {
            RequestAttribute::UserName(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Debug for AccessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessRequest")
            .field("code", &self.code().name())
            .field("secret", &"<redacted>")
            .field("identifier", &self.identifier)
            .field("attributes", &self.attributes)
            .field("message_authenticator", &self.message_authenticator)
            .finish()
    }
}
