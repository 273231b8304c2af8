//! Access-Accept / Access-Reject interpretation

use radius_proto::{Attribute, AttributeType, Code};

/// A correlated answer to an Access-Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub code: Code,
    pub identifier: u8,
    pub attributes: Vec<Attribute>,
}

impl AuthResponse {
    /// Reply-Message attributes, joined in packet order
    pub fn reply_message(&self) -> Option<String> {
        let parts: Vec<String> = self
            .attributes
            .iter()
            .filter(|a| a.kind() == Some(AttributeType::ReplyMessage))
            .filter_map(|a| a.as_string().ok())
            .collect();

        (!parts.is_empty()).then(|| parts.join(""))
    }
}

/// True only for Access-Accept; everything else is denied
pub fn is_authenticated(response: &AuthResponse) -> bool {
    response.code == Code::AccessAccept
}
