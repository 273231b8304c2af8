//! RADIUS client-side wire format
//!
//! The subset of RFC 2865, RFC 2869 and RFC 3162 a PAP authenticating
//! client needs to build an Access-Request and check the answer.
//!
//! # Features
//!
//! - Packet encoding and decoding (Access-Request / -Accept / -Reject / -Challenge)
//! - MD5-based User-Password hiding
//! - Request/Response Authenticator calculation
//! - Message-Authenticator (HMAC-MD5) signing and verification
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Packet, Code, Attribute, AttributeType};
//! use radius_proto::auth::{generate_request_authenticator, encrypt_user_password};
//!
//! let req_auth = generate_request_authenticator();
//! let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);
//!
//! packet.add_attribute(Attribute::string(AttributeType::UserName, "alice").unwrap());
//!
//! let hidden = encrypt_user_password("password", b"secret", &req_auth).unwrap();
//! packet.add_attribute(Attribute::new(AttributeType::UserPassword, hidden).unwrap());
//!
//! let bytes = packet.encode().unwrap();
//! assert_eq!(bytes[0], 1);
//! ```

pub mod attributes;
pub mod auth;
pub mod message_auth;
pub mod packet;

pub use attributes::{Attribute, AttributeType};
pub use auth::{
    MAX_PASSWORD_LENGTH, calculate_response_authenticator, decrypt_user_password,
    encrypt_user_password, generate_request_authenticator, verify_response_authenticator,
};
pub use message_auth::{
    calculate_message_authenticator, encode_with_message_authenticator,
    find_message_authenticator, verify_message_authenticator,
    verify_response_message_authenticator,
};
pub use packet::{Code, Packet, PacketError};
