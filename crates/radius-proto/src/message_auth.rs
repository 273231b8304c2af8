//! Message-Authenticator Support (RFC 2869 / RFC 3579)
//!
//! HMAC-MD5 keyed with the shared secret over the whole packet, with the
//! Message-Authenticator value zeroed during calculation. For Access-Request
//! the header carries the Request Authenticator. For responses the header
//! is rewritten to the *Request* Authenticator of the request being answered
//! before hashing (RFC 3579 Section 3.2).

use crate::attributes::{Attribute, AttributeType};
use crate::packet::{Packet, PacketError};
use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

/// HMAC-MD5 of `packet_bytes` keyed with `secret`
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(packet_bytes);

    let mut output = [0u8; 16];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Encode `packet` with a trailing Message-Authenticator filled in
///
/// Any Message-Authenticator already present on `packet` is replaced.
pub fn encode_with_message_authenticator(
    packet: &Packet,
    secret: &[u8],
) -> Result<Vec<u8>, PacketError> {
    let mut signed = packet.clone();
    signed
        .attributes
        .retain(|a| a.attr_type != AttributeType::MessageAuthenticator.as_u8());
    signed.add_attribute(Attribute::new(
        AttributeType::MessageAuthenticator,
        vec![0u8; 16],
    )?);

    let mut bytes = signed.encode()?;
    let offset = bytes.len() - 16;
    let mac = calculate_message_authenticator(&bytes, secret);
    bytes[offset..].copy_from_slice(&mac);
    Ok(bytes)
}

/// Byte offset of the first Message-Authenticator value in raw packet bytes
pub fn find_message_authenticator(packet_bytes: &[u8]) -> Option<usize> {
    if packet_bytes.len() < Packet::HEADER_SIZE {
        return None;
    }
    let length = (u16::from_be_bytes([packet_bytes[2], packet_bytes[3]]) as usize)
        .min(packet_bytes.len());

    let mut pos = Packet::HEADER_SIZE;
    while pos + Attribute::HEADER_LENGTH <= length {
        let attr_type = packet_bytes[pos];
        let attr_len = packet_bytes[pos + 1] as usize;
        if attr_len < Attribute::HEADER_LENGTH || pos + attr_len > length {
            return None;
        }
        if attr_type == AttributeType::MessageAuthenticator.as_u8() {
            return (attr_len == Attribute::HEADER_LENGTH + 16)
                .then_some(pos + Attribute::HEADER_LENGTH);
        }
        pos += attr_len;
    }
    None
}

/// Verify the Message-Authenticator of a request as received
pub fn verify_message_authenticator(
    packet_bytes: &[u8],
    secret: &[u8],
    message_auth_offset: usize,
) -> bool {
    if message_auth_offset + 16 > packet_bytes.len() {
        return false;
    }

    let mut copy = packet_bytes.to_vec();
    copy[message_auth_offset..message_auth_offset + 16].fill(0);

    calculate_message_authenticator(&copy, secret)
        == packet_bytes[message_auth_offset..message_auth_offset + 16]
}

/// Verify the Message-Authenticator of a response
///
/// Returns `None` when the response carries no Message-Authenticator.
pub fn verify_response_message_authenticator(
    response_bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Option<bool> {
    let offset = find_message_authenticator(response_bytes)?;

    let mut copy = response_bytes.to_vec();
    copy[4..Packet::HEADER_SIZE].copy_from_slice(request_authenticator);
    Some(verify_message_authenticator(&copy, secret, offset))
}
