//! Request/Response Authenticators and User-Password hiding (RFC 2865)

use crate::packet::{Packet, PacketError};
use rand::Rng;

/// RFC 2865 Section 5.2 caps User-Password at 128 octets
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut authenticator = [0u8; 16];
    rand::rng().fill(&mut authenticator);
    authenticator
}

/// Calculate a Response Authenticator per RFC 2865 Section 3
///
/// `MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)`
///
/// The `authenticator` field of `packet` is ignored.
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let mut data = packet.encode()?;
    data[4..Packet::HEADER_SIZE].copy_from_slice(request_authenticator);
    data.extend_from_slice(secret);
    Ok(md5::compute(&data).0)
}

/// Verify the Response Authenticator of raw response bytes
///
/// Works on the datagram as received so that attributes this crate does not
/// understand are hashed exactly as the server sent them.
pub fn verify_response_authenticator(
    response: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    if response.len() < Packet::HEADER_SIZE {
        return false;
    }
    let length = u16::from_be_bytes([response[2], response[3]]) as usize;
    if length < Packet::HEADER_SIZE || length > response.len() {
        return false;
    }

    let mut context = md5::Context::new();
    context.consume(&response[..4]);
    context.consume(request_authenticator);
    context.consume(&response[Packet::HEADER_SIZE..length]);
    context.consume(secret);

    context.compute().0 == response[4..Packet::HEADER_SIZE]
}

/// Hide a User-Password value per RFC 2865 Section 5.2
///
/// The password is null-padded to a multiple of 16 octets. Block `i` is
/// XORed with `MD5(secret + c(i-1))`, where `c(0)` is the Request
/// Authenticator and `c(i)` the previous ciphertext block.
pub fn encrypt_user_password(
    password: &str,
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    let plain = password.as_bytes();
    if plain.len() > MAX_PASSWORD_LENGTH {
        return Err(PacketError::PasswordTooLong(plain.len()));
    }

    // An empty password still occupies one block
    let padded_len = plain.len().div_ceil(16).max(1) * 16;
    let mut padded = plain.to_vec();
    padded.resize(padded_len, 0);

    let mut result = Vec::with_capacity(padded_len);
    let mut previous: [u8; 16] = *authenticator;

    for chunk in padded.chunks(16) {
        let key = block_key(secret, &previous);
        for (i, byte) in chunk.iter().enumerate() {
            previous[i] = byte ^ key[i];
        }
        result.extend_from_slice(&previous);
    }

    Ok(result)
}

/// Recover a hidden User-Password (the server side of [`encrypt_user_password`])
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PacketError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 {
        return Err(PacketError::AttributeError(format!(
            "Invalid hidden User-Password length: {}",
            encrypted.len()
        )));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous: &[u8] = authenticator;

    for chunk in encrypted.chunks(16) {
        let key = block_key(secret, previous);
        result.extend(chunk.iter().zip(key.iter()).map(|(c, k)| c ^ k));
        previous = chunk;
    }

    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result)
        .map_err(|e| PacketError::AttributeError(format!("Invalid UTF-8 in User-Password: {}", e)))
}

fn block_key(secret: &[u8], previous: &[u8]) -> [u8; 16] {
    let mut context = md5::Context::new();
    context.consume(secret);
    context.consume(previous);
    context.compute().0
}
