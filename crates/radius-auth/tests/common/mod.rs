//! In-process mock RADIUS server for integration tests

#![allow(dead_code)]

use radius_auth::{AuthConfig, HostConfig};
use radius_proto::{
    Attribute, AttributeType, Code, Packet, calculate_response_authenticator,
    decrypt_user_password, encode_with_message_authenticator, find_message_authenticator,
    verify_message_authenticator,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const SECRET: &str = "s3cret";

/// How the mock answers
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Access-Accept for any credentials
    Accept,
    /// Access-Reject for any credentials
    Reject,
    /// Access-Challenge for any credentials
    Challenge,
    /// Never answer
    Silent,
    /// Ignore the first `n` datagrams, then accept
    DropFirst(usize),
    /// Send an uncorrelated reply and a forged one before the real Accept
    NoiseThenAccept,
    /// Accept only matching username/password pairs
    Users(HashMap<String, String>),
}

pub struct MockRadiusServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    handle: JoinHandle<()>,
}

impl MockRadiusServer {
    pub async fn start(behavior: Behavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = socket.local_addr().expect("Failed to get mock address");
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let data = buf[..len].to_vec();
                let seen = {
                    let mut log = log.lock().unwrap();
                    log.push(data.clone());
                    log.len()
                };

                let Ok(request) = Packet::decode(&data) else {
                    continue;
                };

                for reply in replies(&behavior, &request, &data, seen) {
                    socket.send_to(&reply, from).await.expect("Failed to reply");
                }
            }
        });

        MockRadiusServer {
            addr,
            received,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Raw datagrams received so far
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl Drop for MockRadiusServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn replies(behavior: &Behavior, request: &Packet, raw: &[u8], seen: usize) -> Vec<Vec<u8>> {
    match behavior {
        Behavior::Accept => vec![answer(request, raw, Code::AccessAccept, SECRET)],
        Behavior::Reject => vec![answer(request, raw, Code::AccessReject, SECRET)],
        Behavior::Challenge => vec![answer(request, raw, Code::AccessChallenge, SECRET)],
        Behavior::Silent => vec![],
        Behavior::DropFirst(n) if seen <= *n => vec![],
        Behavior::DropFirst(_) => vec![answer(request, raw, Code::AccessAccept, SECRET)],
        Behavior::NoiseThenAccept => {
            let mut other = request.clone();
            other.identifier = request.identifier.wrapping_add(1);
            vec![
                answer(&other, raw, Code::AccessAccept, SECRET),
                answer(request, raw, Code::AccessAccept, "not-the-secret"),
                vec![0xde, 0xad, 0xbe, 0xef],
                answer(request, raw, Code::AccessAccept, SECRET),
            ]
        }
        Behavior::Users(users) => {
            let code = if credentials_match(users, request) {
                Code::AccessAccept
            } else {
                Code::AccessReject
            };
            vec![answer(request, raw, code, SECRET)]
        }
    }
}

fn credentials_match(users: &HashMap<String, String>, request: &Packet) -> bool {
    let name = request
        .find_attribute(AttributeType::UserName)
        .and_then(|a| a.as_string().ok());
    let password = request
        .find_attribute(AttributeType::UserPassword)
        .and_then(|a| {
            decrypt_user_password(&a.value, SECRET.as_bytes(), &request.authenticator).ok()
        });

    match (name, password) {
        (Some(name), Some(password)) => users.get(&name) == Some(&password),
        _ => false,
    }
}

/// Signed response; mirrors a Message-Authenticator when the request had a valid one
fn answer(request: &Packet, raw: &[u8], code: Code, secret: &str) -> Vec<u8> {
    let secret = secret.as_bytes();
    let mut response = Packet::new(code, request.identifier, request.authenticator);
    if code == Code::AccessReject {
        response.add_attribute(
            Attribute::string(AttributeType::ReplyMessage, "Authentication failed").unwrap(),
        );
    }

    let signed_request = find_message_authenticator(raw)
        .is_some_and(|offset| verify_message_authenticator(raw, secret, offset));
    if signed_request {
        let bytes = encode_with_message_authenticator(&response, secret).unwrap();
        response = Packet::decode(&bytes).unwrap();
    }

    response.authenticator =
        calculate_response_authenticator(&response, &request.authenticator, secret).unwrap();
    response.encode().unwrap()
}

/// Configuration pointing at a mock on localhost
pub fn mock_config(port: u16, timeout_ms: u64, retries: u32) -> AuthConfig {
    let mut config = AuthConfig::new(
        "127.0.0.1".parse().unwrap(),
        SECRET,
        HostConfig::Pool(vec!["127.0.0.1".to_string()]),
    );
    config.options.port = port;
    config.options.timeout = timeout_ms;
    config.options.retries = retries;
    config
}

/// A localhost UDP port with nothing bound to it
pub async fn unused_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.local_addr().unwrap().port()
}
