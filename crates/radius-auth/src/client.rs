//! UDP request/response exchange with a RADIUS server
//!
//! One exchange sends the same encoded Access-Request up to `1 + retries`
//! times. Each attempt waits at most `timeout` for a correlated answer.
//! A datagram counts as the answer only when all of these hold:
//!
//! - it comes from the address the request was sent to
//! - it decodes as an Access-Accept, -Reject or -Challenge
//! - its identifier matches the request
//! - its Response Authenticator checks out against the shared secret
//! - its Message-Authenticator, when present, checks out too
//!
//! Anything else is dropped and the attempt keeps waiting for its deadline.

use crate::error::TransportError;
use crate::request::{AccessRequest, RequestAttribute};
use crate::response::AuthResponse;
use async_trait::async_trait;
use radius_proto::{
    Attribute, AttributeType, Code, Packet, PacketError, encode_with_message_authenticator,
    encrypt_user_password, generate_request_authenticator, verify_response_authenticator,
    verify_response_message_authenticator,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, warn};

/// Connection parameters for one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// IP literal or DNS name of the chosen server
    pub host: String,
    pub port: u16,
    /// Deadline for each attempt
    pub timeout: Duration,
    /// Extra attempts after the first one times out
    pub retries: u32,
}

impl ClientOptions {
    /// Total number of sends before giving up
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// `host:port`, bracketing bare IPv6 literals
    pub fn target(&self) -> String {
        let host = self.host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

/// Sends an Access-Request and waits for the verdict
///
/// Only Access-Accept and Access-Reject are successful outcomes; a Reject
/// is not an error.
#[async_trait]
pub trait RadiusExchange: Send + Sync {
    async fn exchange(
        &self,
        request: &AccessRequest,
        options: &ClientOptions,
    ) -> Result<AuthResponse, TransportError>;
}

/// Exchange counters
#[derive(Debug, Default)]
pub struct ExchangeStats {
    requests_sent: AtomicU64,
    responses_received: AtomicU64,
    timeouts: AtomicU64,
    discarded: AtomicU64,
}

impl ExchangeStats {
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    pub fn responses_received(&self) -> u64 {
        self.responses_received.load(Ordering::Relaxed)
    }

    /// Attempts that hit their deadline
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Datagrams dropped as uncorrelated or malformed
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Plain UDP exchange over an ephemeral socket per call
#[derive(Debug, Default)]
pub struct UdpExchange {
    stats: ExchangeStats,
}

impl UdpExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ExchangeStats {
        &self.stats
    }

    async fn await_response(
        &self,
        socket: &UdpSocket,
        target: SocketAddr,
        request: &AccessRequest,
        authenticator: &[u8; 16],
        host: &str,
    ) -> Result<AuthResponse, TransportError> {
        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];

        loop {
            let (len, from) = socket
                .recv_from(&mut buf)
                .await
                .map_err(|source| TransportError::Io {
                    host: host.to_string(),
                    source,
                })?;

            if from != target {
                ExchangeStats::record(&self.stats.discarded);
                debug!(host = %host, from = %from, "Dropping datagram from unexpected source");
                continue;
            }

            match correlate(&buf[..len], request, authenticator) {
                Ok(packet) => {
                    ExchangeStats::record(&self.stats.responses_received);
                    return classify(packet, host);
                }
                Err(reason) => {
                    ExchangeStats::record(&self.stats.discarded);
                    debug!(host = %host, identifier = request.identifier(), reason, "Dropping uncorrelated datagram");
                }
            }
        }
    }
}

#[async_trait]
impl RadiusExchange for UdpExchange {
    async fn exchange(
        &self,
        request: &AccessRequest,
        options: &ClientOptions,
    ) -> Result<AuthResponse, TransportError> {
        let host = options.target();
        let prefer_ipv6 = request.nas_address().is_some_and(|ip| ip.is_ipv6());
        let target = resolve(options, prefer_ipv6).await?;

        let bind_addr: SocketAddr = if target.is_ipv4() {
            (IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0).into()
        } else {
            (IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| TransportError::Io {
                host: host.clone(),
                source,
            })?;

        // Encoded once: every retry is byte-for-byte the same request
        let authenticator = generate_request_authenticator();
        let datagram = encode_access_request(request, &authenticator)?;

        let attempts = options.attempts();
        for attempt in 1..=attempts {
            debug!(
                host = %host,
                identifier = request.identifier(),
                attempt = attempt,
                attempts = attempts,
                "Sending Access-Request"
            );

            socket
                .send_to(&datagram, target)
                .await
                .map_err(|source| TransportError::Io {
                    host: host.clone(),
                    source,
                })?;
            ExchangeStats::record(&self.stats.requests_sent);

            let wait = self.await_response(&socket, target, request, &authenticator, &host);
            match tokio::time::timeout(options.timeout, wait).await {
                Ok(result) => return result,
                Err(_) => {
                    ExchangeStats::record(&self.stats.timeouts);
                    debug!(
                        host = %host,
                        identifier = request.identifier(),
                        attempt = attempt,
                        timeout_ms = options.timeout.as_millis() as u64,
                        "Attempt timed out"
                    );
                }
            }
        }

        Err(TransportError::Timeout { host, attempts })
    }
}

/// Encode `request` with the given Request Authenticator
///
/// User-Password is hidden with the shared secret here. When the request
/// asks for it a Message-Authenticator is appended last.
pub fn encode_access_request(
    request: &AccessRequest,
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    let mut packet = Packet::new(request.code(), request.identifier(), *authenticator);

    for attr in request.attributes() {
        let attribute = match attr {
            RequestAttribute::NasIpAddress(IpAddr::V4(ip)) => {
                Attribute::ipv4(AttributeType::NasIpAddress, *ip)?
            }
            RequestAttribute::NasIpAddress(IpAddr::V6(ip)) => {
                Attribute::ipv6(AttributeType::NasIpv6Address, *ip)?
            }
            RequestAttribute::UserName(name) => {
                Attribute::string(AttributeType::UserName, name.as_str())?
            }
            RequestAttribute::UserPassword(password) => Attribute::new(
                AttributeType::UserPassword,
                encrypt_user_password(password, request.secret(), authenticator)?,
            )?,
        };
        packet.add_attribute(attribute);
    }

    if request.message_authenticator() {
        encode_with_message_authenticator(&packet, request.secret())
    } else {
        packet.encode()
    }
}

/// Resolve the target, preferring the address family of our NAS address
///
/// A name such as `localhost` may resolve to both `::1` and `127.0.0.1`.
/// The first address of the preferred family wins; the first address of
/// any family is used when there is none.
async fn resolve(options: &ClientOptions, prefer_ipv6: bool) -> Result<SocketAddr, TransportError> {
    let host = options
        .host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    let resolve_error = |source| TransportError::Resolve {
        host: options.target(),
        source,
    };

    let addrs = lookup_host((host, options.port))
        .await
        .map_err(resolve_error)?;

    pick_address(addrs, prefer_ipv6).ok_or_else(|| {
        resolve_error(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no addresses found",
        ))
    })
}

fn pick_address(
    addrs: impl IntoIterator<Item = SocketAddr>,
    prefer_ipv6: bool,
) -> Option<SocketAddr> {
    let mut first = None;
    for addr in addrs {
        if addr.is_ipv6() == prefer_ipv6 {
            return Some(addr);
        }
        first.get_or_insert(addr);
    }
    first
}

fn correlate(
    data: &[u8],
    request: &AccessRequest,
    authenticator: &[u8; 16],
) -> Result<Packet, &'static str> {
    let packet = Packet::decode(data).map_err(|_| "malformed packet")?;

    if !packet.code.is_access_response() {
        return Err("not an Access response");
    }

    if packet.identifier != request.identifier() {
        return Err("identifier mismatch");
    }

    if !verify_response_authenticator(data, authenticator, request.secret()) {
        warn!(
            identifier = packet.identifier,
            "Response Authenticator mismatch (wrong shared secret?)"
        );
        return Err("bad Response Authenticator");
    }

    if verify_response_message_authenticator(data, authenticator, request.secret()) == Some(false)
    {
        warn!(identifier = packet.identifier, "Message-Authenticator mismatch");
        return Err("bad Message-Authenticator");
    }

    Ok(packet)
}

fn classify(packet: Packet, host: &str) -> Result<AuthResponse, TransportError> {
    match packet.code {
        Code::AccessAccept | Code::AccessReject => {
            let response = AuthResponse {
                code: packet.code,
                identifier: packet.identifier,
                attributes: packet.attributes,
            };
            debug!(
                host = %host,
                code = %response.code,
                identifier = response.identifier,
                reply_message = ?response.reply_message(),
                "Response received"
            );
            Ok(response)
        }
        code => Err(TransportError::UnexpectedCode {
            host: host.to_string(),
            code,
        }),
    }
}
