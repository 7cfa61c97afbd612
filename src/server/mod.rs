//! Transport adapters for the Keyval daemon.
//!
//! Each adapter is handed a listener or socket owned by the caller and turns
//! inbound bytes into [`Query`](crate::protocol::Query)s for the shared
//! [`Dispatcher`](crate::protocol::Dispatcher).

pub mod http;
pub mod tcp;
pub mod udp;

pub use http::HttpServer;
pub use tcp::TcpServer;
pub use udp::UdpServer;

use std::fmt;
use crate::{Error, Result};

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_TCP_PORT: u16 = 8081;
pub const DEFAULT_UDP_PORT: u16 = 8082;

pub const DEFAULT_HTTP_ADDR: &str = "tcp://0.0.0.0:8080";
pub const DEFAULT_TCP_ADDR: &str = "tcp://0.0.0.0:8081";
pub const DEFAULT_UDP_ADDR: &str = "udp://0.0.0.0:8082";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
            Transport::Udp => write!(f, "udp"),
        }
    }
}

/// A parsed `[scheme://]host[:port]` listen or connect address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub transport: Transport,
    /// `host:port`, ready for `bind`/`connect`.
    pub addr: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.addr)
    }
}

/// Parses an endpoint, filling in `transport` when there is no scheme and
/// `default_port` when there is no port. An empty host means all interfaces.
pub fn parse_endpoint(raw: &str, transport: Transport, default_port: u16) -> Result<Endpoint> {
    let invalid = || Error::InvalidEndpoint(raw.to_string());

    let (transport, rest) = match raw.split_once("://") {
        Some(("tcp", rest)) => (Transport::Tcp, rest),
        Some(("udp", rest)) => (Transport::Udp, rest),
        Some(_) => return Err(invalid()),
        None => (transport, raw),
    };
    if rest.is_empty() || rest.contains('/') {
        return Err(invalid());
    }

    // Bracketed IPv6 hosts carry their own colons.
    let (host, port) = if let Some(stripped) = rest.strip_prefix('[') {
        let (host, tail) = stripped.split_once(']').ok_or_else(invalid)?;
        match tail {
            "" => (format!("[{}]", host), None),
            _ => (format!("[{}]", host), Some(tail.strip_prefix(':').ok_or_else(invalid)?)),
        }
    } else {
        match rest.rsplit_once(':') {
            Some((host, port)) => (host.to_string(), Some(port)),
            None => (rest.to_string(), None),
        }
    };

    let port = match port {
        Some(port) => port.parse::<u16>().map_err(|_| invalid())?,
        None => default_port,
    };
    let host = if host.is_empty() { "0.0.0.0".to_string() } else { host };

    Ok(Endpoint { transport, addr: format!("{}:{}", host, port) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let ep = parse_endpoint(DEFAULT_UDP_ADDR, Transport::Tcp, DEFAULT_TCP_PORT).unwrap();
        assert_eq!(ep, Endpoint { transport: Transport::Udp, addr: "0.0.0.0:8082".into() });
        assert_eq!(ep.to_string(), DEFAULT_UDP_ADDR);

        let ep = parse_endpoint("localhost", Transport::Tcp, DEFAULT_TCP_PORT).unwrap();
        assert_eq!(ep.addr, "localhost:8081");

        let ep = parse_endpoint(":9000", Transport::Udp, DEFAULT_UDP_PORT).unwrap();
        assert_eq!(ep, Endpoint { transport: Transport::Udp, addr: "0.0.0.0:9000".into() });
    }

    #[test]
    fn test_parse_ipv6() {
        let ep = parse_endpoint("tcp://[::1]:7000", Transport::Udp, 1).unwrap();
        assert_eq!(ep, Endpoint { transport: Transport::Tcp, addr: "[::1]:7000".into() });
        assert_eq!(parse_endpoint("[::1]", Transport::Tcp, 80).unwrap().addr, "[::1]:80");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let garbage = [
            "", "http://host:1", "tcp://", "host:notaport", "host:70000", "[::1", "[::1]x", "tcp://a/b",
        ];
        for raw in garbage {
            assert!(parse_endpoint(raw, Transport::Tcp, 1).is_err(), "{} should be rejected", raw);
        }
    }
}
