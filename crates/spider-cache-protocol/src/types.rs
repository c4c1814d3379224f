//! Type definitions for the memcached client

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default memcached port, used when an endpoint string omits one
pub const DEFAULT_PORT: u16 = 11211;

/// A memcached server address
///
/// # Example
///
/// ```
/// use spider_cache_protocol::ServerEndpoint;
///
/// let server: ServerEndpoint = "10.0.0.5".parse().unwrap();
/// assert_eq!(server.port, 11211);
/// assert_eq!(server.to_string(), "10.0.0.5:11211");
///
/// let server: ServerEndpoint = "[::1]:11311".parse().unwrap();
/// assert_eq!(server.host, "::1");
/// assert_eq!(server.port, 11311);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerEndpoint {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl ServerEndpoint {
    /// Create an endpoint from a host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The `host:port` string passed to the socket layer
    #[must_use]
    pub fn address(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ServerEndpoint {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ProtocolError::InvalidEndpoint(s.to_string());

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            // Bracketed IPv6, optionally followed by :port
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail.strip_prefix(':') {
                Some(port) => port.parse::<u16>().map_err(|_| invalid())?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(invalid()),
            };
            (host, port)
        } else if let Some((host, port)) = trimmed.rsplit_once(':') {
            (host, port.parse::<u16>().map_err(|_| invalid())?)
        } else {
            (trimmed, DEFAULT_PORT)
        };

        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(host, port))
    }
}

/// Identifier of a memcached slab class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlabId(pub u32);

impl fmt::Display for SlabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value returned by `get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedItem {
    /// The raw key the server answered for
    pub key: String,
    /// Opaque client flags stored with the value
    pub flags: u32,
    /// Value bytes
    pub data: Vec<u8>,
}

impl CachedItem {
    /// Value bytes decoded as UTF-8, replacing invalid sequences
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
