//! Error types for cache inspection.
//!
//! Malformed records and failed deletes are never errors here: the first are
//! skipped during enumeration and the second are folded into counts by the
//! mutation operations. What remains is an unreachable server and bad
//! configuration.

use spider_cache_protocol::{ProtocolError, ServerEndpoint};
use thiserror::Error;

/// Errors surfaced by inspection operations.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The server could not be reached; no keys were produced for it
    #[error("Cannot reach cache server {server}: {source}")]
    Connection {
        /// Server that failed
        server: ServerEndpoint,
        /// Underlying protocol error
        #[source]
        source: ProtocolError,
    },

    /// The server was reached but refused to list its slabs
    #[error("Cache server {server} rejected slab listing: {source}")]
    SlabListing {
        /// Server that failed
        server: ServerEndpoint,
        /// Underlying protocol error
        #[source]
        source: ProtocolError,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl InspectError {
    /// Wrap a protocol failure on `server`, keeping connection failures distinct.
    pub(crate) fn from_protocol(server: &ServerEndpoint, source: ProtocolError) -> Self {
        if source.is_connection() {
            Self::Connection {
                server: server.clone(),
                source,
            }
        } else {
            Self::SlabListing {
                server: server.clone(),
                source,
            }
        }
    }

    /// Whether this is the unreachable-server case
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A timeout of zero seconds
    #[error("Invalid {name} timeout: must be at least 1 second")]
    InvalidTimeout {
        /// Which timeout
        name: &'static str,
    },

    /// The same server listed twice
    #[error("Duplicate server in list: {0}")]
    DuplicateServer(ServerEndpoint),

    /// Requested server is not part of the configured list
    #[error("Server {0} is not configured")]
    UnknownServer(ServerEndpoint),
}

/// Result type alias for inspection operations
pub type Result<T> = std::result::Result<T, InspectError>;
