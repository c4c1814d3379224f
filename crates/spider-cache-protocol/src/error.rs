//! Error types for the memcached protocol client
//!
//! # Example
//!
//! ```
//! use spider_cache_protocol::{ProtocolError, ServerEndpoint};
//! use std::str::FromStr;
//!
//! let err = ServerEndpoint::from_str("cache-1:notaport").unwrap_err();
//! assert!(matches!(err, ProtocolError::InvalidEndpoint(_)));
//! assert!(!err.is_connection());
//! ```

use thiserror::Error;

/// Error types that can occur when talking to a memcached server
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// IO error occurred on an established connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to connect to the memcached server
    #[error("Connection failed to {host}:{port}")]
    ConnectionFailed {
        /// The hostname that failed to connect
        host: String,
        /// The port number that failed to connect
        port: u16,
    },

    /// Connection timed out
    #[error("Connection timed out after {timeout_secs}s to {host}:{port}")]
    ConnectionTimeout {
        /// The hostname that timed out
        host: String,
        /// The port number that timed out
        port: u16,
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// The server did not answer within the read timeout
    #[error("Timed out waiting for server reply")]
    Timeout,

    /// The server answered with `ERROR`, `CLIENT_ERROR` or `SERVER_ERROR`
    #[error("Server error: {0}")]
    Server(String),

    /// Reply did not follow the expected framing
    #[error("Parse error: {0}")]
    Parse(String),

    /// A key that memcached would refuse
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Endpoint string could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ProtocolError {
    /// Whether the error means the server could not be reached at all.
    ///
    /// Callers use this to tell an unreachable server apart from a garbled
    /// reply on one command.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::ConnectionTimeout { .. }
        )
    }
}

/// Result type alias using the protocol error type
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::ConnectionFailed {
            host: "cache-1".to_string(),
            port: 11211,
        };
        assert_eq!(err.to_string(), "Connection failed to cache-1:11211");

        let err = ProtocolError::ConnectionTimeout {
            host: "cache-1".to_string(),
            port: 11211,
            timeout_secs: 5,
        };
        assert_eq!(
            err.to_string(),
            "Connection timed out after 5s to cache-1:11211"
        );

        let err = ProtocolError::Server("CLIENT_ERROR bad command line format".to_string());
        assert_eq!(
            err.to_string(),
            "Server error: CLIENT_ERROR bad command line format"
        );

        let err = ProtocolError::Timeout;
        assert_eq!(err.to_string(), "Timed out waiting for server reply");
    }

    #[test]
    fn test_is_connection() {
        assert!(
            ProtocolError::ConnectionFailed {
                host: "h".to_string(),
                port: 1,
            }
            .is_connection()
        );
        assert!(!ProtocolError::Timeout.is_connection());
        assert!(!ProtocolError::Parse("x".to_string()).is_connection());
    }

    #[test]
    fn test_error_from_io() {
        use std::io::{Error as IoError, ErrorKind};

        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe");
        let err: ProtocolError = io_err.into();

        match err {
            ProtocolError::Io(_) => {}
            _ => panic!("Expected ProtocolError::Io variant"),
        }
    }
}
