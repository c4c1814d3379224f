//! A single memcached TCP connection speaking the ASCII protocol

use crate::error::{ProtocolError, Result};
use crate::response::{error_reply, parse_value_header};
use crate::types::{CachedItem, ServerEndpoint};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Terminator of multi-line replies
const END: &str = "END";

pub(crate) struct Connection {
    stream: BufReader<TcpStream>,
    read_timeout: Duration,
}

impl Connection {
    /// Open a connection, mapping any failure to a connection error.
    pub(crate) async fn open(
        server: &ServerEndpoint,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let address = server.address();
        debug!("Connecting to memcached at {address}");

        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout {
                host: server.host.clone(),
                port: server.port,
                timeout_secs: connect_timeout.as_secs(),
            })?
            .map_err(|_| ProtocolError::ConnectionFailed {
                host: server.host.clone(),
                port: server.port,
            })?;

        Ok(Self {
            stream: BufReader::new(stream),
            read_timeout,
        })
    }

    /// Write one command line; `\r\n` is appended.
    pub(crate) async fn send(&mut self, command: &str) -> Result<()> {
        trace!("Sending command: {command}");
        let stream = self.stream.get_mut();
        stream.write_all(command.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read one reply line without its line terminator.
    pub(crate) async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let n = tokio::time::timeout(self.read_timeout, self.stream.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        if n == 0 {
            return Err(ProtocolError::Parse(
                "connection closed before reply completed".to_string(),
            ));
        }

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Read reply lines up to (not including) the `END` terminator.
    ///
    /// An error reply in place of the first line fails the whole command.
    pub(crate) async fn read_until_end(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == END {
                break;
            }
            if lines.is_empty()
                && let Some(err) = error_reply(&line)
            {
                return Err(err);
            }
            lines.push(line);
        }
        let count = lines.len();
        trace!("Read {count} reply lines");
        Ok(lines)
    }

    /// Read the reply to a single-key `get`.
    pub(crate) async fn read_value(&mut self) -> Result<Option<CachedItem>> {
        let header = self.read_line().await?;
        if header == END {
            return Ok(None);
        }
        if let Some(err) = error_reply(&header) {
            return Err(err);
        }

        let (key, flags, bytes) = parse_value_header(&header)?;

        // Data block is followed by its own \r\n
        let block = bytes
            .checked_add(2)
            .ok_or_else(|| ProtocolError::Parse(format!("VALUE length overflows: {bytes}")))?;
        let mut data = vec![0u8; block];
        tokio::time::timeout(self.read_timeout, self.stream.read_exact(&mut data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        data.truncate(bytes);

        let trailer = self.read_line().await?;
        if trailer != END {
            return Err(ProtocolError::Parse(format!(
                "expected END after value, got {trailer:?}"
            )));
        }

        Ok(Some(CachedItem { key, flags, data }))
    }
}
