//! Memcached TCP client implementation

use crate::adapter::CacheAdapter;
use crate::connection::Connection;
use crate::error::Result;
use crate::key_scheme::KeyScheme;
use crate::response::{CacheDump, parse_cachedump, parse_delete_reply, parse_slab_ids};
use crate::types::{CachedItem, ServerEndpoint, SlabId};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-line read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Memcached client for a pool of servers
///
/// Every command opens its own connection. Administrative commands target one
/// server explicitly; logical group/key operations are sent to the whole pool
/// because the inspection tool does not know which server the application's
/// hashing picked.
///
/// # Example
///
/// ```no_run
/// use spider_cache_protocol::{CacheAdapter, KeyScheme, MemcachedClient, ServerEndpoint};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = ServerEndpoint::new("127.0.0.1", 11211);
/// let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());
///
/// for slab in client.list_slabs(&server).await? {
///     let keys = client.dump_keys(&server, slab).await?;
///     println!("slab {slab}: {} keys", keys.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemcachedClient {
    pool: Vec<ServerEndpoint>,
    scheme: KeyScheme,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl MemcachedClient {
    /// Create a client for `pool` using `scheme` for logical keys
    #[must_use]
    pub fn new(pool: Vec<ServerEndpoint>, scheme: KeyScheme) -> Self {
        Self {
            pool,
            scheme,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-line read timeout
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Servers logical operations are sent to
    #[must_use]
    pub fn pool(&self) -> &[ServerEndpoint] {
        &self.pool
    }

    /// Key composition rules
    #[must_use]
    pub fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    async fn connect(&self, server: &ServerEndpoint) -> Result<Connection> {
        Connection::open(server, self.connect_timeout, self.read_timeout).await
    }

    /// Run `stats slabs` and return the slab ids found
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the server rejects the command
    #[instrument(skip(self, server), fields(server = %server))]
    pub async fn stats_slabs(&self, server: &ServerEndpoint) -> Result<Vec<SlabId>> {
        let mut conn = self.connect(server).await?;
        conn.send("stats slabs").await?;
        let lines = conn.read_until_end().await?;
        let slabs = parse_slab_ids(&lines);
        debug!("Found {} slabs", slabs.len());
        Ok(slabs)
    }

    /// Run `stats cachedump <slab> 0` and return every well-formed key
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the server rejects the command
    #[instrument(skip(self, server, slab), fields(server = %server, slab = %slab))]
    pub async fn cachedump(&self, server: &ServerEndpoint, slab: SlabId) -> Result<CacheDump> {
        let mut conn = self.connect(server).await?;
        conn.send(&format!("stats cachedump {slab} 0")).await?;
        let lines = conn.read_until_end().await?;
        let dump = parse_cachedump(&lines);
        debug!(
            "Dumped {} keys, skipped {} malformed records",
            dump.keys.len(),
            dump.skipped
        );
        Ok(dump)
    }

    /// Delete a raw key on one server
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the reply is not understood
    #[instrument(skip(self, server), fields(server = %server))]
    pub async fn delete_key(&self, server: &ServerEndpoint, raw_key: &str) -> Result<bool> {
        let mut conn = self.connect(server).await?;
        conn.send(&format!("delete {raw_key}")).await?;
        let reply = conn.read_line().await?;
        parse_delete_reply(&reply)
    }

    /// Fetch a raw key from one server
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or the reply is malformed
    #[instrument(skip(self, server), fields(server = %server))]
    pub async fn get_key(&self, server: &ServerEndpoint, raw_key: &str) -> Result<Option<CachedItem>> {
        let mut conn = self.connect(server).await?;
        conn.send(&format!("get {raw_key}")).await?;
        conn.read_value().await
    }
}

#[async_trait]
impl CacheAdapter for MemcachedClient {
    async fn list_slabs(&self, server: &ServerEndpoint) -> Result<Vec<SlabId>> {
        self.stats_slabs(server).await
    }

    async fn dump_keys(&self, server: &ServerEndpoint, slab: SlabId) -> Result<Vec<String>> {
        Ok(self.cachedump(server, slab).await?.keys)
    }

    async fn delete_raw(&self, server: &ServerEndpoint, raw_key: &str) -> Result<bool> {
        self.delete_key(server, raw_key).await
    }

    async fn delete(&self, group: &str, key: &str) -> Result<bool> {
        let raw_key = self.scheme.raw_key(group, key)?;

        let mut deleted = false;
        let mut failures = 0;
        let mut last_error = None;

        for server in &self.pool {
            match self.delete_key(server, &raw_key).await {
                Ok(true) => deleted = true,
                Ok(false) => {}
                Err(e) => {
                    warn!("Delete of {raw_key} on {server} failed: {e}");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !deleted && failures == self.pool.len() => Err(e),
            _ => Ok(deleted),
        }
    }

    async fn get(&self, group: &str, key: &str) -> Result<Option<CachedItem>> {
        let raw_key = self.scheme.raw_key(group, key)?;

        let mut failures = 0;
        let mut last_error = None;

        for server in &self.pool {
            match self.get_key(server, &raw_key).await {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => {}
                Err(e) => {
                    warn!("Get of {raw_key} on {server} failed: {e}");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if failures == self.pool.len() => Err(e),
            _ => Ok(None),
        }
    }

    fn full_key(&self, group: &str, key: &str) -> Result<String> {
        self.scheme.raw_key(group, key)
    }
}

impl Default for MemcachedClient {
    fn default() -> Self {
        Self::new(
            vec![ServerEndpoint::new("127.0.0.1", crate::types::DEFAULT_PORT)],
            KeyScheme::new(),
        )
    }
}
