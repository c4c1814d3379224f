//! The cache client seam used by key inspection
//!
//! [`CacheAdapter`] is the minimum surface the inspection engine needs from a
//! cache client: administrative slab/key enumeration, raw deletes against a
//! specific server, and the ordinary group/key operations of the owning
//! application. [`MemcachedClient`](crate::MemcachedClient) is the production
//! implementation; tests substitute mocks.

use crate::error::Result;
use crate::types::{CachedItem, ServerEndpoint, SlabId};
use async_trait::async_trait;

/// Cache client abstraction
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// List the slab classes holding data on `server`
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable
    async fn list_slabs(&self, server: &ServerEndpoint) -> Result<Vec<SlabId>>;

    /// Dump the keys stored in one slab class of `server`
    ///
    /// Malformed records are skipped, never reported as errors.
    ///
    /// # Errors
    /// Returns an error if the server is unreachable or the reply is unusable
    async fn dump_keys(&self, server: &ServerEndpoint, slab: SlabId) -> Result<Vec<String>>;

    /// Delete a raw key on a specific server
    ///
    /// Returns `true` if the server removed the key.
    ///
    /// # Errors
    /// Returns an error if the command could not be completed
    async fn delete_raw(&self, server: &ServerEndpoint, raw_key: &str) -> Result<bool>;

    /// Delete a logical entry of the owning application
    ///
    /// # Errors
    /// Returns an error if the key cannot be built or no server could be asked
    async fn delete(&self, group: &str, key: &str) -> Result<bool>;

    /// Fetch a logical entry of the owning application
    ///
    /// # Errors
    /// Returns an error if the key cannot be built or no server could be asked
    async fn get(&self, group: &str, key: &str) -> Result<Option<CachedItem>>;

    /// The raw server key a logical entry is stored under
    ///
    /// # Errors
    /// Returns an error if the key cannot be built
    fn full_key(&self, group: &str, key: &str) -> Result<String>;
}
