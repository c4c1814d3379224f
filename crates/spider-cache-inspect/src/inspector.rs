//! Inspection entry point tying an adapter to a server registry

use crate::enumerate::enumerate_keys;
use crate::error::Result;
use crate::item::{ItemReport, inspect_item};
use crate::keymap::{Keymap, SaltOffset, SiteFilter, decode};
use crate::mutate::{self, Identity};
use crate::registry::ServerRegistry;
use futures::future::join_all;
use spider_cache_protocol::{CacheAdapter, ServerEndpoint};
use tracing::debug;

/// How raw keys are turned into a [`Keymap`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Whether keys carry a salt segment
    pub salt: SaltOffset,
    /// Which sites to keep
    pub site_filter: SiteFilter,
}

/// Key inspection and cache maintenance over a set of servers
///
/// Nothing is cached between calls: every keymap is rebuilt from the live
/// servers, and mutations go straight to the adapter.
///
/// # Example
///
/// ```no_run
/// use spider_cache_inspect::{DecodeOptions, Inspector, StaticRegistry};
/// use spider_cache_protocol::{KeyScheme, MemcachedClient, ServerEndpoint};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let servers = vec![ServerEndpoint::new("127.0.0.1", 11211)];
/// let client = MemcachedClient::new(servers.clone(), KeyScheme::new());
/// let inspector = Inspector::new(client, StaticRegistry::new(servers), DecodeOptions::default());
///
/// for (server, keymap) in inspector.keymaps().await {
///     println!("{server}: {} groups", keymap?.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Inspector<A, R> {
    adapter: A,
    registry: R,
    options: DecodeOptions,
}

impl<A, R> Inspector<A, R>
where
    A: CacheAdapter,
    R: ServerRegistry,
{
    /// Create an inspector
    pub const fn new(adapter: A, registry: R, options: DecodeOptions) -> Self {
        Self {
            adapter,
            registry,
            options,
        }
    }

    /// The underlying cache adapter
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Decoding options in use
    pub const fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Snapshot of the configured servers
    pub fn servers(&self) -> Vec<ServerEndpoint> {
        self.registry.servers()
    }

    /// Every raw key on `server`
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be enumerated
    pub async fn keys(&self, server: &ServerEndpoint) -> Result<Vec<String>> {
        enumerate_keys(&self.adapter, server).await
    }

    /// Decoded keymap of `server`
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be enumerated
    pub async fn keymap(&self, server: &ServerEndpoint) -> Result<Keymap> {
        let keys = self.keys(server).await?;
        Ok(decode(&keys, self.options.salt, self.options.site_filter))
    }

    /// Keymaps of every registered server, enumerated concurrently.
    ///
    /// Results keep registry order; one server failing leaves the others
    /// untouched.
    pub async fn keymaps(&self) -> Vec<(ServerEndpoint, Result<Keymap>)> {
        let servers = self.servers();
        debug!("Building keymaps for {} servers", servers.len());

        let results = join_all(servers.iter().map(|server| self.keymap(server))).await;
        servers.into_iter().zip(results).collect()
    }

    /// Delete every raw key containing `"{group}:"` on every server
    pub async fn flush_group(&self, group: &str) -> usize {
        mutate::flush_group(&self.adapter, &self.servers(), group).await
    }

    /// Delete the listed keys of `group`
    pub async fn flush_group_keys<S: AsRef<str>>(&self, group: &str, keys: &[S]) -> usize {
        mutate::flush_group_keys(&self.adapter, group, keys).await
    }

    /// Remove one logical key
    pub async fn remove_key(&self, group: &str, key: &str) -> bool {
        mutate::remove_key(&self.adapter, group, key).await
    }

    /// Drop every per-user cache entry of `identity`
    pub async fn clear_identity_caches(&self, identity: &Identity) -> usize {
        mutate::clear_identity_caches(&self.adapter, identity).await
    }

    /// Look up and describe one logical item
    pub async fn inspect_item(&self, group: &str, key: &str) -> ItemReport {
        inspect_item(&self.adapter, group, key).await
    }
}
