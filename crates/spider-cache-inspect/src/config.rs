//! Inspection configuration.
//!
//! Every setting can come from a command-line flag or from a
//! `SPIDER_CACHE_*` environment variable:
//!
//! - `--servers` / `SPIDER_CACHE_SERVERS`: comma separated `host[:port]`
//! - `--salt` / `SPIDER_CACHE_SALT`: key salt of the owning application
//! - `--site-id` / `SPIDER_CACHE_SITE_ID`: current site
//! - `--global-groups` / `SPIDER_CACHE_GLOBAL_GROUPS`: groups shared by all sites
//! - `--connect-timeout` / `SPIDER_CACHE_CONNECT_TIMEOUT`
//! - `--read-timeout` / `SPIDER_CACHE_READ_TIMEOUT`

use crate::error::ConfigError;
use crate::inspector::DecodeOptions;
use crate::keymap::{SaltOffset, SiteFilter};
use crate::registry::StaticRegistry;
use clap::Args;
use spider_cache_protocol::{KeyScheme, MemcachedClient, ServerEndpoint};
use std::collections::HashSet;
use std::time::Duration;

/// Groups the owning application shares between sites
pub const DEFAULT_GLOBAL_GROUPS: &str = "users,userlogins,usermeta,user_meta,useremail,userslugs,\
     site-transient,site-options,blog-lookup,blog-details,site-details,rss,global-posts,\
     blog-id-cache,networks,sites";

/// Cache servers and key conventions of the owning application
#[derive(Debug, Clone, Args)]
pub struct InspectConfig {
    /// Cache servers, comma separated host[:port]
    #[arg(long, env = "SPIDER_CACHE_SERVERS", value_delimiter = ',', global = true)]
    pub servers: Vec<ServerEndpoint>,

    /// Salt prefixed to every key
    #[arg(long, env = "SPIDER_CACHE_SALT", global = true)]
    pub salt: Option<String>,

    /// Current site id; keys of other sites are hidden
    #[arg(long, env = "SPIDER_CACHE_SITE_ID", global = true)]
    pub site_id: Option<u64>,

    /// Groups stored without a site prefix
    #[arg(
        long,
        env = "SPIDER_CACHE_GLOBAL_GROUPS",
        value_delimiter = ',',
        default_value = DEFAULT_GLOBAL_GROUPS,
        global = true
    )]
    pub global_groups: Vec<String>,

    /// Connect timeout in seconds
    #[arg(long, env = "SPIDER_CACHE_CONNECT_TIMEOUT", default_value_t = 5, global = true)]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(long, env = "SPIDER_CACHE_READ_TIMEOUT", default_value_t = 10, global = true)]
    pub read_timeout: u64,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            salt: None,
            site_id: None,
            global_groups: DEFAULT_GLOBAL_GROUPS
                .split(',')
                .map(ToString::to_string)
                .collect(),
            connect_timeout: 5,
            read_timeout: 10,
        }
    }
}

impl InspectConfig {
    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - a timeout is zero
    /// - a server is listed twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout == 0 {
            return Err(ConfigError::InvalidTimeout { name: "connect" });
        }
        if self.read_timeout == 0 {
            return Err(ConfigError::InvalidTimeout { name: "read" });
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            if !seen.insert(server) {
                return Err(ConfigError::DuplicateServer(server.clone()));
            }
        }

        Ok(())
    }

    /// Salt, ignoring an empty value
    #[must_use]
    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref().filter(|s| !s.is_empty())
    }

    /// Key composition rules for logical operations
    #[must_use]
    pub fn key_scheme(&self) -> KeyScheme {
        let mut scheme = KeyScheme::new().with_global_groups(&self.global_groups);
        if let Some(salt) = self.salt() {
            scheme = scheme.with_salt(salt);
        }
        if let Some(site_id) = self.site_id {
            scheme = scheme.with_site_id(site_id);
        }
        scheme
    }

    /// Decoding options matching the key scheme
    #[must_use]
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            salt: SaltOffset::from(self.salt().is_some()),
            site_filter: self.site_id.map_or(SiteFilter::AllSites, SiteFilter::Site),
        }
    }

    /// Registry over the configured servers
    #[must_use]
    pub fn registry(&self) -> StaticRegistry {
        StaticRegistry::new(self.servers.clone())
    }

    /// Client for the configured pool
    #[must_use]
    pub fn client(&self) -> MemcachedClient {
        MemcachedClient::new(self.servers.clone(), self.key_scheme())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_read_timeout(Duration::from_secs(self.read_timeout))
    }

    /// Make sure `server` is one of the configured servers
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownServer` otherwise
    pub fn require_server(&self, server: &ServerEndpoint) -> Result<(), ConfigError> {
        if self.servers.contains(server) {
            Ok(())
        } else {
            Err(ConfigError::UnknownServer(server.clone()))
        }
    }
}
