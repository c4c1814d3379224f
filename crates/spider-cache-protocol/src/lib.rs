//! Memcached protocol client for Spider Cache
//!
//! This crate provides an async TCP client for the memcached ASCII protocol
//! with the administrative commands needed to discover every key a server
//! holds (`stats slabs`, `stats cachedump`), plus raw and logical deletes and
//! lookups.
//!
//! The [`CacheAdapter`] trait is the seam the inspection engine is written
//! against; [`MemcachedClient`] implements it.
//!
//! # Example
//!
//! ```no_run
//! use spider_cache_protocol::{CacheAdapter, KeyScheme, MemcachedClient, ServerEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server: ServerEndpoint = "127.0.0.1:11211".parse()?;
//!     let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());
//!
//!     let slabs = client.list_slabs(&server).await?;
//!     println!("{} slabs in use", slabs.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapter;
pub mod client;
mod connection;
pub mod error;
pub mod key_scheme;
pub mod response;
pub mod types;

pub use adapter::CacheAdapter;
pub use client::MemcachedClient;
pub use error::{ProtocolError, Result};
pub use key_scheme::KeyScheme;
pub use types::{CachedItem, DEFAULT_PORT, ServerEndpoint, SlabId};
