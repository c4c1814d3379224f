//! Key discovery and cache maintenance for memcached-backed object caches
//!
//! Memcached has no "list all keys" command. This crate walks a server's slab
//! classes to recover every raw key, decodes those keys back into the
//! `(site, group, key)` structure the owning application used to build them,
//! and offers the maintenance operations built on top of that view:
//!
//! - [`Inspector::keymap`] / [`Inspector::keymaps`]: grouped view of a server's keys
//! - [`Inspector::flush_group`]: delete every key of a group on every server
//! - [`Inspector::remove_key`]: delete one logical key
//! - [`Inspector::clear_identity_caches`]: drop all cached copies of a user
//! - [`Inspector::inspect_item`]: look at one stored value
//!
//! Externally supplied group and key names pass through [`sanitize`] before
//! they reach the cache.
//!
//! # Example
//!
//! ```
//! use spider_cache_inspect::keymap::{SaltOffset, SiteFilter, SiteScope, decode};
//!
//! let keymap = decode(
//!     ["salt:options:siteurl", "salt:3:posts:1", "salt:3:posts:2"],
//!     SaltOffset::Salted,
//!     SiteFilter::Site(3),
//! );
//!
//! for entry in &keymap {
//!     println!("{} {} {:?}", entry.site_scope, entry.group, entry.keys);
//! }
//! assert_eq!(keymap.get(SiteScope::Site(3), "posts").unwrap().keys, ["1", "2"]);
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod enumerate;
pub mod error;
pub mod inspector;
pub mod item;
pub mod keymap;
pub mod mutate;
pub mod output;
pub mod registry;
pub mod sanitize;

#[cfg(test)]
mod test_support;

pub use config::InspectConfig;
pub use enumerate::enumerate_keys;
pub use error::{ConfigError, InspectError, Result};
pub use inspector::{DecodeOptions, Inspector};
pub use item::{ItemReport, ItemStatus};
pub use keymap::{GroupEntry, Keymap, SaltOffset, SiteFilter, SiteScope, decode};
pub use mutate::Identity;
pub use registry::{ServerRegistry, StaticRegistry};
pub use sanitize::sanitize;
