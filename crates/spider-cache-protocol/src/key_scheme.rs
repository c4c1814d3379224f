//! Raw key construction for logical (group, key) pairs
//!
//! The owning application stores every entry under
//! `[salt:][site:]group:key`. The site prefix is only applied to groups that
//! are not shared across sites, and only when the deployment is multi-site.

use crate::error::{ProtocolError, Result};
use std::collections::BTreeSet;

/// Longest key memcached accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// Describes how the application composes raw cache keys
///
/// # Example
///
/// ```
/// use spider_cache_protocol::KeyScheme;
///
/// let scheme = KeyScheme::new()
///     .with_salt("s1")
///     .with_site_id(3)
///     .with_global_groups(["users"]);
///
/// assert_eq!(scheme.raw_key("posts", "42").unwrap(), "s1:3:posts:42");
/// assert_eq!(scheme.raw_key("users", "7").unwrap(), "s1:users:7");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyScheme {
    salt: Option<String>,
    site_id: Option<u64>,
    global_groups: BTreeSet<String>,
}

impl KeyScheme {
    /// A scheme with no salt, no site prefix and no global groups
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every key with a salt segment
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        let salt = salt.into();
        self.salt = (!salt.is_empty()).then_some(salt);
        self
    }

    /// Prefix non-global groups with this site id
    #[must_use]
    pub fn with_site_id(mut self, site_id: u64) -> Self {
        self.site_id = Some(site_id);
        self
    }

    /// Groups that are shared between sites and never site-prefixed
    #[must_use]
    pub fn with_global_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Salt segment, if configured
    #[must_use]
    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref()
    }

    /// Site id used for non-global groups, if configured
    #[must_use]
    pub fn site_id(&self) -> Option<u64> {
        self.site_id
    }

    /// Whether `group` is shared between sites
    #[must_use]
    pub fn is_global(&self, group: &str) -> bool {
        self.global_groups.contains(group)
    }

    /// Compose the raw server key for a logical entry.
    ///
    /// Whitespace is removed because memcached keys cannot contain it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidKey`] if the composed key is longer
    /// than [`MAX_KEY_LENGTH`] bytes.
    pub fn raw_key(&self, group: &str, key: &str) -> Result<String> {
        let mut raw = String::new();

        if let Some(salt) = &self.salt {
            raw.push_str(salt);
            raw.push(':');
        }

        if let Some(site_id) = self.site_id
            && !self.is_global(group)
        {
            raw.push_str(&site_id.to_string());
            raw.push(':');
        }

        raw.push_str(group);
        raw.push(':');
        raw.push_str(key);

        raw.retain(|c| !c.is_whitespace() && !c.is_control());

        if raw.len() > MAX_KEY_LENGTH {
            return Err(ProtocolError::InvalidKey(format!(
                "{} bytes exceeds the {MAX_KEY_LENGTH} byte limit",
                raw.len()
            )));
        }

        Ok(raw)
    }
}
