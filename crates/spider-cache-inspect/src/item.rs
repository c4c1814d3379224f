//! Single item lookup with a human readable report

use crate::sanitize::sanitize;
use serde::Serialize;
use spider_cache_protocol::CacheAdapter;
use std::fmt;
use tracing::debug;

/// Outcome of looking up one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ItemStatus {
    /// The item exists
    Found,
    /// No server holds the item
    NotFound,
    /// The lookup itself failed
    Failed(String),
}

impl ItemStatus {
    /// Memcached style result code
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Found => 0,
            Self::NotFound => 16,
            Self::Failed(_) => -1,
        }
    }

    /// Short description of the code
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Found => "SUCCESS",
            Self::NotFound => "NOT FOUND",
            Self::Failed(message) => message,
        }
    }
}

/// Everything known about one logical item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Sanitized key
    pub key: String,
    /// Sanitized group
    pub group: String,
    /// Raw server key, empty if it could not be built
    pub full_key: String,
    /// Lookup outcome
    #[serde(flatten)]
    pub status: ItemStatus,
    /// Stored value as text
    pub value: Option<String>,
}

impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Key:     {}", self.key)?;
        writeln!(f, "Group:   {}", self.group)?;
        writeln!(f, "Full:    {}", self.full_key)?;
        writeln!(
            f,
            "Code:    {} - {}",
            self.status.code(),
            self.status.message()
        )?;
        write!(f, "Value:   {}", self.value.as_deref().unwrap_or("ERR"))
    }
}

/// Look up `group`/`key` through the logical get.
pub async fn inspect_item<A>(adapter: &A, group: &str, key: &str) -> ItemReport
where
    A: CacheAdapter + ?Sized,
{
    let group = sanitize(group);
    let key = sanitize(key);

    let full_key = match adapter.full_key(&group, &key) {
        Ok(full_key) => full_key,
        Err(e) => {
            return ItemReport {
                key,
                group,
                full_key: String::new(),
                status: ItemStatus::Failed(e.to_string()),
                value: None,
            };
        }
    };

    let (status, value) = match adapter.get(&group, &key).await {
        Ok(Some(item)) => (ItemStatus::Found, Some(item.text())),
        Ok(None) => (ItemStatus::NotFound, None),
        Err(e) => (ItemStatus::Failed(e.to_string()), None),
    };
    debug!("Lookup of {full_key}: {}", status.message());

    ItemReport {
        key,
        group,
        full_key,
        status,
        value,
    }
}
