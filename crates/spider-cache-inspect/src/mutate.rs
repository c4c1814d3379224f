//! Group flushes, single key removal and identity cache clearing.
//!
//! Mutations never fail: a delete that errors or finds nothing simply does not
//! count towards the returned total.

use crate::enumerate::enumerate_keys;
use crate::sanitize::sanitize;
use serde::Serialize;
use spider_cache_protocol::{CacheAdapter, ServerEndpoint};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Groups holding per-user data, with the identity field each is keyed by
const IDENTITY_GROUPS: [(&str, IdentityField); 5] = [
    ("users", IdentityField::Id),
    ("user_meta", IdentityField::Id),
    ("userlogins", IdentityField::Login),
    ("userslugs", IdentityField::Slug),
    ("useremail", IdentityField::Email),
];

#[derive(Debug, Clone, Copy)]
enum IdentityField {
    Id,
    Login,
    Slug,
    Email,
}

/// A resolved user whose cached copies should be dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Numeric user id
    pub id: u64,
    /// Login name
    pub login: String,
    /// Normalized name used in URLs
    pub slug: String,
    /// Email address
    pub email: String,
}

impl Identity {
    fn field(&self, field: IdentityField) -> String {
        match field {
            IdentityField::Id => self.id.to_string(),
            IdentityField::Login => self.login.clone(),
            IdentityField::Slug => self.slug.clone(),
            IdentityField::Email => self.email.clone(),
        }
    }
}

/// Delete every raw key containing `"{group}:"` on each of `servers`.
///
/// This is a substring match on raw keys, so flushing `posts` also removes
/// `oldposts:*` and the `posts` keys of every site. The group is sanitized first; an empty result flushes
/// nothing. Servers that cannot be enumerated are skipped.
///
/// Returns the number of keys the servers reported as deleted.
pub async fn flush_group<A>(adapter: &A, servers: &[ServerEndpoint], group: &str) -> usize
where
    A: CacheAdapter + ?Sized,
{
    let group = sanitize(group);
    if group.is_empty() {
        warn!("Refusing to flush an empty group name");
        return 0;
    }
    let pattern = format!("{group}:");

    let mut count = 0;
    for server in servers {
        let keys = match enumerate_keys(adapter, server).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Skipping {server} while flushing {group}: {e}");
                continue;
            }
        };

        let mut seen = HashSet::new();
        for raw in keys.iter().filter(|k| k.contains(&pattern)) {
            if !seen.insert(raw.as_str()) {
                continue;
            }
            match adapter.delete_raw(server, raw).await {
                Ok(true) => count += 1,
                Ok(false) => debug!("{raw} already gone on {server}"),
                Err(e) => warn!("Failed to delete {raw} on {server}: {e}"),
            }
        }
    }

    info!("Flushed {count} keys matching {pattern}");
    count
}

/// Delete the listed keys of one group through the logical delete.
///
/// Group and keys are sanitized; keys that sanitize to nothing are ignored.
/// Returns the number of successful deletes.
pub async fn flush_group_keys<A, S>(adapter: &A, group: &str, keys: &[S]) -> usize
where
    A: CacheAdapter + ?Sized,
    S: AsRef<str>,
{
    let group = sanitize(group);
    let mut count = 0;

    for key in keys {
        let key = sanitize(key.as_ref());
        if key.is_empty() {
            continue;
        }
        if delete_logged(adapter, &group, &key).await {
            count += 1;
        }
    }

    info!("Deleted {count} of {} keys in {group}", keys.len());
    count
}

/// Remove one logical key. Both parts are sanitized before use.
pub async fn remove_key<A>(adapter: &A, group: &str, key: &str) -> bool
where
    A: CacheAdapter + ?Sized,
{
    delete_logged(adapter, &sanitize(group), &sanitize(key)).await
}

/// Drop every per-user cache entry of `identity`.
///
/// All five deletes are always attempted. Identity values are used as given:
/// emails and logins legitimately contain characters the sanitizer would
/// strip. Returns how many of the deletes succeeded.
pub async fn clear_identity_caches<A>(adapter: &A, identity: &Identity) -> usize
where
    A: CacheAdapter + ?Sized,
{
    let mut count = 0;
    for (group, field) in IDENTITY_GROUPS {
        if delete_logged(adapter, group, &identity.field(field)).await {
            count += 1;
        }
    }

    info!(
        "Cleared {count} of {} cache entries for user {}",
        IDENTITY_GROUPS.len(),
        identity.id
    );
    count
}

async fn delete_logged<A>(adapter: &A, group: &str, key: &str) -> bool
where
    A: CacheAdapter + ?Sized,
{
    match adapter.delete(group, key).await {
        Ok(deleted) => {
            debug!("Delete {group}:{key} -> {deleted}");
            deleted
        }
        Err(e) => {
            warn!("Failed to delete {group}:{key}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockAdapter, single_slab};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use spider_cache_protocol::{ProtocolError, SlabId};
    use std::sync::{Arc, Mutex};

    fn server(port: u16) -> ServerEndpoint {
        ServerEndpoint::new("cache", port)
    }

    fn identity() -> Identity {
        Identity {
            id: 42,
            login: "Admin.User".to_string(),
            slug: "admin-user".to_string(),
            email: "admin@example.org".to_string(),
        }
    }

    #[tokio::test]
    async fn test_flush_group_over_matches_by_substring() {
        let mut adapter = single_slab(&[
            "posts:1",
            "posts:2",
            "oldposts:9",
            "postsarchive:9",
            "7:posts:3",
            "users:1",
        ]);
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let log = deleted.clone();
        adapter.expect_delete_raw().returning(move |_, raw| {
            log.lock().unwrap().push(raw.to_string());
            Ok(true)
        });

        let count = flush_group(&adapter, &[server(11211)], "posts").await;

        assert_eq!(count, 4);
        assert_eq!(
            *deleted.lock().unwrap(),
            vec!["posts:1", "posts:2", "oldposts:9", "7:posts:3"]
        );
    }

    #[tokio::test]
    async fn test_flush_group_counts_only_successes() {
        let mut adapter = single_slab(&["a:posts:1", "posts:2", "posts:3"]);
        adapter.expect_delete_raw().returning(|_, raw| match raw {
            "posts:2" => Ok(false),
            "posts:3" => Err(ProtocolError::Timeout),
            _ => Ok(true),
        });

        assert_eq!(flush_group(&adapter, &[server(11211)], "posts").await, 1);
    }

    #[tokio::test]
    async fn test_flush_group_sanitizes_group() {
        let mut adapter = single_slab(&["posts:1", "Posts:2"]);
        adapter
            .expect_delete_raw()
            .with(eq(server(11211)), eq("posts:1"))
            .times(1)
            .returning(|_, _| Ok(true));

        // "Users" sanitizes to "sers", which matches nothing here
        assert_eq!(flush_group(&adapter, &[server(11211)], "Users").await, 0);
        assert_eq!(flush_group(&adapter, &[server(11211)], "posts ").await, 1);
    }

    #[tokio::test]
    async fn test_flush_group_refuses_empty_group() {
        let mut adapter = MockAdapter::new();
        adapter.expect_list_slabs().never();
        adapter.expect_delete_raw().never();

        assert_eq!(flush_group(&adapter, &[server(11211)], "!!!").await, 0);
    }

    #[tokio::test]
    async fn test_flush_group_skips_unreachable_server() {
        let mut adapter = MockAdapter::new();
        adapter.expect_list_slabs().returning(|s| {
            if s.port == 1 {
                Err(ProtocolError::ConnectionFailed {
                    host: s.host.clone(),
                    port: s.port,
                })
            } else {
                Ok(vec![SlabId(1)])
            }
        });
        adapter
            .expect_dump_keys()
            .returning(|_, _| Ok(vec!["posts:1".to_string(), "posts:1".to_string()]));
        adapter
            .expect_delete_raw()
            .times(1)
            .returning(|_, _| Ok(true));

        let count = flush_group(&adapter, &[server(1), server(11211)], "posts").await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_flush_group_without_servers() {
        let adapter = MockAdapter::new();
        assert_eq!(flush_group(&adapter, &[], "posts").await, 0);
    }

    #[tokio::test]
    async fn test_flush_group_keys() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_delete()
            .withf(|group, _| group == "post_meta")
            .returning(|_, key| Ok(key != "3"));

        let count = flush_group_keys(&adapter, "post_meta!", &["1", "2", "3", "!!"]).await;
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_flush_group_keys_strips_uppercase() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_delete()
            .with(eq("ost_eta"), eq("1"))
            .times(1)
            .returning(|_, _| Ok(true));

        assert_eq!(flush_group_keys(&adapter, "Post_Meta", &["1"]).await, 1);
    }

    #[tokio::test]
    async fn test_remove_key_sanitizes_inputs() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_delete()
            .with(eq("osts"), eq("12"))
            .times(1)
            .returning(|_, _| Ok(true));

        assert!(remove_key(&adapter, "Posts", "1 2").await);
    }

    #[tokio::test]
    async fn test_remove_key_error_is_false() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_delete()
            .returning(|_, _| Err(ProtocolError::Timeout));

        assert!(!remove_key(&adapter, "posts", "1").await);
    }

    #[tokio::test]
    async fn test_clear_identity_caches_issues_all_five_deletes() {
        let mut adapter = MockAdapter::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = calls.clone();
        adapter.expect_delete().times(5).returning(move |group, key| {
            log.lock().unwrap().push((group.to_string(), key.to_string()));
            Ok(true)
        });

        assert_eq!(clear_identity_caches(&adapter, &identity()).await, 5);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("users".to_string(), "42".to_string()),
                ("user_meta".to_string(), "42".to_string()),
                ("userlogins".to_string(), "Admin.User".to_string()),
                ("userslugs".to_string(), "admin-user".to_string()),
                ("useremail".to_string(), "admin@example.org".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_identity_caches_reports_actual_successes() {
        let mut adapter = MockAdapter::new();
        adapter.expect_delete().times(5).returning(|group, _| match group {
            "users" | "useremail" => Ok(true),
            "user_meta" => Err(ProtocolError::Timeout),
            _ => Ok(false),
        });

        assert_eq!(clear_identity_caches(&adapter, &identity()).await, 2);
    }
}
