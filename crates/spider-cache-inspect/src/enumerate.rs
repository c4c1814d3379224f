//! Raw key discovery over a server's slab classes

use crate::error::{InspectError, Result};
use spider_cache_protocol::{CacheAdapter, ServerEndpoint};
use tracing::{debug, instrument, warn};

/// List every raw key held by `server`.
///
/// Keys come out in slab-list order, then in each slab's dump order.
/// Duplicates across slabs are kept. A slab whose dump fails for any reason
/// other than connectivity is logged and skipped; losing the connection
/// aborts the whole enumeration with no partial result.
///
/// # Errors
///
/// Returns [`InspectError::Connection`] when the server cannot be reached,
/// and [`InspectError::SlabListing`] when it rejects the slab listing.
#[instrument(skip(adapter, server), fields(server = %server))]
pub async fn enumerate_keys<A>(adapter: &A, server: &ServerEndpoint) -> Result<Vec<String>>
where
    A: CacheAdapter + ?Sized,
{
    let slabs = adapter
        .list_slabs(server)
        .await
        .map_err(|e| InspectError::from_protocol(server, e))?;

    let mut keys = Vec::new();
    for slab in slabs {
        if slab.0 == 0 {
            continue;
        }

        match adapter.dump_keys(server, slab).await {
            Ok(dumped) => keys.extend(dumped),
            Err(e) if e.is_connection() => {
                return Err(InspectError::Connection {
                    server: server.clone(),
                    source: e,
                });
            }
            Err(e) => warn!("Skipping slab {slab} on {server}: {e}"),
        }
    }

    debug!("Enumerated {} raw keys", keys.len());
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockAdapter;
    use pretty_assertions::assert_eq;
    use spider_cache_protocol::{ProtocolError, SlabId};

    fn server() -> ServerEndpoint {
        ServerEndpoint::new("cache-1", 11211)
    }

    #[tokio::test]
    async fn test_concatenates_in_slab_order() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_list_slabs()
            .returning(|_| Ok(vec![SlabId(5), SlabId(1)]));
        adapter.expect_dump_keys().returning(|_, slab| {
            Ok(match slab.0 {
                5 => vec!["posts:1".to_string(), "users:1".to_string()],
                _ => vec!["posts:1".to_string(), "options:a".to_string()],
            })
        });

        let keys = enumerate_keys(&adapter, &server()).await.unwrap();
        assert_eq!(keys, vec!["posts:1", "users:1", "posts:1", "options:a"]);
    }

    #[tokio::test]
    async fn test_empty_server() {
        let mut adapter = MockAdapter::new();
        adapter.expect_list_slabs().returning(|_| Ok(Vec::new()));
        adapter.expect_dump_keys().never();

        assert!(enumerate_keys(&adapter, &server()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slab_zero_is_not_dumped() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_list_slabs()
            .returning(|_| Ok(vec![SlabId(0), SlabId(2)]));
        adapter
            .expect_dump_keys()
            .withf(|_, slab| slab.0 == 2)
            .times(1)
            .returning(|_, _| Ok(vec!["a:b".to_string()]));

        assert_eq!(enumerate_keys(&adapter, &server()).await.unwrap(), vec!["a:b"]);
    }

    #[tokio::test]
    async fn test_broken_slab_is_skipped() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_list_slabs()
            .returning(|_| Ok(vec![SlabId(1), SlabId(2), SlabId(3)]));
        adapter.expect_dump_keys().returning(|_, slab| match slab.0 {
            2 => Err(ProtocolError::Server("SERVER_ERROR busy".to_string())),
            n => Ok(vec![format!("group:{n}")]),
        });

        let keys = enumerate_keys(&adapter, &server()).await.unwrap();
        assert_eq!(keys, vec!["group:1", "group:3"]);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let mut adapter = MockAdapter::new();
        adapter.expect_list_slabs().returning(|s| {
            Err(ProtocolError::ConnectionFailed {
                host: s.host.clone(),
                port: s.port,
            })
        });

        let err = enumerate_keys(&adapter, &server()).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_connection_lost_mid_dump_gives_no_partial_result() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_list_slabs()
            .returning(|_| Ok(vec![SlabId(1), SlabId(2)]));
        adapter.expect_dump_keys().returning(|s, slab| match slab.0 {
            1 => Ok(vec!["posts:1".to_string()]),
            _ => Err(ProtocolError::ConnectionTimeout {
                host: s.host.clone(),
                port: s.port,
                timeout_secs: 5,
            }),
        });

        let err = enumerate_keys(&adapter, &server()).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_rejected_listing_is_not_a_connection_error() {
        let mut adapter = MockAdapter::new();
        adapter
            .expect_list_slabs()
            .returning(|_| Err(ProtocolError::Server("ERROR".to_string())));

        let err = enumerate_keys(&adapter, &server()).await.unwrap_err();
        assert!(matches!(err, InspectError::SlabListing { .. }));
    }
}
