//! Integration tests against an in-process fake memcached server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use pretty_assertions::assert_eq;
use spider_cache_protocol::{
    CacheAdapter, KeyScheme, MemcachedClient, ProtocolError, ServerEndpoint, SlabId,
};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Slab that answers every cachedump with an error
const BROKEN_SLAB: u32 = 42;

/// Key whose VALUE header announces an impossible length
const OVERSIZED_KEY: &str = "oversized";

#[derive(Default)]
struct FakeStore {
    /// (slab, key, value) in insertion order
    items: Vec<(u32, String, Vec<u8>)>,
}

impl FakeStore {
    fn reply(&mut self, command: &str) -> String {
        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts.as_slice() {
            ["stats", "slabs"] => {
                let mut slabs: Vec<u32> = Vec::new();
                for (slab, _, _) in &self.items {
                    if !slabs.contains(slab) {
                        slabs.push(*slab);
                    }
                }
                let mut out = String::new();
                for slab in &slabs {
                    let used = self.items.iter().filter(|(s, _, _)| s == slab).count();
                    out.push_str(&format!("STAT {slab}:chunk_size 96\r\n"));
                    out.push_str(&format!("STAT {slab}:used_chunks {used}\r\n"));
                }
                out.push_str(&format!("STAT active_slabs {}\r\n", slabs.len()));
                out.push_str("STAT total_malloced 1048576\r\nEND\r\n");
                out
            }
            ["stats", "cachedump", slab, _limit] => {
                let slab: u32 = slab.parse().unwrap();
                if slab == BROKEN_SLAB {
                    return "SERVER_ERROR cachedump disabled\r\n".to_string();
                }
                let mut out = String::new();
                for (s, key, value) in &self.items {
                    if *s == slab {
                        out.push_str(&format!("ITEM {key} [{} b; 0 s]\r\n", value.len()));
                    }
                }
                out.push_str("ITEM truncated-record\r\n");
                out.push_str("END\r\n");
                out
            }
            ["delete", key] => {
                let before = self.items.len();
                self.items.retain(|(_, k, _)| k != key);
                if self.items.len() < before {
                    "DELETED\r\n".to_string()
                } else {
                    "NOT_FOUND\r\n".to_string()
                }
            }
            ["get", OVERSIZED_KEY] => format!("VALUE {OVERSIZED_KEY} 0 {}\r\n", usize::MAX),
            ["get", key] => match self.items.iter().find(|(_, k, _)| k == key) {
                Some((_, k, value)) => format!(
                    "VALUE {k} 0 {}\r\n{}\r\nEND\r\n",
                    value.len(),
                    String::from_utf8_lossy(value)
                ),
                None => "END\r\n".to_string(),
            },
            _ => "ERROR\r\n".to_string(),
        }
    }
}

/// Start a fake server on a random port.
async fn start_fake_server(items: &[(u32, &str, &str)]) -> (ServerEndpoint, Arc<Mutex<FakeStore>>) {
    let store = Arc::new(Mutex::new(FakeStore {
        items: items
            .iter()
            .map(|(slab, key, value)| (*slab, (*key).to_string(), value.as_bytes().to_vec()))
            .collect(),
    }));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind TCP listener");
    let addr = listener
        .local_addr()
        .expect("Failed to get listener address");

    let server_store = store.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let store = server_store.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let mut reader = BufReader::new(read_half);
                let mut command = String::new();
                while let Ok(n) = reader.read_line(&mut command).await {
                    if n == 0 {
                        break;
                    }
                    let reply = store.lock().unwrap().reply(command.trim());
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                    command.clear();
                }
            });
        }
    });

    (ServerEndpoint::new("127.0.0.1", addr.port()), store)
}

fn fixture() -> Vec<(u32, &'static str, &'static str)> {
    vec![
        (3, "options:siteurl", "https://example.org"),
        (1, "1:posts:10", "hello"),
        (3, "users:1", "admin"),
        (1, "1:posts:11", "world"),
        (BROKEN_SLAB, "big:blob", "x"),
    ]
}

#[tokio::test]
async fn test_list_slabs_in_server_order() {
    let (server, _store) = start_fake_server(&fixture()).await;
    let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());

    let slabs = client.list_slabs(&server).await.unwrap();
    assert_eq!(slabs, vec![SlabId(3), SlabId(1), SlabId(BROKEN_SLAB)]);
}

#[tokio::test]
async fn test_dump_keys_skips_malformed_records() {
    let (server, _store) = start_fake_server(&fixture()).await;
    let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());

    let keys = client.dump_keys(&server, SlabId(3)).await.unwrap();
    assert_eq!(keys, vec!["options:siteurl", "users:1"]);

    let dump = client.cachedump(&server, SlabId(1)).await.unwrap();
    assert_eq!(dump.keys, vec!["1:posts:10", "1:posts:11"]);
    assert_eq!(dump.skipped, 1);
}

#[tokio::test]
async fn test_dump_keys_server_error() {
    let (server, _store) = start_fake_server(&fixture()).await;
    let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());

    let err = client
        .dump_keys(&server, SlabId(BROKEN_SLAB))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Server(_)));
    assert!(!err.is_connection());
}

#[tokio::test]
async fn test_delete_raw() {
    let (server, store) = start_fake_server(&fixture()).await;
    let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());

    assert!(client.delete_raw(&server, "users:1").await.unwrap());
    assert!(!client.delete_raw(&server, "users:1").await.unwrap());
    assert_eq!(store.lock().unwrap().items.len(), 4);
}

#[tokio::test]
async fn test_logical_get_and_delete_use_scheme() {
    let (server, _store) = start_fake_server(&[(1, "salt:2:posts:7", "body")]).await;
    let scheme = KeyScheme::new()
        .with_salt("salt")
        .with_site_id(2)
        .with_global_groups(["users"]);
    let client = MemcachedClient::new(vec![server], scheme);

    assert_eq!(client.full_key("posts", "7").unwrap(), "salt:2:posts:7");

    let item = client.get("posts", "7").await.unwrap().unwrap();
    assert_eq!(item.key, "salt:2:posts:7");
    assert_eq!(item.text(), "body");

    assert!(client.delete("posts", "7").await.unwrap());
    assert!(client.get("posts", "7").await.unwrap().is_none());
    assert!(!client.delete("posts", "7").await.unwrap());
}

#[tokio::test]
async fn test_logical_delete_fails_when_pool_unreachable() {
    let client = MemcachedClient::new(
        vec![ServerEndpoint::new("127.0.0.1", 1)],
        KeyScheme::new(),
    );

    let err = client.delete("posts", "1").await.unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn test_logical_delete_tolerates_partial_pool() {
    let (server, _store) = start_fake_server(&[(1, "posts:1", "x")]).await;
    let client = MemcachedClient::new(
        vec![ServerEndpoint::new("127.0.0.1", 1), server],
        KeyScheme::new(),
    );

    assert!(client.delete("posts", "1").await.unwrap());
}

#[tokio::test]
async fn test_get_rejects_oversized_value_header() {
    let (server, _store) = start_fake_server(&fixture()).await;
    let client = MemcachedClient::new(vec![server.clone()], KeyScheme::new());

    let err = client.get_key(&server, OVERSIZED_KEY).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Parse(_)), "{err:?}");
}
