//! Mock cache adapter shared by unit tests

use async_trait::async_trait;
use mockall::mock;
use spider_cache_protocol::{CacheAdapter, CachedItem, Result, ServerEndpoint, SlabId};

mock! {
    pub Adapter {}

    #[async_trait]
    impl CacheAdapter for Adapter {
        async fn list_slabs(&self, server: &ServerEndpoint) -> Result<Vec<SlabId>>;
        async fn dump_keys(&self, server: &ServerEndpoint, slab: SlabId) -> Result<Vec<String>>;
        async fn delete_raw(&self, server: &ServerEndpoint, raw_key: &str) -> Result<bool>;
        async fn delete(&self, group: &str, key: &str) -> Result<bool>;
        async fn get(&self, group: &str, key: &str) -> Result<Option<CachedItem>>;
        fn full_key(&self, group: &str, key: &str) -> Result<String>;
    }
}

/// Adapter whose only server holds `keys` in a single slab
pub fn single_slab(keys: &[&str]) -> MockAdapter {
    let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
    let mut adapter = MockAdapter::new();
    adapter
        .expect_list_slabs()
        .returning(|_| Ok(vec![SlabId(1)]));
    adapter
        .expect_dump_keys()
        .returning(move |_, _| Ok(keys.clone()));
    adapter
}
