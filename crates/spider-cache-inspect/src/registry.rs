//! Source of the cache server list

use spider_cache_protocol::ServerEndpoint;

/// Supplies the servers an inspection runs against.
///
/// Each call returns an independent snapshot. An empty list is valid and
/// means there is nothing to inspect.
pub trait ServerRegistry: Send + Sync {
    /// Current server list
    fn servers(&self) -> Vec<ServerEndpoint>;
}

/// Fixed server list, usually built from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegistry {
    servers: Vec<ServerEndpoint>,
}

impl StaticRegistry {
    /// Registry over `servers`
    #[must_use]
    pub fn new(servers: Vec<ServerEndpoint>) -> Self {
        Self { servers }
    }
}

impl ServerRegistry for StaticRegistry {
    fn servers(&self) -> Vec<ServerEndpoint> {
        self.servers.clone()
    }
}

impl FromIterator<ServerEndpoint> for StaticRegistry {
    fn from_iter<I: IntoIterator<Item = ServerEndpoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        assert!(StaticRegistry::default().servers().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let registry: StaticRegistry = [
            ServerEndpoint::new("cache-1", 11211),
            ServerEndpoint::new("cache-2", 11212),
        ]
        .into_iter()
        .collect();

        let mut snapshot = registry.servers();
        snapshot.clear();
        assert_eq!(registry.servers().len(), 2);
    }
}
