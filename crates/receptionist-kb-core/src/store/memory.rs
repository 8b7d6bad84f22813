//! In-memory [`IndexBackend`] for tests and ephemeral deployments.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Each `save` swaps the
//! whole tenant entry under the write lock, so readers never see a torn
//! pair.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{TenantId, TenantIndex};

use super::IndexBackend;

/// In-memory store keyed by tenant.
#[derive(Default)]
pub struct InMemoryBackend {
    indexes: RwLock<HashMap<TenantId, TenantIndex>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> RetrievalError {
    RetrievalError::Persistence("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl IndexBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, tenant: &TenantId) -> RetrievalResult<Option<TenantIndex>> {
        let indexes = self.indexes.read().map_err(poisoned)?;
        Ok(indexes.get(tenant).cloned())
    }

    async fn save(&self, tenant: &TenantId, index: &TenantIndex) -> RetrievalResult<()> {
        let mut indexes = self.indexes.write().map_err(poisoned)?;
        indexes.insert(tenant.clone(), index.clone());
        Ok(())
    }

    async fn tenants(&self) -> RetrievalResult<Vec<TenantId>> {
        let indexes = self.indexes.read().map_err(poisoned)?;
        let mut tenants: Vec<TenantId> = indexes.keys().cloned().collect();
        tenants.sort();
        Ok(tenants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    #[tokio::test]
    async fn absent_tenant_loads_empty() {
        let backend = InMemoryBackend::new();
        let tenant = TenantId::new("new-client").unwrap();
        assert!(backend.fetch(&tenant).await.unwrap().is_none());
        assert!(backend.load(&tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_append_reads_modifies_writes() {
        let backend = InMemoryBackend::new();
        let tenant = TenantId::new("acme").unwrap();
        for _ in 0..3 {
            let current = backend.load(&tenant).await.unwrap();
            backend
                .append(&tenant, current, ChunkMetadata::new("doc", "x"), vec![1.0, 0.0])
                .await
                .unwrap();
        }
        let index = backend.load(&tenant).await.unwrap();
        assert_eq!(index.chunks.len(), 3);
        assert_eq!(index.embeddings.len(), 3);
        let positions: Vec<usize> = index.chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(backend.tenants().await.unwrap(), vec![tenant]);
    }

    #[tokio::test]
    async fn stale_view_loses_concurrent_write() {
        // Documents the read-modify-write hazard of the default append.
        let backend = InMemoryBackend::new();
        let tenant = TenantId::new("acme").unwrap();
        let view_a = backend.load(&tenant).await.unwrap();
        let view_b = backend.load(&tenant).await.unwrap();

        backend
            .append(&tenant, view_a, ChunkMetadata::new("a", "a"), vec![1.0])
            .await
            .unwrap();
        backend
            .append(&tenant, view_b, ChunkMetadata::new("b", "b"), vec![1.0])
            .await
            .unwrap();

        let index = backend.load(&tenant).await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.chunks[0].source, "b");
    }
}
