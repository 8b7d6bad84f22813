//! Query/update facade over an [`IndexBackend`].
//!
//! [`VectorStore`] is what the ingestion pipeline and the turn handler
//! talk to. Every call loads the tenant's full index from the backend;
//! there is no caching here, so a search always reflects the last
//! completed `save`.

use std::sync::Arc;

use tracing::debug;

use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{Chunk, ChunkMetadata, SearchHit, TenantId, TenantIndex};
use crate::search::rank_top_k;
use crate::store::IndexBackend;

#[derive(Clone)]
pub struct VectorStore {
    backend: Arc<dyn IndexBackend>,
}

impl VectorStore {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn IndexBackend {
        self.backend.as_ref()
    }

    /// Load a tenant's validated index (empty when absent).
    pub async fn load(&self, tenant: &TenantId) -> RetrievalResult<TenantIndex> {
        self.backend.load(tenant).await
    }

    /// Top-`k` chunks for `query`, best first.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::CorruptIndex`] if the persisted index is unreadable.
    /// - [`RetrievalError::DimensionMismatch`] if `query` has the wrong length.
    pub async fn search(
        &self,
        tenant: &TenantId,
        query: &[f32],
        k: usize,
    ) -> RetrievalResult<Vec<SearchHit>> {
        let index = self.backend.load(tenant).await?;
        let hits = rank_top_k(&index, query, k)?;
        debug!(
            tenant = %tenant,
            indexed = index.len(),
            returned = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "vector search"
        );
        Ok(hits)
    }

    /// Append one chunk and its embedding to the tenant's index.
    ///
    /// The new chunk takes `meta.position` or, if unset, the next free
    /// position for `meta.source` as seen by the backend at write time.
    ///
    /// Load, append and persist are not isolated from a concurrent upsert
    /// on the same tenant unless the backend overrides
    /// [`IndexBackend::append`] with a true append.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::EmptyEmbedding`] for a zero-length vector.
    /// - [`RetrievalError::DimensionMismatch`] when the tenant already holds
    ///   vectors of another length.
    /// - [`RetrievalError::Persistence`] if the write fails; the persisted
    ///   state should then be treated as unknown.
    pub async fn upsert(
        &self,
        tenant: &TenantId,
        embedding: Vec<f32>,
        meta: ChunkMetadata,
    ) -> RetrievalResult<Chunk> {
        if embedding.is_empty() {
            return Err(RetrievalError::EmptyEmbedding);
        }

        let current = self.backend.load(tenant).await?;
        current.check_dims(embedding.len())?;
        let ordinal = current.len();

        let chunk = self.backend.append(tenant, current, meta, embedding).await?;

        debug!(
            tenant = %tenant,
            backend = self.backend.name(),
            source = %chunk.source,
            position = chunk.position,
            ordinal,
            "upsert chunk"
        );
        Ok(chunk)
    }

    /// Persist an empty index for the tenant.
    ///
    /// This is the explicit reset used before a full re-ingestion; there is
    /// no per-chunk deletion.
    pub async fn clear(&self, tenant: &TenantId) -> RetrievalResult<()> {
        self.backend.save(tenant, &TenantIndex::default()).await
    }

    pub async fn tenants(&self) -> RetrievalResult<Vec<TenantId>> {
        self.backend.tenants().await
    }
}
