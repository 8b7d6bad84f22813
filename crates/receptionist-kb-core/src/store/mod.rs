//! Storage abstraction for tenant indexes.
//!
//! The [`IndexBackend`] trait is the whole persistence contract: fetch a
//! tenant's (chunks, embeddings) pair, replace it atomically, and append
//! one pair. Backends are selected by configuration in the app crate
//! (JSON snapshot files, append-only log, SQLite); [`memory`] ships here
//! for tests.
//!
//! # Atomicity
//!
//! `save` must replace both sequences together so a concurrent reader sees
//! either the previous pair or the new one, never a torn mix.
//!
//! The default `append` is a read-modify-write: the caller's loaded view
//! plus one pair is written back with `save`. Two concurrent appends on
//! one tenant can therefore lose a write (last `save` wins), and an
//! implicit position is only unique with a single writer. Backends that
//! can append without rewriting override it and resolve the position
//! inside their own serialized section.

pub mod memory;

use async_trait::async_trait;

use crate::error::RetrievalResult;
use crate::models::{Chunk, ChunkMetadata, TenantId, TenantIndex};

/// Durable, tenant-scoped storage of chunks and their paired embeddings.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch`](IndexBackend::fetch) | Read the persisted pair; `None` when absent |
/// | [`load`](IndexBackend::load) | Read and validate; absent becomes empty |
/// | [`save`](IndexBackend::save) | Atomically overwrite the pair |
/// | [`append`](IndexBackend::append) | Add one (chunk, embedding) pair |
/// | [`tenants`](IndexBackend::tenants) | List tenants with a persisted index |
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Short backend label used in logs (e.g. `"files"`).
    fn name(&self) -> &str;

    /// Read the persisted index for `tenant`.
    ///
    /// Returns `Ok(None)` when nothing has been stored for the tenant.
    /// Data that exists but cannot be parsed is a
    /// [`CorruptIndex`](crate::error::RetrievalError::CorruptIndex) error.
    async fn fetch(&self, tenant: &TenantId) -> RetrievalResult<Option<TenantIndex>>;

    /// Replace the tenant's persisted index in full.
    async fn save(&self, tenant: &TenantId, index: &TenantIndex) -> RetrievalResult<()>;

    /// List every tenant that has a persisted index, sorted.
    async fn tenants(&self) -> RetrievalResult<Vec<TenantId>>;

    /// Persist `meta` and its vector as one new pair after `current`, the
    /// caller's freshly loaded view, and return the stored chunk.
    ///
    /// When `meta.position` is unset the backend assigns the next free
    /// position for the source.
    async fn append(
        &self,
        tenant: &TenantId,
        mut current: TenantIndex,
        meta: ChunkMetadata,
        vector: Vec<f32>,
    ) -> RetrievalResult<Chunk> {
        let (chunk, embedding) = current.next_pair(tenant, &meta, vector);
        current.push(chunk.clone(), embedding);
        self.save(tenant, &current).await?;
        Ok(chunk)
    }

    /// Read and validate the tenant's index. An absent index is empty.
    async fn load(&self, tenant: &TenantId) -> RetrievalResult<TenantIndex> {
        let index = self.fetch(tenant).await?.unwrap_or_default();
        index.validate(tenant)?;
        Ok(index)
    }
}
