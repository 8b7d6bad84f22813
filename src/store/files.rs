//! JSON snapshot backend.
//!
//! Each tenant owns `<root>/<tenant>/index.json`, a single document holding
//! both sequences:
//!
//! ```json
//! { "chunks": [ ... ], "embeddings": [ ... ] }
//! ```
//!
//! Keeping both sequences in one file means a single rename replaces them
//! together. `append` uses the trait's read-modify-write default.

use std::path::PathBuf;

use async_trait::async_trait;

use receptionist_kb_core::error::RetrievalResult;
use receptionist_kb_core::store::IndexBackend;
use receptionist_kb_core::{RetrievalError, TenantId, TenantIndex};

use super::{tenant_dirs, tenant_file, write_atomic};

const INDEX_FILE: &str = "index.json";

pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, tenant: &TenantId) -> PathBuf {
        tenant_file(&self.root, tenant, INDEX_FILE)
    }
}

#[async_trait]
impl IndexBackend for FileBackend {
    fn name(&self) -> &str {
        "files"
    }

    async fn fetch(&self, tenant: &TenantId) -> RetrievalResult<Option<TenantIndex>> {
        let path = self.path_for(tenant);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RetrievalError::persistence(e)),
        };
        let index: TenantIndex = serde_json::from_slice(&bytes)
            .map_err(|e| RetrievalError::corrupt(tenant, format!("{}: {}", path.display(), e)))?;
        Ok(Some(index))
    }

    async fn save(&self, tenant: &TenantId, index: &TenantIndex) -> RetrievalResult<()> {
        let bytes = serde_json::to_vec(index).map_err(RetrievalError::persistence)?;
        write_atomic(&self.path_for(tenant), &bytes).await?;
        tracing::debug!(tenant = %tenant, entries = index.len(), "index snapshot written");
        Ok(())
    }

    async fn tenants(&self) -> RetrievalResult<Vec<TenantId>> {
        tenant_dirs(&self.root, INDEX_FILE).await
    }
}
