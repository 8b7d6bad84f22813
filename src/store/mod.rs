//! Durable [`IndexBackend`] implementations and backend selection.
//!
//! | `store.backend` | Type | Layout |
//! |-----------------|------|--------|
//! | `files` | [`FileBackend`] | `<root>/<tenant>/index.json` snapshot |
//! | `log` | [`LogBackend`] | `<root>/<tenant>/index.jsonl` append-only log |
//! | `sqlite` | [`SqliteBackend`] | `<root>/kb.sqlite` |
//! | `memory` | [`InMemoryBackend`] | process memory |

pub mod files;
pub mod log;
pub mod sqlite;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::AsyncWriteExt;

use receptionist_kb_core::error::RetrievalResult;
use receptionist_kb_core::store::memory::InMemoryBackend;
use receptionist_kb_core::store::IndexBackend;
use receptionist_kb_core::{RetrievalError, TenantId};

use crate::config::Config;

pub use files::FileBackend;
pub use log::LogBackend;
pub use sqlite::SqliteBackend;

/// Open the backend named by `[store].backend`.
pub async fn open_backend(config: &Config) -> Result<Arc<dyn IndexBackend>> {
    let root = config.store.root.clone();
    let backend: Arc<dyn IndexBackend> = match (config.store.backend.as_str(), root) {
        ("memory", _) => Arc::new(InMemoryBackend::new()),
        ("files", Some(root)) => Arc::new(FileBackend::new(root)),
        ("log", Some(root)) => Arc::new(LogBackend::new(root)),
        ("sqlite", Some(root)) => Arc::new(SqliteBackend::open(&root.join("kb.sqlite")).await?),
        (other, None) => bail!("store.root must be set when store.backend is '{}'", other),
        (other, Some(_)) => bail!("Unknown store backend: '{}'", other),
    };
    tracing::debug!(backend = backend.name(), "index backend opened");
    Ok(backend)
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `bytes` to `path` by way of a sibling temp file and a rename, so
/// readers observe either the old content or the new content.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> RetrievalResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| RetrievalError::Persistence(format!("no parent for {}", path.display())))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(RetrievalError::persistence)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dir.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(RetrievalError::Persistence(format!(
            "failed to write {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

/// List tenant directories under `root` that contain `file_name`.
pub(crate) async fn tenant_dirs(root: &Path, file_name: &str) -> RetrievalResult<Vec<TenantId>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RetrievalError::persistence(e)),
    };

    let mut tenants = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(RetrievalError::persistence)?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        let Ok(tenant) = TenantId::new(name) else {
            continue;
        };
        if tokio::fs::try_exists(entry.path().join(file_name))
            .await
            .unwrap_or(false)
        {
            tenants.push(tenant);
        }
    }
    tenants.sort();
    Ok(tenants)
}

pub(crate) fn tenant_file(root: &Path, tenant: &TenantId, file_name: &str) -> PathBuf {
    root.join(tenant.as_str()).join(file_name)
}
