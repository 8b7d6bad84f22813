//! Append-only JSON Lines backend.
//!
//! Each tenant owns `<root>/<tenant>/index.jsonl`. Every line is one
//! (chunk, embedding) pair:
//!
//! ```json
//! {"recorded_at":"2026-01-01T00:00:00Z","chunk":{...},"embedding":{...}}
//! ```
//!
//! A pair lives on one line, so the two sequences can never disagree about
//! an entry. `append` writes a single line and never rewrites the file,
//! which keeps concurrent upserts from losing each other's writes.
//!
//! A final line without a trailing newline is kept when it parses; the next
//! append terminates it before writing. One that does not parse is an
//! interrupted write: reads ignore it and the next append truncates it
//! away. An unparseable line anywhere else is corruption.
//!
//! Appends hold one lock for reading the current index, resolving the
//! chunk position and writing the line, so concurrent upserts on one
//! source get distinct positions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use receptionist_kb_core::error::RetrievalResult;
use receptionist_kb_core::store::IndexBackend;
use receptionist_kb_core::{
    Chunk, ChunkMetadata, EmbeddingRecord, RetrievalError, TenantId, TenantIndex,
};

use super::{tenant_dirs, tenant_file, write_atomic};

const LOG_FILE: &str = "index.jsonl";

#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    recorded_at: DateTime<Utc>,
    chunk: Chunk,
    embedding: EmbeddingRecord,
}

pub struct LogBackend {
    root: PathBuf,
    /// Serializes appends within this process.
    write_lock: Mutex<()>,
}

impl LogBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, tenant: &TenantId) -> PathBuf {
        tenant_file(&self.root, tenant, LOG_FILE)
    }

    fn encode(chunk: Chunk, embedding: EmbeddingRecord) -> RetrievalResult<Vec<u8>> {
        let entry = LogEntry {
            recorded_at: Utc::now(),
            chunk,
            embedding,
        };
        let mut line = serde_json::to_vec(&entry).map_err(RetrievalError::persistence)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Make sure the next append starts on a fresh line.
    ///
    /// An unterminated final line that parses is a complete record and gets
    /// its newline; one that does not parse is dropped.
    async fn repair_tail(&self, tenant: &TenantId, path: &Path) -> RetrievalResult<()> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(RetrievalError::persistence(e)),
        };
        if bytes.is_empty() || bytes.last() == Some(&b'\n') {
            return Ok(());
        }
        let keep = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        if serde_json::from_slice::<LogEntry>(&bytes[keep..]).is_ok() {
            tracing::debug!(tenant = %tenant, "terminating unterminated log line");
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .open(path)
                .await
                .map_err(RetrievalError::persistence)?;
            file.write_all(b"\n")
                .await
                .map_err(RetrievalError::persistence)?;
            return file.sync_data().await.map_err(RetrievalError::persistence);
        }

        tracing::warn!(
            tenant = %tenant,
            dropped_bytes = bytes.len() - keep,
            "truncating interrupted log line"
        );
        write_atomic(path, &bytes[..keep]).await
    }
}

#[async_trait]
impl IndexBackend for LogBackend {
    fn name(&self) -> &str {
        "log"
    }

    async fn fetch(&self, tenant: &TenantId) -> RetrievalResult<Option<TenantIndex>> {
        let path = self.path_for(tenant);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(RetrievalError::corrupt(tenant, e.to_string()))
            }
            Err(e) => return Err(RetrievalError::persistence(e)),
        };

        let complete = content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let mut index = TenantIndex::default();

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => index.push(entry.chunk, entry.embedding),
                Err(_) if !complete && i + 1 == lines.len() => {
                    tracing::warn!(tenant = %tenant, line = i + 1, "ignoring interrupted log line");
                }
                Err(e) => {
                    return Err(RetrievalError::corrupt(
                        tenant,
                        format!("{} line {}: {}", path.display(), i + 1, e),
                    ))
                }
            }
        }
        Ok(Some(index))
    }

    async fn save(&self, tenant: &TenantId, index: &TenantIndex) -> RetrievalResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut bytes = Vec::new();
        for (chunk, embedding) in index.chunks.iter().zip(&index.embeddings) {
            bytes.extend(Self::encode(chunk.clone(), embedding.clone())?);
        }
        write_atomic(&self.path_for(tenant), &bytes).await
    }

    async fn tenants(&self) -> RetrievalResult<Vec<TenantId>> {
        tenant_dirs(&self.root, LOG_FILE).await
    }

    async fn append(
        &self,
        tenant: &TenantId,
        _current: TenantIndex,
        meta: ChunkMetadata,
        vector: Vec<f32>,
    ) -> RetrievalResult<Chunk> {
        let path = self.path_for(tenant);

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(RetrievalError::persistence)?;
        }
        self.repair_tail(tenant, &path).await?;

        let current = self.load(tenant).await?;
        current.check_dims(vector.len())?;
        let (chunk, embedding) = current.next_pair(tenant, &meta, vector);
        let line = Self::encode(chunk.clone(), embedding)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(RetrievalError::persistence)?;
        file.write_all(&line)
            .await
            .map_err(RetrievalError::persistence)?;
        file.sync_data().await.map_err(RetrievalError::persistence)?;
        Ok(chunk)
    }
}
