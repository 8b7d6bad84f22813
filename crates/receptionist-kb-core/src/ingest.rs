//! Document ingestion: chunk → embed → upsert.
//!
//! One embedding request is made per chunk, sequentially. A provider
//! failure skips that chunk and is recorded in the [`IngestReport`]; the
//! run continues. Storage failures and dimension mismatches abort the run
//! because every later chunk would hit them too.
//!
//! Re-running ingestion for a source that is already indexed appends a
//! second copy of its chunks. Clear the tenant first for an idempotent
//! rebuild.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunk::chunk_text;
use crate::embedding::Embedder;
use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{ChunkMetadata, TenantId};
use crate::vector_store::VectorStore;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub written: usize,
    pub failed: usize,
    pub failures: Vec<ChunkFailure>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.written + self.failed
    }

    pub fn merge(&mut self, other: IngestReport) {
        self.written += other.written;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

/// A chunk that was skipped because its embedding could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkFailure {
    pub source: String,
    pub position: usize,
    pub error: String,
}

/// Chunk `text`, embed every chunk, and upsert the results in order.
///
/// Chunk positions are their index within the document, so a skipped chunk
/// leaves a gap rather than shifting later positions.
///
/// # Errors
///
/// Propagates [`RetrievalError::Persistence`], [`RetrievalError::CorruptIndex`]
/// and [`RetrievalError::DimensionMismatch`] from the store. Embedding
/// failures are never returned as errors.
pub async fn ingest_document(
    store: &VectorStore,
    embedder: &dyn Embedder,
    tenant: &TenantId,
    source: &str,
    text: &str,
    max_words: usize,
) -> RetrievalResult<IngestReport> {
    let chunks = chunk_text(text, max_words);
    let mut report = IngestReport::default();

    debug!(tenant = %tenant, source, chunks = chunks.len(), "ingesting document");

    for (position, chunk) in chunks.into_iter().enumerate() {
        let vector = match embedder.embed(&chunk).await {
            Ok(v) if v.is_empty() => Err(RetrievalError::EmptyEmbedding),
            other => other,
        };

        let vector = match vector {
            Ok(v) => v,
            Err(e) => {
                warn!(tenant = %tenant, source, position, error = %e, "embedding failed; chunk skipped");
                report.failed += 1;
                report.failures.push(ChunkFailure {
                    source: source.to_string(),
                    position,
                    error: e.to_string(),
                });
                continue;
            }
        };

        store
            .upsert(tenant, vector, ChunkMetadata::new(source, chunk).at(position))
            .await?;
        report.written += 1;
    }

    info!(
        tenant = %tenant,
        source,
        written = report.written,
        failed = report.failed,
        "document ingested"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns `[1, 0, 0]` for every text, failing on the call numbers in `fail_on`.
    struct FlakyEmbedder {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl FlakyEmbedder {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> RetrievalResult<Vec<f32>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                Err(RetrievalError::Embedding("rate limited".into()))
            } else {
                Ok(vec![1.0, 0.0, 0.0])
            }
        }
    }

    fn store() -> VectorStore {
        VectorStore::new(Arc::new(InMemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_single_chunk_document() {
        let vs = store();
        let t = TenantId::new("helpflow").unwrap();
        let text = "Our hours are 9 to 5. We are closed Sundays.";
        let report = ingest_document(&vs, &FlakyEmbedder::new(vec![]), &t, "hours.txt", text, 500)
            .await
            .unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.failed, 0);

        let hits = vs.search(&t, &[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].chunk.text, text);
        assert_eq!(hits[0].chunk.source, "hours.txt");
        assert_eq!(hits[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_provider_failure_skips_chunk() {
        let vs = store();
        let t = TenantId::new("acme").unwrap();
        let report = ingest_document(&vs, &FlakyEmbedder::new(vec![1]), &t, "doc", "A. B. C.", 1)
            .await
            .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].position, 1);

        let index = vs.load(&t).await.unwrap();
        let texts: Vec<&str> = index.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A.", "C."]);
        let positions: Vec<usize> = index.chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_rerun_without_clear_duplicates() {
        let vs = store();
        let t = TenantId::new("acme").unwrap();
        let e = FlakyEmbedder::new(vec![]);
        ingest_document(&vs, &e, &t, "doc", "A. B.", 1).await.unwrap();
        ingest_document(&vs, &e, &t, "doc", "A. B.", 1).await.unwrap();
        assert_eq!(vs.load(&t).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_text_writes_nothing() {
        let vs = store();
        let t = TenantId::new("acme").unwrap();
        let report = ingest_document(&vs, &FlakyEmbedder::new(vec![]), &t, "doc", "  ", 10)
            .await
            .unwrap();
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn test_report_merge() {
        let mut a = IngestReport {
            written: 2,
            failed: 1,
            failures: vec![ChunkFailure {
                source: "x".into(),
                position: 0,
                error: "e".into(),
            }],
        };
        a.merge(IngestReport {
            written: 3,
            failed: 0,
            failures: vec![],
        });
        assert_eq!(a.total(), 6);
        assert_eq!(a.failures.len(), 1);
    }
}
