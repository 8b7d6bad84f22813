//! `rkb ingest` and `rkb ingest-file`.
//!
//! Both run the core chunk → embed → upsert pipeline per document and
//! print a per-document and total `{written, failed}` summary. A chunk
//! whose embedding fails is skipped and counted, never fatal.
//!
//! Before any document is read, the configured model's dimension is
//! checked against the tenant's stored vectors so a model change is caught
//! up front instead of as one failure per chunk.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use receptionist_kb_core::embedding::Embedder;
use receptionist_kb_core::ingest::{ingest_document, IngestReport};
use receptionist_kb_core::{TenantId, VectorStore};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::kb::scan_knowledge_base;
use crate::store::open_backend;

/// Ingest every matching document in the tenant's knowledge-base directory.
pub async fn run_ingest(config: &Config, tenant: &TenantId, root: Option<PathBuf>) -> Result<()> {
    let kb_root = root.unwrap_or_else(|| config.knowledge_base.root.clone());
    let docs = scan_knowledge_base(&kb_root, tenant, &config.knowledge_base.include_globs)?;

    let store = VectorStore::new(open_backend(config).await?);
    let embedder = create_embedder(&config.embedding)?;
    check_model_dims(&store, tenant, embedder.as_ref()).await?;

    println!("ingest {}", tenant);
    println!("  documents: {}", docs.len());

    let mut total = IngestReport::default();
    for doc in &docs {
        let report = ingest_document(
            &store,
            embedder.as_ref(),
            tenant,
            &doc.source,
            &doc.text,
            config.chunking.max_words,
        )
        .await
        .with_context(|| format!("Failed to ingest {}", doc.path.display()))?;
        println!(
            "  {}: written {}, failed {}",
            doc.source, report.written, report.failed
        );
        total.merge(report);
    }

    print_totals(&total, embedder.as_ref());
    Ok(())
}

/// Ingest a single file under `source` (defaults to the file name).
pub async fn run_ingest_file(
    config: &Config,
    tenant: &TenantId,
    path: &Path,
    source: Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let source = source.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    });

    let store = VectorStore::new(open_backend(config).await?);
    let embedder = create_embedder(&config.embedding)?;
    check_model_dims(&store, tenant, embedder.as_ref()).await?;

    let report = ingest_document(
        &store,
        embedder.as_ref(),
        tenant,
        &source,
        &text,
        config.chunking.max_words,
    )
    .await?;

    println!("ingest {}", tenant);
    println!("  source: {}", source);
    print_totals(&report, embedder.as_ref());
    Ok(())
}

/// Fail when the tenant already holds vectors of another length than the
/// model produces. A model reporting zero dimensions is not checked.
pub async fn check_model_dims(
    store: &VectorStore,
    tenant: &TenantId,
    embedder: &dyn Embedder,
) -> Result<()> {
    let dims = embedder.dims();
    if dims == 0 {
        return Ok(());
    }
    if let Some(stored) = store.load(tenant).await?.dims() {
        if stored != dims {
            bail!(
                "index for '{}' holds {}-dimensional vectors but model '{}' produces {}; \
                 run `rkb clear {}` before re-ingesting",
                tenant,
                stored,
                embedder.model_name(),
                dims,
                tenant
            );
        }
    }
    Ok(())
}

fn print_totals(report: &IngestReport, embedder: &dyn Embedder) {
    println!("  model: {}", embedder.model_name());
    println!("  chunks written: {}", report.written);
    println!("  chunks failed: {}", report.failed);
    for failure in report.failures.iter().take(5) {
        println!(
            "    {}#{}: {}",
            failure.source, failure.position, failure.error
        );
    }
    if report.failures.len() > 5 {
        println!("    ... {} more", report.failures.len() - 5);
    }
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use receptionist_kb_core::error::RetrievalResult;
    use receptionist_kb_core::store::memory::InMemoryBackend;
    use receptionist_kb_core::ChunkMetadata;
    use std::sync::Arc;

    struct FixedDims(usize);

    #[async_trait]
    impl Embedder for FixedDims {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.0
        }
        async fn embed(&self, _text: &str) -> RetrievalResult<Vec<f32>> {
            Ok(vec![1.0; self.0])
        }
    }

    #[tokio::test]
    async fn test_model_dims_checked_against_index() {
        let store = VectorStore::new(Arc::new(InMemoryBackend::new()));
        let t = TenantId::new("helpflow").unwrap();
        assert!(check_model_dims(&store, &t, &FixedDims(3)).await.is_ok());

        store
            .upsert(&t, vec![1.0, 0.0, 0.0], ChunkMetadata::new("hours.txt", "Open."))
            .await
            .unwrap();
        assert!(check_model_dims(&store, &t, &FixedDims(3)).await.is_ok());
        assert!(check_model_dims(&store, &t, &FixedDims(0)).await.is_ok());

        let err = check_model_dims(&store, &t, &FixedDims(4)).await.unwrap_err();
        assert!(err.to_string().contains("rkb clear helpflow"));
    }
}
