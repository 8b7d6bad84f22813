//! Index statistics: `rkb stats` and `rkb clear`.
//!
//! A quick view of what a tenant has indexed: entry counts, vector
//! dimension, per-source chunk counts, and how many chunks duplicate the
//! text of an earlier one (the footprint of re-ingesting without a clear).

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use serde::Serialize;

use receptionist_kb_core::{TenantId, TenantIndex, VectorStore};

use crate::config::Config;
use crate::store::open_backend;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub embeddings: usize,
    pub dims: Option<usize>,
    /// Chunk count per source, sorted by source.
    pub sources: BTreeMap<String, usize>,
    /// Chunks whose text hash already appeared earlier in the index.
    pub duplicates: usize,
}

impl IndexStats {
    pub fn of(index: &TenantIndex) -> Self {
        let mut sources = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        for chunk in &index.chunks {
            *sources.entry(chunk.source.clone()).or_insert(0) += 1;
            if !seen.insert(chunk.hash.as_str()) {
                duplicates += 1;
            }
        }
        Self {
            chunks: index.chunks.len(),
            embeddings: index.embeddings.len(),
            dims: index.dims(),
            sources,
            duplicates,
        }
    }
}

pub async fn run_stats(config: &Config, tenant: Option<&TenantId>) -> Result<()> {
    let store = VectorStore::new(open_backend(config).await?);

    let Some(tenant) = tenant else {
        let tenants = store.tenants().await?;
        println!("Receptionist KB tenants");
        println!("  backend: {}", store.backend().name());
        println!("  tenants: {}", tenants.len());
        for t in &tenants {
            let entries = match store.load(t).await {
                Ok(index) => index.len().to_string(),
                Err(e) => format!("error ({})", e),
            };
            println!(
                "    {:<24} {:<10} {}",
                t.as_str(),
                entries,
                config.display_name(t)
            );
        }
        println!("ok");
        return Ok(());
    };

    let stats = IndexStats::of(&store.load(tenant).await?);

    println!("stats {}", tenant);
    println!("  name: {}", config.display_name(tenant));
    println!("  backend: {}", store.backend().name());
    println!("  chunks: {}", stats.chunks);
    println!("  embeddings: {}", stats.embeddings);
    match stats.dims {
        Some(d) => println!("  dims: {}", d),
        None => println!("  dims: -"),
    }
    println!("  duplicates: {}", stats.duplicates);
    if !stats.sources.is_empty() {
        println!("  by source:");
        for (source, count) in &stats.sources {
            println!("    {:<32} {:>6}", source, count);
        }
    }
    println!("ok");
    Ok(())
}

pub async fn run_clear(config: &Config, tenant: &TenantId) -> Result<()> {
    let store = VectorStore::new(open_backend(config).await?);
    let before = store.load(tenant).await.map(|i| i.len()).ok();
    store.clear(tenant).await?;

    tracing::info!(tenant = %tenant, removed = ?before, "index cleared");
    println!("clear {}", tenant);
    match before {
        Some(n) => println!("  removed: {}", n),
        None => println!("  removed: unreadable index replaced"),
    }
    println!("ok");
    Ok(())
}
