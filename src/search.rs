//! `rkb search` and `rkb probe`.

use anyhow::{bail, Result};

use receptionist_kb_core::{SearchHit, TenantId, VectorStore};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::store::open_backend;

/// Embed `query` with the configured provider and print the top `k` hits.
pub async fn run_search(
    config: &Config,
    tenant: &TenantId,
    query: &str,
    k: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query must not be empty");
    }
    let k = k.unwrap_or_else(|| config.top_k_for(tenant));

    let embedder = create_embedder(&config.embedding)?;
    let vector = embedder.embed(query).await?;

    let store = VectorStore::new(open_backend(config).await?);
    let hits = store.search(tenant, &vector, k).await?;

    print_hits(&hits);
    Ok(())
}

/// Search the tenant's index with its own first embedding.
///
/// A healthy index returns that chunk first with a score of 1.0. Needs no
/// embedding provider.
pub async fn run_probe(config: &Config, tenant: &TenantId, k: Option<usize>) -> Result<()> {
    let store = VectorStore::new(open_backend(config).await?);
    let index = store.load(tenant).await?;

    println!("probe {}", tenant);
    let Some(first) = index.embeddings.first() else {
        println!("  entries: 0");
        println!("No results.");
        return Ok(());
    };

    let k = k.unwrap_or_else(|| config.top_k_for(tenant));
    let hits = store.search(tenant, &first.vector, k).await?;

    println!("  entries: {}", index.len());
    println!("  dims: {}", first.vector.len());
    let healthy = hits
        .first()
        .map(|h| (h.score - 1.0).abs() < 1e-4)
        .unwrap_or(false);
    println!("  self-match: {}", if healthy { "yes" } else { "no" });
    print_hits(&hits);
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.4}] {}#{}",
            i + 1,
            hit.score,
            hit.chunk.source,
            hit.chunk.position
        );
        println!(
            "    excerpt: \"{}\"",
            excerpt(&hit.chunk.text, 160).replace('\n', " ")
        );
        println!("    id: {}", hit.chunk.id);
        println!();
    }
    println!("ok");
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("  short  ", 10), "short");
        assert_eq!(excerpt("héllo wörld", 5), "héllo…");
    }
}
