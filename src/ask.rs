//! `rkb ask`: run one caller utterance through the turn handler.

use std::sync::Arc;

use anyhow::{bail, Result};

use receptionist_kb_core::embedding::Embedder;
use receptionist_kb_core::{TenantId, VectorStore};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::{create_generator, TextGenerator};
use crate::store::open_backend;
use crate::turn::TurnHandler;

pub async fn run_ask(
    config: &Config,
    tenant: &TenantId,
    utterance: &str,
    call_id: Option<String>,
    hangup: bool,
) -> Result<()> {
    if !config.generation.is_enabled() {
        bail!("ask requires [generation] provider to be configured");
    }
    if !config.embedding.is_enabled() {
        tracing::warn!("embedding provider disabled; reply will not be grounded");
    }

    let store = VectorStore::new(open_backend(config).await?);
    let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
    let generator: Arc<dyn TextGenerator> = Arc::from(create_generator(&config.generation)?);
    let handler = TurnHandler::new(config.clone(), store, embedder, generator);

    let call_id = call_id.unwrap_or_else(|| "cli".to_string());
    let turn = handler.handle_turn(tenant, &call_id, utterance).await?;

    println!("ask {}", tenant);
    println!("  grounded: {}", turn.grounded);
    for (i, hit) in turn.context.iter().enumerate() {
        println!(
            "  context {}: [{:.4}] {}#{}",
            i + 1,
            hit.score,
            hit.chunk.source,
            hit.chunk.position
        );
    }
    println!("  reply: {}", turn.reply);
    if hangup {
        println!("  farewell: {}", handler.end_call(tenant, &call_id).await);
    }
    println!("ok");
    Ok(())
}
