//! Retrieval-augmented turn handling.
//!
//! One caller utterance in, one spoken reply out:
//!
//! 1. A blank transcript gets the tenant's retry prompt with no model call.
//! 2. The transcript is embedded (through [`QueryCache`]) and searched in
//!    the tenant's index. A degradable failure here is logged and the turn
//!    continues ungrounded; anything else fails the turn.
//! 3. The prompt is the tenant's system prompt, an optional context block,
//!    the call's history, and the transcript.
//! 4. The generator's reply is appended to the call session and returned.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use receptionist_kb_core::embedding::Embedder;
use receptionist_kb_core::error::RetrievalResult;
use receptionist_kb_core::{SearchHit, TenantId, VectorStore};

use crate::cache::QueryCache;
use crate::config::Config;
use crate::generation::{ChatMessage, GenerationRequest, TextGenerator};
use crate::session::{Exchange, SessionStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub reply: String,
    /// Whether any retrieved context went into the prompt.
    pub grounded: bool,
    pub context: Vec<SearchHit>,
}

pub struct TurnHandler {
    config: Config,
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    cache: QueryCache,
    sessions: SessionStore,
}

impl TurnHandler {
    pub fn new(
        config: Config,
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let cache = QueryCache::from_config(&config.cache);
        let sessions = SessionStore::from_config(&config.session);
        Self {
            config,
            store,
            embedder,
            generator,
            cache,
            sessions,
        }
    }

    pub async fn handle_turn(
        &self,
        tenant: &TenantId,
        call_id: &str,
        transcript: &str,
    ) -> Result<TurnReply> {
        let persona = self.config.tenant(tenant);
        let transcript = transcript.trim();

        if transcript.is_empty() {
            debug!(tenant = %tenant, call_id, "blank transcript; asking caller to repeat");
            return Ok(TurnReply {
                reply: persona.retry_prompt,
                grounded: false,
                context: Vec::new(),
            });
        }

        let k = self.config.top_k_for(tenant);
        let context = match self.retrieve(tenant, transcript, k).await {
            Ok(hits) => hits,
            Err(e) if e.is_degradable() => {
                warn!(tenant = %tenant, call_id, error = %e, "retrieval failed; answering ungrounded");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut messages = vec![ChatMessage::system(&persona.system_prompt)];
        if !context.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Use context:\n{}",
                format_context(&context)
            )));
        }
        for exchange in self.sessions.get(call_id).await {
            messages.push(ChatMessage::user(exchange.user));
            messages.push(ChatMessage::assistant(exchange.assistant));
        }
        messages.push(ChatMessage::user(transcript));

        let request = GenerationRequest {
            model: persona
                .model
                .clone()
                .unwrap_or_else(|| self.config.generation.model.clone()),
            temperature: persona
                .temperature
                .unwrap_or(self.config.generation.temperature),
            max_tokens: persona
                .max_tokens
                .unwrap_or(self.config.generation.max_tokens),
            messages,
        };

        let reply = self.generator.generate(&request).await?;

        self.sessions
            .append(
                call_id,
                Exchange {
                    user: transcript.to_string(),
                    assistant: reply.clone(),
                },
            )
            .await;

        info!(
            tenant = %tenant,
            call_id,
            grounded = !context.is_empty(),
            context = context.len(),
            "turn answered"
        );

        Ok(TurnReply {
            reply,
            grounded: !context.is_empty(),
            context,
        })
    }

    /// Closing line for the end of a call.
    pub fn farewell(&self, tenant: &TenantId) -> String {
        format!(
            "Thank you for calling {}. Goodbye!",
            self.config.tenant(tenant).bot_name
        )
    }

    /// Forget the call's history and return the closing line.
    pub async fn end_call(&self, tenant: &TenantId, call_id: &str) -> String {
        self.sessions.clear(call_id).await;
        debug!(tenant = %tenant, call_id, "call ended");
        self.farewell(tenant)
    }

    async fn retrieve(
        &self,
        tenant: &TenantId,
        transcript: &str,
        k: usize,
    ) -> RetrievalResult<Vec<SearchHit>> {
        let vector = match self.cache.get(tenant, transcript).await {
            Some(v) => v,
            None => {
                let v = self.embedder.embed(transcript).await?;
                self.cache.put(tenant, transcript, v.clone()).await;
                v
            }
        };
        self.store.search(tenant, &vector, k).await
    }
}

/// `Context 1: ...` blocks separated by blank lines.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("Context {}: {}", i + 1, h.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
