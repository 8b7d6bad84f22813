//! # Receptionist KB Core
//!
//! Runtime-agnostic retrieval logic for the receptionist backend: the
//! per-tenant index model, sentence chunking, the storage trait, exact
//! cosine top-k search, and the document ingestion pipeline.
//!
//! This crate contains no tokio, filesystem, or network dependencies.
//! Durable backends and HTTP embedding providers live in the
//! `receptionist-kb` app crate and plug in through [`store::IndexBackend`]
//! and [`embedding::Embedder`].
//!
//! ## Data flow
//!
//! ```text
//! text ──▶ chunk_text ──▶ Embedder::embed ──▶ VectorStore::upsert ──▶ IndexBackend
//!                                                                          │
//! query vector ──▶ VectorStore::search ──▶ rank_top_k ◀── IndexBackend::load
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod search;
pub mod store;
pub mod vector_store;

pub use error::{RetrievalError, RetrievalResult};
pub use models::{Chunk, ChunkMetadata, EmbeddingRecord, SearchHit, TenantId, TenantIndex};
pub use vector_store::VectorStore;
