//! # Receptionist KB
//!
//! Per-tenant knowledge base and retrieval-augmented turn handling for a
//! phone receptionist.
//!
//! Each business (tenant) gets its own index of text chunks and their
//! embeddings. Documents are chunked on sentence boundaries, embedded, and
//! appended; each caller utterance is embedded, the closest chunks are
//! found by exact cosine search, and they are handed to the chat model as
//! context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────────┐
//! │ knowledge_   │──▶│  Pipeline   │──▶│  IndexBackend     │
//! │ base/<id>/   │   │ Chunk+Embed │   │ files/log/sqlite  │
//! └──────────────┘   └─────────────┘   └─────────┬─────────┘
//!                                                │ search
//!                     ┌──────────┐         ┌─────┴──────┐
//!          transcript │  Turn    │◀────────│ VectorStore│
//!         ───────────▶│ Handler  │         └────────────┘
//!                     └────┬─────┘
//!                          ▼ chat completion
//! ```
//!
//! The data model, chunker, ranking and ingestion pipeline live in the
//! `receptionist-kb-core` crate; this crate adds configuration, durable
//! backends, HTTP providers, the serving-path pieces, and the `rkb` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`store`] | Durable index backends |
//! | [`db`] | SQLite connection and schema |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Chat-completion text generation |
//! | [`cache`] | Query-embedding cache |
//! | [`session`] | Per-call conversation history |
//! | [`turn`] | Retrieval-augmented turn handler |
//! | [`kb`] | Knowledge-base directory scanning |
//! | [`ingest`], [`search`], [`stats`], [`ask`] | CLI command runners |

pub mod ask;
pub mod cache;
pub mod config;
pub mod db;
pub mod embedding;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod kb;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;
pub mod turn;
