//! # Receptionist KB CLI (`rkb`)
//!
//! Operator interface to the per-tenant knowledge base: ingest a tenant's
//! documents, inspect and probe its index, and run a single retrieval-
//! augmented turn.
//!
//! ## Usage
//!
//! ```bash
//! rkb --config ./config/rkb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rkb ingest <tenant>` | Ingest `knowledge_base/<tenant>/` |
//! | `rkb ingest-file <tenant> <path>` | Ingest one document |
//! | `rkb search <tenant> "<query>"` | Embed a query and print the top hits |
//! | `rkb probe <tenant>` | Self-search with the first stored embedding |
//! | `rkb stats [<tenant>]` | Counts, dimension, sources, duplicates |
//! | `rkb clear <tenant>` | Persist an empty index |
//! | `rkb ask <tenant> "<utterance>"` | One turn through the turn handler |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust.
//!
//! ## Re-indexing after an embedding model change
//!
//! ```bash
//! rkb clear helpflow
//! rkb ingest helpflow
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use receptionist_kb::{ask, config, ingest, search, stats};
use receptionist_kb_core::TenantId;

/// Receptionist KB: per-tenant retrieval for a phone receptionist.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rkb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rkb",
    about = "Receptionist KB: per-tenant knowledge base and retrieval for a phone receptionist",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rkb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every document in the tenant's knowledge-base directory.
    ///
    /// Re-running without `clear` appends a second copy of each chunk.
    Ingest {
        tenant: TenantId,
        /// Knowledge-base root (overrides `[knowledge_base].root`).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Ingest a single document.
    IngestFile {
        tenant: TenantId,
        path: PathBuf,
        /// Source name stored on each chunk (defaults to the file name).
        #[arg(long)]
        source: Option<String>,
    },

    /// Embed a query and print the closest chunks.
    Search {
        tenant: TenantId,
        query: String,
        /// Number of results (defaults to the tenant's top_k).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Search the index with its own first embedding.
    ///
    /// A healthy index returns that chunk first with score 1.0.
    Probe {
        tenant: TenantId,
        #[arg(long)]
        k: Option<usize>,
    },

    /// Show index statistics for one tenant, or list all tenants.
    Stats { tenant: Option<TenantId> },

    /// Replace the tenant's index with an empty one.
    Clear { tenant: TenantId },

    /// Answer one utterance with retrieved context.
    Ask {
        tenant: TenantId,
        utterance: String,
        /// Call id whose history is used (defaults to "cli").
        #[arg(long = "call")]
        call_id: Option<String>,
        /// End the call after the reply and print the closing line.
        #[arg(long)]
        hangup: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { tenant, root } => {
            ingest::run_ingest(&cfg, &tenant, root).await?;
        }
        Commands::IngestFile {
            tenant,
            path,
            source,
        } => {
            ingest::run_ingest_file(&cfg, &tenant, &path, source).await?;
        }
        Commands::Search { tenant, query, k } => {
            search::run_search(&cfg, &tenant, &query, k).await?;
        }
        Commands::Probe { tenant, k } => {
            search::run_probe(&cfg, &tenant, k).await?;
        }
        Commands::Stats { tenant } => {
            stats::run_stats(&cfg, tenant.as_ref()).await?;
        }
        Commands::Clear { tenant } => {
            stats::run_clear(&cfg, &tenant).await?;
        }
        Commands::Ask {
            tenant,
            utterance,
            call_id,
            hangup,
        } => {
            ask::run_ask(&cfg, &tenant, &utterance, call_id, hangup).await?;
        }
    }

    Ok(())
}
