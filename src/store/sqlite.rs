//! SQLite backend.
//!
//! Chunks and embeddings live in `kb_chunks` / `kb_embeddings`, both keyed
//! by `(tenant, ordinal)`. Vectors are little-endian `f32` BLOBs. `save`
//! and `append` each run in one transaction, and `fetch` reads both tables
//! inside one transaction so it sees a single snapshot.
//!
//! `append` resolves the ordinal and any implicit position inside its
//! transaction. Two appends racing on one tenant compute the same next
//! ordinal; the loser fails on the primary key instead of overwriting.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use receptionist_kb_core::embedding::{blob_to_vec, vec_to_blob};
use receptionist_kb_core::error::RetrievalResult;
use receptionist_kb_core::store::IndexBackend;
use receptionist_kb_core::{
    Chunk, ChunkMetadata, EmbeddingRecord, RetrievalError, TenantId, TenantIndex,
};

use crate::db;

pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        db::migrate(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RetrievalError {
    RetrievalError::persistence(e)
}

async fn insert_pair(
    tx: &mut Transaction<'_, Sqlite>,
    tenant: &TenantId,
    ordinal: i64,
    chunk: &Chunk,
    embedding: &EmbeddingRecord,
) -> RetrievalResult<()> {
    sqlx::query(
        "INSERT INTO kb_chunks (tenant, ordinal, id, source, position, text, hash)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(tenant.as_str())
    .bind(ordinal)
    .bind(&chunk.id)
    .bind(&chunk.source)
    .bind(chunk.position as i64)
    .bind(&chunk.text)
    .bind(&chunk.hash)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "INSERT INTO kb_embeddings (tenant, ordinal, id, chunk_id, dims, vector)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(tenant.as_str())
    .bind(ordinal)
    .bind(&embedding.id)
    .bind(&embedding.chunk_id)
    .bind(embedding.vector.len() as i64)
    .bind(vec_to_blob(&embedding.vector))
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(())
}

async fn touch_tenant(tx: &mut Transaction<'_, Sqlite>, tenant: &TenantId) -> RetrievalResult<()> {
    sqlx::query(
        "INSERT INTO kb_tenants (tenant, updated_at) VALUES (?, ?)
         ON CONFLICT(tenant) DO UPDATE SET updated_at = excluded.updated_at",
    )
    .bind(tenant.as_str())
    .bind(chrono::Utc::now().timestamp())
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl IndexBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch(&self, tenant: &TenantId) -> RetrievalResult<Option<TenantIndex>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let known: Option<String> =
            sqlx::query_scalar("SELECT tenant FROM kb_tenants WHERE tenant = ?")
                .bind(tenant.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        if known.is_none() {
            return Ok(None);
        }

        let chunk_rows = sqlx::query(
            "SELECT id, source, position, text, hash FROM kb_chunks
             WHERE tenant = ? ORDER BY ordinal",
        )
        .bind(tenant.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        let embedding_rows = sqlx::query(
            "SELECT id, chunk_id, dims, vector FROM kb_embeddings
             WHERE tenant = ? ORDER BY ordinal",
        )
        .bind(tenant.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        let mut index = TenantIndex::default();
        for row in &chunk_rows {
            let position: i64 = row.get("position");
            let position = usize::try_from(position)
                .map_err(|_| RetrievalError::corrupt(tenant, format!("negative position {position}")))?;
            index.chunks.push(Chunk {
                id: row.get("id"),
                tenant_id: tenant.clone(),
                source: row.get("source"),
                position,
                text: row.get("text"),
                hash: row.get("hash"),
            });
        }
        for row in &embedding_rows {
            let id: String = row.get("id");
            let dims: i64 = row.get("dims");
            let blob: Vec<u8> = row.get("vector");
            let vector = blob_to_vec(&blob)
                .filter(|v| v.len() as i64 == dims)
                .ok_or_else(|| {
                    RetrievalError::corrupt(tenant, format!("embedding {id} has a malformed vector"))
                })?;
            index.embeddings.push(EmbeddingRecord {
                id,
                tenant_id: tenant.clone(),
                chunk_id: row.get("chunk_id"),
                vector,
            });
        }
        Ok(Some(index))
    }

    async fn save(&self, tenant: &TenantId, index: &TenantIndex) -> RetrievalResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for sql in [
            "DELETE FROM kb_chunks WHERE tenant = ?",
            "DELETE FROM kb_embeddings WHERE tenant = ?",
        ] {
            sqlx::query(sql)
                .bind(tenant.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        for (ordinal, (chunk, embedding)) in index.chunks.iter().zip(&index.embeddings).enumerate() {
            insert_pair(&mut tx, tenant, ordinal as i64, chunk, embedding).await?;
        }
        touch_tenant(&mut tx, tenant).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn tenants(&self) -> RetrievalResult<Vec<TenantId>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT tenant FROM kb_tenants ORDER BY tenant")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        names.into_iter().map(TenantId::new).collect()
    }

    async fn append(
        &self,
        tenant: &TenantId,
        _current: TenantIndex,
        meta: ChunkMetadata,
        vector: Vec<f32>,
    ) -> RetrievalResult<Chunk> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let ordinal: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(ordinal) + 1, 0) FROM kb_chunks WHERE tenant = ?",
        )
        .bind(tenant.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let position = match meta.position {
            Some(position) => position,
            None => {
                let next: i64 = sqlx::query_scalar(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM kb_chunks
                     WHERE tenant = ? AND source = ?",
                )
                .bind(tenant.as_str())
                .bind(&meta.source)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
                usize::try_from(next).map_err(|_| {
                    RetrievalError::corrupt(tenant, format!("negative position {next}"))
                })?
            }
        };

        let chunk = Chunk::new(tenant, &meta.source, position, &meta.text);
        let embedding = EmbeddingRecord::for_chunk(&chunk, vector);
        insert_pair(&mut tx, tenant, ordinal, &chunk, &embedding).await?;
        touch_tenant(&mut tx, tenant).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(chunk)
    }
}
