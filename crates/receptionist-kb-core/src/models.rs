//! Core data models for the per-tenant retrieval index.
//!
//! A tenant's index is two parallel sequences: [`Chunk`]s and their
//! [`EmbeddingRecord`]s, linked 1:1 by ordinal position and by
//! `EmbeddingRecord::chunk_id`. Both are immutable once created;
//! re-ingestion appends new pairs rather than mutating old ones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{RetrievalError, RetrievalResult};

/// Maximum accepted length of a tenant identifier.
const MAX_TENANT_LEN: usize = 128;

/// Validated tenant identifier.
///
/// Tenant ids are used as directory names and SQL keys, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> RetrievalResult<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_TENANT_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(id))
        } else {
            Err(RetrievalError::InvalidTenant(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = RetrievalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// A bounded fragment of source text; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub tenant_id: TenantId,
    /// Originating document or record identifier.
    pub source: String,
    /// Ordinal index within `source`.
    pub position: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Chunk {
    /// Create a chunk with a fresh UUID and content hash.
    pub fn new(tenant_id: &TenantId, source: &str, position: usize, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            source: source.to_string(),
            position,
            text: text.to_string(),
            hash: content_hash(text),
        }
    }
}

/// Hex-encoded SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The embedding vector paired with one [`Chunk`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub tenant_id: TenantId,
    pub chunk_id: String,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn for_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: chunk.tenant_id.clone(),
            chunk_id: chunk.id.clone(),
            vector,
        }
    }
}

/// Caller-supplied metadata for a single upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub text: String,
    /// Ordinal within `source`. When absent the next free position for the
    /// source is assigned.
    #[serde(default)]
    pub position: Option<usize>,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
    pub chunk: Chunk,
}

/// All (chunk, embedding) pairs belonging to one tenant, in ingestion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantIndex {
    pub chunks: Vec<Chunk>,
    pub embeddings: Vec<EmbeddingRecord>,
}

impl TenantIndex {
    pub fn new(chunks: Vec<Chunk>, embeddings: Vec<EmbeddingRecord>) -> Self {
        Self { chunks, embeddings }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimensionality of the index, or `None` when empty.
    pub fn dims(&self) -> Option<usize> {
        self.embeddings.first().map(|e| e.vector.len())
    }

    pub fn push(&mut self, chunk: Chunk, embedding: EmbeddingRecord) {
        self.chunks.push(chunk);
        self.embeddings.push(embedding);
    }

    /// Next unused position for `source`.
    pub fn next_position(&self, source: &str) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.source == source)
            .map(|c| c.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// Reject a vector whose length differs from the index's.
    pub fn check_dims(&self, len: usize) -> RetrievalResult<()> {
        match self.dims() {
            Some(expected) if expected != len => Err(RetrievalError::DimensionMismatch {
                expected,
                actual: len,
            }),
            _ => Ok(()),
        }
    }

    /// The pair `meta` becomes when appended to this index: its explicit
    /// position, or the next free one for its source.
    pub fn next_pair(
        &self,
        tenant: &TenantId,
        meta: &ChunkMetadata,
        vector: Vec<f32>,
    ) -> (Chunk, EmbeddingRecord) {
        let position = meta
            .position
            .unwrap_or_else(|| self.next_position(&meta.source));
        let chunk = Chunk::new(tenant, &meta.source, position, &meta.text);
        let record = EmbeddingRecord::for_chunk(&chunk, vector);
        (chunk, record)
    }

    /// Check the structural invariants of a loaded index.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::CorruptIndex`] when the sequences differ in
    /// length, an embedding does not point at its paired chunk, a record
    /// belongs to another tenant, or vector lengths are mixed or zero.
    pub fn validate(&self, tenant: &TenantId) -> RetrievalResult<()> {
        if self.chunks.len() != self.embeddings.len() {
            return Err(RetrievalError::corrupt(
                tenant,
                format!(
                    "{} chunks but {} embeddings",
                    self.chunks.len(),
                    self.embeddings.len()
                ),
            ));
        }
        let dims = self.dims();
        for (i, (chunk, emb)) in self.chunks.iter().zip(&self.embeddings).enumerate() {
            if &chunk.tenant_id != tenant || &emb.tenant_id != tenant {
                return Err(RetrievalError::corrupt(
                    tenant,
                    format!("entry {i} belongs to another tenant"),
                ));
            }
            if emb.chunk_id != chunk.id {
                return Err(RetrievalError::corrupt(
                    tenant,
                    format!("embedding {i} is not linked to chunk {}", chunk.id),
                ));
            }
            if emb.vector.is_empty() || Some(emb.vector.len()) != dims {
                return Err(RetrievalError::corrupt(
                    tenant,
                    format!(
                        "embedding {i} has {} dimensions, expected {}",
                        emb.vector.len(),
                        dims.unwrap_or(0)
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    fn pair(t: &TenantId, source: &str, pos: usize, v: Vec<f32>) -> (Chunk, EmbeddingRecord) {
        let c = Chunk::new(t, source, pos, "text");
        let e = EmbeddingRecord::for_chunk(&c, v);
        (c, e)
    }

    #[test]
    fn tenant_id_rejects_path_segments() {
        assert!(TenantId::new("acme-co_1").is_ok());
        assert!(TenantId::new("").is_err());
        assert!(TenantId::new("../etc").is_err());
        assert!(TenantId::new("a/b").is_err());
        assert!(TenantId::new("x".repeat(129)).is_err());
    }

    #[test]
    fn tenant_id_deserialize_validates() {
        let ok: TenantId = serde_json::from_str("\"helpflow\"").unwrap();
        assert_eq!(ok.as_str(), "helpflow");
        assert!(serde_json::from_str::<TenantId>("\"no spaces\"").is_err());
    }

    #[test]
    fn next_position_is_per_source() {
        let t = tenant();
        let mut index = TenantIndex::default();
        let (c, e) = pair(&t, "faq.md", 0, vec![1.0]);
        index.push(c, e);
        let (c, e) = pair(&t, "faq.md", 1, vec![1.0]);
        index.push(c, e);
        assert_eq!(index.next_position("faq.md"), 2);
        assert_eq!(index.next_position("hours.txt"), 0);
    }

    #[test]
    fn next_pair_links_embedding_and_resolves_position() {
        let t = tenant();
        let mut index = TenantIndex::default();
        let (c, e) = pair(&t, "faq.md", 4, vec![1.0]);
        index.push(c, e);

        let (chunk, record) = index.next_pair(&t, &ChunkMetadata::new("faq.md", "q"), vec![0.5]);
        assert_eq!(chunk.position, 5);
        assert_eq!(record.chunk_id, chunk.id);
        assert_eq!(record.vector, vec![0.5]);

        let (chunk, _) = index.next_pair(&t, &ChunkMetadata::new("faq.md", "q").at(1), vec![0.5]);
        assert_eq!(chunk.position, 1);
    }

    #[test]
    fn check_dims_only_constrains_non_empty_index() {
        let t = tenant();
        let mut index = TenantIndex::default();
        assert!(index.check_dims(3).is_ok());
        let (c, e) = pair(&t, "a", 0, vec![1.0, 0.0]);
        index.push(c, e);
        assert!(index.check_dims(2).is_ok());
        assert!(matches!(
            index.check_dims(3),
            Err(RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn validate_detects_length_mismatch() {
        let t = tenant();
        let (c, _) = pair(&t, "a", 0, vec![1.0]);
        let index = TenantIndex::new(vec![c], Vec::new());
        assert!(matches!(
            index.validate(&t),
            Err(RetrievalError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn validate_detects_mixed_dimensions() {
        let t = tenant();
        let mut index = TenantIndex::default();
        let (c, e) = pair(&t, "a", 0, vec![1.0, 0.0]);
        index.push(c, e);
        let (c, e) = pair(&t, "a", 1, vec![1.0, 0.0, 0.0]);
        index.push(c, e);
        assert!(index.validate(&t).is_err());
    }

    #[test]
    fn validate_detects_foreign_tenant() {
        let t = tenant();
        let other = TenantId::new("other").unwrap();
        let mut index = TenantIndex::default();
        let (c, e) = pair(&other, "a", 0, vec![1.0]);
        index.push(c, e);
        assert!(index.validate(&t).is_err());
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello!"));
        assert_eq!(content_hash("").len(), 64);
    }
}
