use crate::models::TenantId;

pub type RetrievalResult<T> = Result<T, RetrievalError>;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid tenant id: {0}")]
    InvalidTenant(String),

    #[error("corrupt index for tenant '{tenant}': {reason}")]
    CorruptIndex { tenant: TenantId, reason: String },

    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding vector is empty")]
    EmptyEmbedding,

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RetrievalError {
    pub fn corrupt(tenant: &TenantId, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            tenant: tenant.clone(),
            reason: reason.into(),
        }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Whether a turn that hit this error while retrieving context may still
    /// be answered without grounding.
    ///
    /// Only malformed input from the caller is not degradable: every storage
    /// or provider failure leaves the conversation usable.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        !matches!(self, Self::InvalidTenant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_index_message_names_tenant() {
        let tenant = TenantId::new("acme").unwrap();
        let err = RetrievalError::corrupt(&tenant, "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "corrupt index for tenant 'acme': expected value at line 1"
        );
    }

    #[test]
    fn dimension_mismatch_is_degradable() {
        let err = RetrievalError::DimensionMismatch {
            expected: 3,
            actual: 4,
        };
        assert!(err.is_degradable());
        assert!(!RetrievalError::InvalidTenant("../x".into()).is_degradable());
    }
}
