//! TOML configuration.
//!
//! Every section has defaults except `[store].root`, which is required for
//! the on-disk backends. See `config/rkb.example.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use receptionist_kb_core::chunk::DEFAULT_MAX_WORDS;
use receptionist_kb_core::TenantId;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tenants: BTreeMap<String, TenantConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: None,
        }
    }
}

fn default_backend() -> String {
    "files".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
        }
    }
}

fn default_max_words() -> usize {
    DEFAULT_MAX_WORDS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.6
}
fn default_max_tokens() -> u32 {
    80
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeBaseConfig {
    #[serde(default = "default_kb_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            root: default_kb_root(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_kb_root() -> PathBuf {
    PathBuf::from("knowledge_base")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> usize {
    256
}
fn default_cache_ttl() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            max_turns: default_max_turns(),
        }
    }
}

fn default_session_ttl() -> u64 {
    3600
}
fn default_max_turns() -> usize {
    20
}

/// Per-tenant persona and overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct TenantConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_retry_prompt")]
    pub retry_prompt: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            name: None,
            bot_name: default_bot_name(),
            system_prompt: default_system_prompt(),
            retry_prompt: default_retry_prompt(),
            top_k: None,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_bot_name() -> String {
    "our office".to_string()
}
fn default_system_prompt() -> String {
    "You are a friendly, concise phone receptionist. Answer clearly, briefly, and helpfully."
        .to_string()
}
fn default_retry_prompt() -> String {
    "Sorry, I didn't catch that. Could you please repeat?".to_string()
}

impl Config {
    /// Persona for `tenant`, falling back to defaults for unconfigured tenants.
    pub fn tenant(&self, tenant: &TenantId) -> TenantConfig {
        self.tenants
            .get(tenant.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Configured display name, or the tenant id.
    pub fn display_name(&self, tenant: &TenantId) -> String {
        self.tenants
            .get(tenant.as_str())
            .and_then(|t| t.name.clone())
            .unwrap_or_else(|| tenant.to_string())
    }

    pub fn top_k_for(&self, tenant: &TenantId) -> usize {
        self.tenants
            .get(tenant.as_str())
            .and_then(|t| t.top_k)
            .unwrap_or(self.retrieval.top_k)
    }

    /// In-memory configuration for tests and one-off tools.
    pub fn in_memory() -> Self {
        Self {
            store: StoreConfig {
                backend: "memory".to_string(),
                root: None,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.store.backend.as_str() {
            "memory" => {}
            "files" | "log" | "sqlite" => {
                if self.store.root.is_none() {
                    bail!(
                        "store.root must be set when store.backend is '{}'",
                        self.store.backend
                    );
                }
            }
            other => bail!(
                "Unknown store backend: '{}'. Must be files, log, sqlite, or memory.",
                other
            ),
        }

        if self.chunking.max_words == 0 {
            bail!("chunking.max_words must be > 0");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }

        if self.embedding.is_enabled() {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }

        match self.generation.provider.as_str() {
            "disabled" | "openai" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be disabled or openai.",
                other
            ),
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }

        for (id, tenant) in &self.tenants {
            TenantId::new(id.as_str())
                .with_context(|| format!("invalid tenant key [tenants.{}]", id))?;
            if tenant.top_k == Some(0) {
                bail!("tenants.{}.top_k must be >= 1", id);
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let cfg = parse("[store]\nroot = \"/tmp/kb\"\n").unwrap();
        assert_eq!(cfg.store.backend, "files");
        assert_eq!(cfg.chunking.max_words, 500);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.generation.model, "gpt-3.5-turbo");
        assert_eq!(cfg.generation.max_tokens, 80);
        assert_eq!(cfg.cache.capacity, 256);
        assert_eq!(cfg.session.ttl_secs, 3600);
    }

    #[test]
    fn test_file_backend_requires_root() {
        let err = parse("[store]\nbackend = \"log\"\n").unwrap_err();
        assert!(err.to_string().contains("store.root"));
        assert!(parse("[store]\nbackend = \"memory\"\n").is_ok());
    }

    #[test]
    fn test_unknown_backend() {
        assert!(parse("[store]\nbackend = \"pinecone\"\nroot = \"x\"\n").is_err());
    }

    #[test]
    fn test_enabled_embedding_needs_model_and_dims() {
        let src = "[store]\nbackend = \"memory\"\n[embedding]\nprovider = \"openai\"\n";
        assert!(parse(src).is_err());
        let src = "[store]\nbackend = \"memory\"\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-ada-002\"\ndims = 1536\n";
        assert!(parse(src).is_ok());
    }

    #[test]
    fn test_tenant_overrides() {
        let src = r#"
[store]
backend = "memory"

[tenants.helpflow]
name = "HelpFlow Inc."
bot_name = "HelpFlow AI"
system_prompt = "You are HelpFlow."
top_k = 5
"#;
        let cfg = parse(src).unwrap();
        let helpflow = TenantId::new("helpflow").unwrap();
        let other = TenantId::new("other").unwrap();
        assert_eq!(cfg.top_k_for(&helpflow), 5);
        assert_eq!(cfg.top_k_for(&other), 3);
        assert_eq!(cfg.tenant(&helpflow).bot_name, "HelpFlow AI");
        assert_eq!(cfg.tenant(&other).bot_name, "our office");
        assert_eq!(cfg.display_name(&helpflow), "HelpFlow Inc.");
        assert_eq!(cfg.display_name(&other), "other");
    }

    #[test]
    fn test_invalid_tenant_key() {
        let src = "[store]\nbackend = \"memory\"\n[tenants.\"bad/id\"]\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn test_zero_max_words_rejected() {
        assert!(parse("[store]\nbackend = \"memory\"\n[chunking]\nmax_words = 0\n").is_err());
    }
}
