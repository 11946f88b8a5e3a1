//! Configuration loading, validation, and management for docuroute.
//!
//! Loads configuration from `~/.docuroute/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use docuroute_core::SearchMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.docuroute/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature. Decisions want determinism, so this starts at 0.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Fused retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Agent loop budgets
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool construction settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Summary/parent document store
    #[serde(default)]
    pub store: StoreConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("retrieval", &self.retrieval)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("store", &self.store)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

// ── Retrieval ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Similarity,
    Mmr,
}

/// Which embedder the in-memory chunk index uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    /// Local token hashing, no network
    Hash,
    /// The configured provider's embeddings endpoint
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Documents returned per search
    #[serde(default = "default_k")]
    pub k: usize,

    /// Raw candidates fetched per returned document
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    #[serde(default = "default_search_type")]
    pub search_type: SearchType,

    /// Relevance weight for MMR, 1.0 = pure relevance
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// Whether to re-rank the overfetched candidates
    #[serde(default = "default_true")]
    pub rerank: bool,

    #[serde(default = "default_embedding")]
    pub embedding: EmbeddingKind,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Dimensions of hash embeddings
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

fn default_k() -> usize {
    4
}
fn default_overfetch_factor() -> usize {
    3
}
fn default_search_type() -> SearchType {
    SearchType::Mmr
}
fn default_mmr_lambda() -> f32 {
    0.5
}
fn default_embedding() -> EmbeddingKind {
    EmbeddingKind::Hash
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_dimensions() -> usize {
    256
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            overfetch_factor: default_overfetch_factor(),
            search_type: default_search_type(),
            mmr_lambda: default_mmr_lambda(),
            rerank: true,
            embedding: default_embedding(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

impl RetrievalConfig {
    /// The search mode handed to the chunk index.
    pub fn search_mode(&self) -> SearchMode {
        match self.search_type {
            SearchType::Similarity => SearchMode::Similarity,
            SearchType::Mmr => SearchMode::Mmr { lambda: self.mmr_lambda },
        }
    }
}

// ── Agent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool executions allowed per question
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Wall-clock limit per question
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Corrective re-prompts after malformed selector/synthesizer output
    #[serde(default = "default_max_parse_retries")]
    pub max_parse_retries: u32,
}

fn default_max_steps() -> usize {
    6
}
fn default_max_duration_secs() -> u64 {
    300
}
fn default_max_parse_retries() -> u32 {
    1
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_duration_secs: default_max_duration_secs(),
            max_parse_retries: default_max_parse_retries(),
        }
    }
}

impl AgentConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

// ── Tools ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Cap on report tool descriptions shown to the selector
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,

    /// Answer from retrieved documents instead of returning them raw
    #[serde(default = "default_true")]
    pub rag_answers: bool,
}

fn default_max_description_chars() -> usize {
    4096
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_description_chars: default_max_description_chars(),
            rag_answers: true,
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// SQLite database file; defaults to `~/.docuroute/documents.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// Where the SQLite store lives.
    pub fn sqlite_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("documents.db"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.docuroute/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `DOCUROUTE_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`, so tests need not touch the real environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("DOCUROUTE_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("DOCUROUTE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("DOCUROUTE_MODEL") {
            self.default_model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docuroute")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.k == 0 {
            return Err(ConfigError::ValidationError("retrieval.k must be at least 1".into()));
        }

        if self.retrieval.overfetch_factor == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.overfetch_factor must be at least 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.retrieval.mmr_lambda) {
            return Err(ConfigError::ValidationError(
                "retrieval.mmr_lambda must be between 0.0 and 1.0".into(),
            ));
        }

        if self.retrieval.embedding_dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.embedding_dimensions must be > 0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError("agent.max_steps must be at least 1".into()));
        }

        if self.agent.max_duration_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_duration_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config --default`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            retrieval: RetrievalConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            store: StoreConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
