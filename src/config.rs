use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable holding the Google Generative Language API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable holding the OpenAI (or compatible) API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TarotConfig {
    pub server: ServerConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Exact origins, or `scheme://*.suffix` patterns.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `gemini`, `openai` or `local`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// Model directory for the `local` provider.
    pub cache_dir: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `gemini` or `openai`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for TarotConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8081,
            log_level: "info".into(),
            cors_origins: vec![
                "http://localhost:3000".into(),
                "https://*.vercel.app".into(),
            ],
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        let path = default_tarot_dir()
            .join("tarot_index.db")
            .to_string_lossy()
            .into_owned();
        Self { path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_tarot_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "gemini".into(),
            model: "models/embedding-001".into(),
            base_url: None,
            cache_dir,
            request_timeout_secs: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-1.5-flash".into(),
            base_url: None,
            temperature: 0.7,
            request_timeout_secs: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// API keys resolved from the environment at process start.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub embedding: Option<String>,
    pub generation: Option<String>,
}

/// Returns `~/.tarot/`
pub fn default_tarot_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".tarot")
}

/// Returns the default config file path: `~/.tarot/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tarot_dir().join("config.toml")
}

impl TarotConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            tracing::info!("no config file at {}, using defaults", path.display());
            TarotConfig::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides (TAROT_INDEX, TAROT_LOG_LEVEL, TAROT_HOST, TAROT_PORT).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TAROT_INDEX") {
            self.index.path = val;
        }
        if let Some(val) = lookup("TAROT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = lookup("TAROT_HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("TAROT_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid {
                field: "retrieval.top_k",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid {
                field: "generation.temperature",
                reason: format!("{} is outside 0.0..=2.0", self.generation.temperature),
            });
        }
        Ok(())
    }

    /// Resolve both provider keys from the process environment.
    /// Fails on the first missing credential so the process never starts serving.
    pub fn api_keys(&self) -> Result<ApiKeys, ConfigError> {
        self.api_keys_with(|key| std::env::var(key).ok())
    }

    fn api_keys_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ApiKeys, ConfigError> {
        Ok(ApiKeys {
            embedding: self.embedding.api_key_with(&lookup)?,
            generation: self.generation.api_key_with(&lookup)?,
        })
    }

    /// Resolve the index path, expanding `~` if needed.
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_tilde(&self.index.path)
    }

    /// Base URL the smoke test talks to.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }
}

impl EmbeddingConfig {
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        self.api_key_with(|key| std::env::var(key).ok())
    }

    fn api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ConfigError> {
        match self.provider.as_str() {
            "local" => Ok(None),
            other => resolve_remote_key("embedding", other, self.base_url.as_deref(), lookup),
        }
    }
}

impl GenerationConfig {
    fn api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>, ConfigError> {
        resolve_remote_key("generation", &self.provider, self.base_url.as_deref(), lookup)
    }
}

/// Gemini always needs a key. OpenAI needs one unless a custom `base_url`
/// points at a self-hosted compatible server.
fn resolve_remote_key(
    kind: &'static str,
    provider: &str,
    base_url: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<String>, ConfigError> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    match provider {
        "gemini" => non_empty(GEMINI_API_KEY_ENV)
            .map(Some)
            .ok_or(ConfigError::MissingCredential(GEMINI_API_KEY_ENV)),
        "openai" => match (non_empty(OPENAI_API_KEY_ENV), base_url) {
            (Some(key), _) => Ok(Some(key)),
            (None, Some(_)) => Ok(None),
            (None, None) => Err(ConfigError::MissingCredential(OPENAI_API_KEY_ENV)),
        },
        other => Err(ConfigError::UnknownProvider {
            kind,
            name: other.to_string(),
            supported: if kind == "embedding" {
                "gemini, openai, local"
            } else {
                "gemini, openai"
            },
        }),
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
