//! Text-to-vector embedding providers.
//!
//! [`EmbeddingProvider`] is implemented by the hosted Gemini and
//! OpenAI-compatible APIs and by a local ONNX Runtime model. The provider is
//! created via [`create_provider`] from configuration.

pub mod gemini;
pub mod local;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::error::ConfigError;

/// Turns text into fixed-length vectors.
///
/// Documents (corpus texts) and queries go through separate methods because
/// some hosted models embed them with different task types.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name as written in config (`gemini`, `openai`, `local`).
    fn name(&self) -> &str;

    /// Model identifier recorded in the index metadata.
    fn model(&self) -> &str;

    /// Embed corpus texts, one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("{} returned no embedding for the query", self.name()))
    }
}

/// Create an embedding provider from config.
///
/// `api_key` comes from [`crate::config::TarotConfig::api_keys`]; the local
/// provider ignores it.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "gemini" => {
            let key = api_key.ok_or(ConfigError::MissingCredential(
                crate::config::GEMINI_API_KEY_ENV,
            ))?;
            Ok(Arc::new(gemini::GeminiEmbeddings::new(config, key)?))
        }
        "openai" => Ok(Arc::new(openai::OpenAiEmbeddings::new(config, api_key)?)),
        "local" => Ok(Arc::new(local::LocalEmbeddingProvider::new(config)?)),
        other => Err(ConfigError::UnknownProvider {
            kind: "embedding",
            name: other.to_string(),
            supported: "gemini, openai, local",
        }
        .into()),
    }
}

/// Check that a provider answered with one vector per input, all of one width.
pub(crate) fn check_batch(name: &str, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    anyhow::ensure!(
        vectors.len() == expected,
        "{name} returned {} embeddings for {expected} inputs",
        vectors.len()
    );
    if let Some(first) = vectors.first() {
        anyhow::ensure!(!first.is_empty(), "{name} returned an empty embedding");
        anyhow::ensure!(
            vectors.iter().all(|v| v.len() == first.len()),
            "{name} returned embeddings of mixed dimensions"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_batch_accepts_uniform_vectors() {
        check_batch("test", 2, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        check_batch("test", 0, &[]).unwrap();
    }

    #[test]
    fn check_batch_rejects_count_mismatch() {
        assert!(check_batch("test", 3, &[vec![1.0]]).is_err());
    }

    #[test]
    fn check_batch_rejects_mixed_dimensions() {
        assert!(check_batch("test", 2, &[vec![1.0, 0.0], vec![1.0]]).is_err());
        assert!(check_batch("test", 1, &[vec![]]).is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "tea-leaves".into(),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config, None).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let config = EmbeddingConfig::default();
        let err = create_provider(&config, None).err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
