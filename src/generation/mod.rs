//! Hosted LLM answer generation.
//!
//! [`AnswerGenerator`] takes a fully composed prompt and returns the model's
//! text. Created from config via [`create_generator`].

pub mod gemini;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::error::ConfigError;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Provider name as written in config (`gemini`, `openai`).
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Single non-streaming completion. Output is returned verbatim.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub fn create_generator(
    config: &GenerationConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "gemini" => {
            let key = api_key.ok_or(ConfigError::MissingCredential(
                crate::config::GEMINI_API_KEY_ENV,
            ))?;
            Ok(Arc::new(gemini::GeminiGenerator::new(config, key)?))
        }
        "openai" => Ok(Arc::new(openai::OpenAiGenerator::new(config, api_key)?)),
        other => Err(ConfigError::UnknownProvider {
            kind: "generation",
            name: other.to_string(),
            supported: "gemini, openai",
        }
        .into()),
    }
}
