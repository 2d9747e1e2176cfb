//! OpenAI-compatible `/embeddings` endpoint (OpenAI, LM Studio, Ollama, ...).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_batch, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::remote;

pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: remote::http_client(config.request_timeout_secs)?,
            base_url: remote::base_url(config.base_url.as_deref(), remote::OPENAI_BASE_URL),
            model: config.model.clone(),
            api_key,
        })
    }
}

/// Order vectors by their `index` field; servers may answer out of order.
fn into_ordered_vectors(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingsRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("openai embedding request failed")?;
        let response = remote::check_status("openai embedding", response).await?;
        let payload: EmbeddingsResponse = response
            .json()
            .await
            .context("failed to decode openai embedding response")?;

        let vectors = into_ordered_vectors(payload.data);
        check_batch("openai", texts.len(), &vectors)?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_reordered_by_index() {
        let raw = r#"{"object": "list", "data": [
            {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
            {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
        ], "model": "text-embedding-3-small"}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        let vectors = into_ordered_vectors(parsed.data);
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn request_body_shape() {
        let input = vec!["愚者 正位".to_string()];
        let body = serde_json::to_value(EmbeddingsRequest {
            model: "text-embedding-3-small",
            input: &input,
        })
        .unwrap();
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"][0], "愚者 正位");
    }
}
