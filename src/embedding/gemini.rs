//! Google Generative Language embeddings (`embedContent` / `batchEmbedContents`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_batch, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::remote;

/// Corpus texts and queries use different task types.
const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";
const TASK_QUERY: &str = "RETRIEVAL_QUERY";

pub struct GeminiEmbeddings {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

impl GeminiEmbeddings {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: remote::http_client(config.request_timeout_secs)?,
            base_url: remote::base_url(config.base_url.as_deref(), remote::GEMINI_BASE_URL),
            model: remote::gemini_model_resource(&config.model),
            api_key,
        })
    }

    fn request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|t| self.request(t, TASK_DOCUMENT))
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("gemini embedding request failed")?;
        let response = remote::check_status("gemini embedding", response).await?;
        let payload: BatchEmbedResponse = response
            .json()
            .await
            .context("failed to decode gemini embedding response")?;

        let vectors: Vec<Vec<f32>> = payload.embeddings.into_iter().map(|e| e.values).collect();
        check_batch("gemini", texts.len(), &vectors)?;
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/{}:embedContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(text, TASK_QUERY))
            .send()
            .await
            .context("gemini embedding request failed")?;
        let response = remote::check_status("gemini embedding", response).await?;
        let payload: EmbedContentResponse = response
            .json()
            .await
            .context("failed to decode gemini embedding response")?;

        anyhow::ensure!(
            !payload.embedding.values.is_empty(),
            "gemini returned an empty embedding"
        );
        Ok(payload.embedding.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let provider = GeminiEmbeddings::new(&EmbeddingConfig::default(), "key".into()).unwrap();
        let body = serde_json::to_value(provider.request("愚者 正位", TASK_QUERY)).unwrap();
        assert_eq!(body["model"], "models/embedding-001");
        assert_eq!(body["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(body["content"]["parts"][0]["text"], "愚者 正位");
    }

    #[test]
    fn batch_response_parses() {
        let raw = r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]}"#;
        let parsed: BatchEmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    #[ignore] // Requires GEMINI_API_KEY and network; run with: cargo test -- --ignored
    fn live_query_embedding() {
        let key = std::env::var(crate::config::GEMINI_API_KEY_ENV).unwrap();
        let provider = GeminiEmbeddings::new(&EmbeddingConfig::default(), key).unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let vector = rt.block_on(provider.embed_query("愚者 正位")).unwrap();
        assert!(!vector.is_empty());
    }
}
