//! Retrieval + generation for one reading.
//!
//! [`TarotPipeline`] is built once at startup and shared read-only between
//! requests. [`TarotPipeline::read`] embeds the query, pulls the nearest corpus
//! texts, fills the reading template and hands it to the generator.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{ApiKeys, TarotConfig};
use crate::corpus::{Query, Reading};
use crate::embedding::{self, EmbeddingProvider};
use crate::generation::{self, AnswerGenerator};
use crate::index::{RetrievedEntry, SimilarityIndex};

/// Fill the four-part reading template.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        r#"
你是一位專業的塔羅占卜師。根據以下塔羅牌資料，為使用者解讀今日運勢。

塔羅牌資料：
{context}

使用者抽到的牌：{question}

請以溫暖、鼓勵的語氣，用 **繁體中文** 提供：
1. 這張牌對今日的整體運勢建議（2-3 句話）
2. 工作/學業方面的提醒（1-2 句話）
3. 感情/人際方面的提醒（1-2 句話）
4. 一句正向的鼓勵話語

請直接給出解讀，不要加上「根據資料」等前綴。
"#
    )
}

/// Newline-joined texts, in the order the index returned them.
pub fn build_context(entries: &[RetrievedEntry]) -> String {
    entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct TarotPipeline {
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<SimilarityIndex>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
}

impl TarotPipeline {
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        index: Arc<SimilarityIndex>,
        generator: Arc<dyn AnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            embedding,
            index,
            generator,
            top_k,
        }
    }

    /// Startup sequence: embedding client, index, generator, in that order.
    /// Any failure aborts the whole sequence.
    pub async fn initialize(config: &TarotConfig, keys: ApiKeys) -> Result<Self> {
        let embedding = embedding::create_provider(&config.embedding, keys.embedding)
            .context("failed to create embedding provider")?;
        tracing::info!(provider = embedding.name(), model = embedding.model(), "embedding provider ready");

        let index_path = config.resolved_index_path();
        let index = tokio::task::spawn_blocking(move || SimilarityIndex::open(&index_path))
            .await
            .context("index loading task failed")??;

        let meta = index.meta();
        if meta.embedding_model != embedding.model() || meta.embedding_provider != embedding.name() {
            tracing::warn!(
                stored_provider = %meta.embedding_provider,
                stored_model = %meta.embedding_model,
                configured_provider = embedding.name(),
                configured_model = embedding.model(),
                "embedding model changed; run `tarot build-index --force` to re-embed the corpus"
            );
        }

        let generator = generation::create_generator(&config.generation, keys.generation)
            .context("failed to create answer generator")?;
        tracing::info!(provider = generator.name(), model = generator.model(), "answer generator ready");

        Ok(Self::new(
            embedding,
            Arc::new(index),
            generator,
            config.retrieval.top_k,
        ))
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Embed `question` and return the nearest corpus entries.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedEntry>> {
        let query_embedding = self
            .embedding
            .embed_query(question)
            .await
            .context("failed to embed query")?;

        let index = Arc::clone(&self.index);
        let k = self.top_k;
        tokio::task::spawn_blocking(move || index.search(&query_embedding, k))
            .await
            .context("index search task failed")?
            .context("similarity search failed")
    }

    /// Retrieve context for `question` and generate the model's answer.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let entries = self.retrieve(question).await?;
        tracing::debug!(question, hits = entries.len(), "retrieved reference texts");

        let prompt = render_prompt(&build_context(&entries), question);
        self.generator
            .generate(&prompt)
            .await
            .context("answer generation failed")
    }

    pub async fn read(&self, query: &Query) -> Result<Reading> {
        let analysis = self.answer(&query.question()).await?;
        Ok(Reading {
            analysis,
            card: query.card.clone(),
            orientation: query.orientation,
        })
    }
}
