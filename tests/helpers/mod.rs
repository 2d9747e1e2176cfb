#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tarot::corpus;
use tarot::embedding::EmbeddingProvider;
use tarot::generation::AnswerGenerator;
use tarot::index::{build, SimilarityIndex};
use tarot::pipeline::TarotPipeline;

/// Keywords that span the fake embedding space; the last dimension is a bias
/// so texts without any keyword still get a non-zero vector.
const KEYWORDS: [&str; 6] = ["愚者", "魔術師", "正位", "逆位", "太陽", "月亮"];
pub const FAKE_DIM: usize = KEYWORDS.len() + 1;

/// Deterministic embedding: keyword counts plus bias, L2-normalized.
/// `"愚者 正位"` lands exactly on the 愚者 upright corpus text.
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let mut v: Vec<f32> = KEYWORDS
        .iter()
        .map(|kw| text.matches(kw).count() as f32)
        .collect();
    v.push(1.0);
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

pub struct KeywordEmbeddings;

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddings {
    fn name(&self) -> &str {
        "keyword"
    }

    fn model(&self) -> &str {
        "keyword-test"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_embedding(t)).collect())
    }
}

/// Always fails, like a provider with a revoked key.
pub struct FailingEmbeddings;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddings {
    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-test"
    }

    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("API key not valid")
    }
}

/// Records every prompt and answers with a short canned reading.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-test"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!(
            "1. 今日充滿新的可能。\n2. 工作上大膽提案。\n3. 真誠待人。\n4. 相信自己！(#{})",
            prompts.len()
        ))
    }
}

pub struct FailingGenerator;

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-test"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("quota exceeded")
    }
}

/// Build an index of the built-in corpus under `dir` with keyword embeddings.
pub async fn build_test_index(dir: &Path) -> PathBuf {
    let path = dir.join("tarot_index.db");
    build::build_index(&path, &corpus::builtin(), &KeywordEmbeddings, false)
        .await
        .unwrap();
    path
}

/// A pipeline over a freshly built test index.
pub async fn test_pipeline(dir: &Path, generator: Arc<dyn AnswerGenerator>) -> TarotPipeline {
    pipeline_with(dir, Arc::new(KeywordEmbeddings), generator).await
}

/// Like [`test_pipeline`], but queries are embedded with `embedding`.
/// The index itself is always built with keyword embeddings.
pub async fn pipeline_with(
    dir: &Path,
    embedding: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
) -> TarotPipeline {
    let path = build_test_index(dir).await;
    let index = SimilarityIndex::open(&path).unwrap();
    TarotPipeline::new(embedding, Arc::new(index), generator, 3)
}
