//! Offline index build: embed the corpus, then write everything in one go.
//!
//! The index file is written to a temporary sibling and renamed into place
//! only after the transaction commits, so a failed build never leaves a
//! usable partial index and never disturbs the previous one.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use super::meta::{self, IndexMeta, INDEX_SCHEMA_VERSION};
use super::{embedding_to_bytes, load_sqlite_vec, schema};
use crate::corpus::{self, ReferenceEntry};
use crate::embedding::EmbeddingProvider;

/// Number of texts per embedding request.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub path: PathBuf,
    pub meta: IndexMeta,
}

/// Embed every entry's text, reporting the running count after each batch.
pub async fn embed_entries(
    provider: &dyn EmbeddingProvider,
    entries: &[ReferenceEntry],
    mut on_progress: impl FnMut(usize),
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(entries.len());
    for chunk in entries.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = chunk.iter().map(|e| e.text.clone()).collect();
        let batch = provider
            .embed_documents(&texts)
            .await
            .context("embedding batch failed")?;
        crate::embedding::check_batch(provider.name(), texts.len(), &batch)?;
        vectors.extend(batch);
        on_progress(vectors.len());
    }

    if let Some(first) = vectors.first() {
        let dim = first.len();
        anyhow::ensure!(
            vectors.iter().all(|v| v.len() == dim),
            "{} returned embeddings of mixed dimensions across batches",
            provider.name()
        );
    }
    Ok(vectors)
}

/// Write a complete index for `entries` and their `embeddings` at `path`.
///
/// Fails if `path` already exists unless `force` is set.
pub fn write_index(
    path: &Path,
    entries: &[ReferenceEntry],
    embeddings: &[Vec<f32>],
    provider_name: &str,
    model: &str,
    force: bool,
) -> Result<BuildReport> {
    corpus::validate(entries)?;
    anyhow::ensure!(
        entries.len() == embeddings.len(),
        "{} entries but {} embeddings",
        entries.len(),
        embeddings.len()
    );
    anyhow::ensure!(
        force || !path.exists(),
        "an index already exists at {}; pass --force to rebuild it",
        path.display()
    );

    let dim = embeddings[0].len();
    anyhow::ensure!(dim > 0, "embeddings are empty");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path)
            .with_context(|| format!("failed to remove stale {}", tmp_path.display()))?;
    }

    let meta = IndexMeta {
        schema_version: INDEX_SCHEMA_VERSION,
        embedding_provider: provider_name.to_string(),
        embedding_model: model.to_string(),
        embedding_dim: dim,
        entry_count: entries.len(),
        built_at: chrono::Utc::now().to_rfc3339(),
    };

    if let Err(e) = write_tmp(&tmp_path, entries, embeddings, &meta) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).context("failed to move index into place")?;
    tracing::info!(
        path = %path.display(),
        entries = meta.entry_count,
        dim = meta.embedding_dim,
        "similarity index written"
    );

    Ok(BuildReport {
        path: path.to_path_buf(),
        meta,
    })
}

fn write_tmp(
    tmp_path: &Path,
    entries: &[ReferenceEntry],
    embeddings: &[Vec<f32>],
    meta: &IndexMeta,
) -> Result<()> {
    load_sqlite_vec();
    let mut conn = Connection::open(tmp_path)
        .with_context(|| format!("failed to create index at {}", tmp_path.display()))?;

    schema::init_schema(&conn, meta.embedding_dim).context("failed to initialize schema")?;

    let tx = conn.transaction()?;
    for (position, (entry, embedding)) in entries.iter().zip(embeddings).enumerate() {
        let id = uuid::Uuid::now_v7().to_string();
        tx.execute(
            "INSERT INTO entries (id, position, card, orientation, text) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                position as i64,
                entry.card,
                entry.orientation.as_str(),
                entry.text
            ],
        )?;
        tx.execute(
            "INSERT INTO entries_vec (id, embedding) VALUES (?1, ?2)",
            params![id, embedding_to_bytes(embedding)],
        )?;
    }
    meta::write_meta(&tx, meta)?;
    tx.commit()?;
    Ok(())
}

/// Embed `entries` with `provider` and write the index. Nothing touches the
/// disk until every embedding has been computed.
pub async fn build_index(
    path: &Path,
    entries: &[ReferenceEntry],
    provider: &dyn EmbeddingProvider,
    force: bool,
) -> Result<BuildReport> {
    corpus::validate(entries)?;
    anyhow::ensure!(
        force || !path.exists(),
        "an index already exists at {}; pass --force to rebuild it",
        path.display()
    );
    let embeddings = embed_entries(provider, entries, |_| {}).await?;
    write_index(path, entries, &embeddings, provider.name(), provider.model(), force)
}
