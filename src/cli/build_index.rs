//! CLI `build-index` command: embed the corpus and write the similarity index.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use tarot::config::TarotConfig;
use tarot::corpus;
use tarot::embedding;
use tarot::index::build;

pub async fn build_index(config: &TarotConfig, corpus_path: Option<&Path>, force: bool) -> Result<()> {
    let index_path = config.resolved_index_path();
    anyhow::ensure!(
        force || !index_path.exists(),
        "an index already exists at {}; pass --force to rebuild it",
        index_path.display()
    );

    let entries = match corpus_path {
        Some(path) => corpus::load_from_file(path)?,
        None => corpus::builtin(),
    };
    corpus::validate(&entries)?;

    let api_key = config.embedding.api_key()?;
    let provider = embedding::create_provider(&config.embedding, api_key)
        .context("failed to create embedding provider")?;

    println!(
        "Embedding {} reference texts with {} ({})...",
        entries.len(),
        provider.name(),
        provider.model()
    );

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let embeddings = build::embed_entries(provider.as_ref(), &entries, |done| {
        pb.set_position(done as u64)
    })
    .await;
    pb.finish_and_clear();
    let embeddings = embeddings?;

    let report = build::write_index(
        &index_path,
        &entries,
        &embeddings,
        provider.name(),
        provider.model(),
        force,
    )?;

    println!(
        "Index written to {} ({} entries, {} dimensions).",
        report.path.display(),
        report.meta.entry_count,
        report.meta.embedding_dim
    );
    Ok(())
}
