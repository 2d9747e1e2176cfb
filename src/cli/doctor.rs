//! CLI `doctor` command: check the index and configuration and print a report.

use anyhow::{Context, Result};

use tarot::config::TarotConfig;
use tarot::index::SimilarityIndex;
use tarot::remote::gemini_model_resource;

pub fn doctor(config: &TarotConfig) -> Result<()> {
    println!("Tarot Health Report");
    println!("===================");
    println!();

    println!("Providers:");
    println!("  Embedding:       {} ({})", config.embedding.provider, config.embedding.model);
    println!("  Generation:      {} ({})", config.generation.provider, config.generation.model);
    match config.api_keys() {
        Ok(_) => println!("  Credentials:     OK"),
        Err(e) => println!("  Credentials:     MISSING ({e})"),
    }
    println!();

    let index_path = config.resolved_index_path();
    if !index_path.exists() {
        println!("Index:             not found at {}", index_path.display());
        println!("Run `tarot build-index` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&index_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let index = SimilarityIndex::open(&index_path)
        .context("failed to open index (may be corrupt or from another version)")?;
    let meta = index.meta();
    let entries = index.entries()?;

    println!("Index:             {}", index_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", meta.schema_version);
    println!("sqlite-vec:        {}", index.sqlite_vec_version()?);
    println!("Built at:          {}", meta.built_at);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {} ({}, {} dims)", meta.embedding_model, meta.embedding_provider, meta.embedding_dim);
    println!("  Configured:      {} ({})", config.embedding.model, config.embedding.provider);
    let same_model = meta.embedding_model == config.embedding.model
        || meta.embedding_model == gemini_model_resource(&config.embedding.model);
    if meta.embedding_provider != config.embedding.provider || !same_model {
        println!("  WARNING: model mismatch! Run `tarot build-index --force` to re-embed.");
    } else {
        println!("  Status:          OK (match)");
    }
    println!();
    println!("Entries:           {}", entries.len());
    for entry in &entries {
        println!("  {} {}", entry.card, entry.orientation.label());
    }
    if entries.len() != meta.entry_count {
        println!(
            "  WARNING: metadata records {} entries but {} are stored.",
            meta.entry_count,
            entries.len()
        );
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
