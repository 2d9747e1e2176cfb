use anyhow::{Context, Result};
use std::sync::Arc;

use tarot::config::TarotConfig;
use tarot::corpus::{Orientation, Query};
use tarot::embedding;
use tarot::index::SimilarityIndex;

/// Print the corpus texts nearest to a card, without calling the generator.
pub async fn retrieve(
    config: &TarotConfig,
    card: &str,
    orientation: Orientation,
    top_k: Option<usize>,
) -> Result<()> {
    let index = Arc::new(SimilarityIndex::open(config.resolved_index_path())?);

    let api_key = config.embedding.api_key()?;
    let provider = embedding::create_provider(&config.embedding, api_key)?;

    let question = Query::new(card, orientation).question();
    let query_embedding = provider
        .embed_query(&question)
        .await
        .context("failed to embed query")?;

    let k = top_k.unwrap_or(config.retrieval.top_k);
    let search_index = Arc::clone(&index);
    let hits = tokio::task::spawn_blocking(move || search_index.search(&query_embedding, k)).await??;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Query: {question}\n");
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} {} (distance: {:.4})",
            i + 1,
            hit.card,
            hit.orientation.label(),
            hit.distance
        );
        println!("     {}", hit.text);
        println!();
    }

    Ok(())
}
