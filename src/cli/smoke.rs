//! CLI `smoke` command: exercise a running server end to end.

use anyhow::{Context, Result};

use tarot::corpus::{Orientation, Query, Reading};

const SAMPLE_DRAWS: [(&str, Orientation); 3] = [
    ("太陽", Orientation::Upright),
    ("愚者", Orientation::Upright),
    ("月亮", Orientation::Reversed),
];

/// POST each sample draw to `/api/tarot` and print the full reading.
/// Fails if any request does not come back as a well-formed reading.
pub async fn smoke(base_url: &str) -> Result<()> {
    let url = format!("{}/api/tarot", base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let rule = "=".repeat(80);
    let mut failures = 0usize;

    println!("{rule}");
    println!("🔮 塔羅牌解讀測試 ({url})");
    println!("{rule}\n");

    for (i, (card, orientation)) in SAMPLE_DRAWS.iter().enumerate() {
        let query = Query::new(*card, *orientation);
        println!("{rule}");
        println!("測試 {}: {} - {}", i + 1, card, orientation.label());
        println!("{rule}\n");

        match post_reading(&client, &url, &query).await {
            Ok(reading) => {
                println!("📋 卡牌: {}", reading.card);
                println!("🔄 方向: {}", reading.orientation);
                println!("📏 長度: {} 字\n", reading.analysis.chars().count());
                println!("🔮 完整解讀:");
                println!("{}", "-".repeat(80));
                println!("{}", reading.analysis);
                println!("{}", "-".repeat(80));
                println!("\n✅ 測試成功");
            }
            Err(e) => {
                failures += 1;
                println!("❌ 錯誤: {e:#}");
            }
        }
        println!("\n");
    }

    println!("{rule}");
    println!("完成: {} 成功, {} 失敗", SAMPLE_DRAWS.len() - failures, failures);
    println!("{rule}");

    anyhow::ensure!(failures == 0, "{failures} smoke request(s) failed");
    Ok(())
}

async fn post_reading(client: &reqwest::Client, url: &str, query: &Query) -> Result<Reading> {
    let response = client
        .post(url)
        .json(query)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("HTTP {status}: {body}");
    }

    let reading: Reading = response.json().await.context("invalid reading response")?;
    anyhow::ensure!(!reading.analysis.trim().is_empty(), "empty analysis");
    anyhow::ensure!(
        reading.card == query.card && reading.orientation == query.orientation,
        "server did not echo the draw: got {} {}",
        reading.card,
        reading.orientation
    );
    Ok(reading)
}
