//! CLI entry point: scans one code snippet for similar known patterns.
//!
//! Usage: `code-guardian <input.json>` where the file holds
//! `{"code": "...", "language": "..."}`. Prints the ranked matches; all
//! service configuration comes from the environment (see `.env`).

use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oracle_service::{ChatOracleService, config_oracle};
use pattern_store::{PatternStore, StoreConfig};
use repo_scanner::{GitHubCodeIndex, RepoScanner, ScanPolicy, ScanRequest};

#[derive(Debug, Deserialize)]
struct ScanInput {
    code: String,
    language: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file when present.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let input_path = std::env::args()
        .nth(1)
        .context("usage: code-guardian <input.json>")?;
    let raw = std::fs::read_to_string(&input_path)
        .with_context(|| format!("failed to read {input_path}"))?;
    let input: ScanInput =
        serde_json::from_str(&raw).with_context(|| format!("invalid input file {input_path}"))?;

    // The store is the one hard dependency: without it the scanner has no
    // local lookup and no write-back, so init failure aborts startup.
    let store = PatternStore::new(StoreConfig::from_env()).context("pattern store init failed")?;
    store.init().await.context("pattern store init failed")?;

    // Oracle is optional: without credentials every call degrades to the
    // deterministic fallbacks.
    let oracle = match config_oracle().and_then(ChatOracleService::new) {
        Ok(svc) => Some(svc),
        Err(e) => {
            warn!("oracle unavailable, running on fallbacks only: {e}");
            None
        }
    };

    let index = GitHubCodeIndex::from_env().context("github client init failed")?;
    let scanner = RepoScanner::new(oracle, index, store, ScanPolicy::from_env());

    info!(language = %input.language, bytes = input.code.len(), "scanning snippet");
    let t0 = Instant::now();
    let results = scanner
        .find_similar_patterns(ScanRequest::new(&input.code, &input.language))
        .await;
    info!(
        results = results.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "scan finished"
    );

    if results.is_empty() {
        println!("{}", "No similar patterns found.".yellow());
        return Ok(());
    }

    println!("{}", "=== Similar patterns ===".bold());
    for (i, r) in results.iter().enumerate() {
        let p = &r.pattern;
        println!(
            "{} {} {}",
            format!("{}.", i + 1).bold(),
            p.source_url.cyan(),
            format!("(similarity {:.2})", r.similarity).green()
        );
        println!(
            "   {} {} | {} {} | {} {:?}",
            "feature:".dimmed(),
            p.primary_feature,
            "type:".dimmed(),
            p.code_type,
            "complexity:".dimmed(),
            p.complexity
        );
        for issue in &p.related_issues {
            println!("   {} {} ({})", "issue:".dimmed(), issue.title, issue.url);
        }
    }

    Ok(())
}
