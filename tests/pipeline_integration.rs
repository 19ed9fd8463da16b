//! Harvest Pipeline Integration Tests
//!
//! Integration tests that verify the harvesting components work together:
//! 1. ResultStore dedup against existing rows and within a batch
//! 2. Worker pool size does not change what gets written
//! 3. Failed and panicking tokens never reach the result file
//! 4. HarvestPipeline -> PipelineEnricher -> ResultStore -> missing-token reconciliation
//!
//! All tests are deterministic (no real network calls) and use mock data.
//! Run with `cargo test --features test-support`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use tempfile::TempDir;

use coin_harvester::application::{
    find_missing_tokens, load_seen_mints, pipeline_enricher, EnrichmentSources, HarvestPipeline,
    HarvestSettings, PoolRetryPolicy, ResultStore, ResultWriter,
};
use coin_harvester::diagnostics::RunContext;
use coin_harvester::domain::{ActivityWindow, PoolDocument, Transaction};
use coin_harvester::ports::mocks::{
    sample_record, sample_series, sample_transaction, ScriptedEnricher, ScriptedPoolSource,
    StaticActivitySource, StaticCandles, StaticCoinPages, StaticHolderStats,
};
use coin_harvester::ports::{ActivityExport, EnrichError, TokenEnricher};

// ============================================================================
// Test Fixtures
// ============================================================================

fn batch(mints: &[&str]) -> Vec<Transaction> {
    mints.iter().map(|mint| sample_transaction(mint)).collect()
}

fn result_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

async fn process(
    path: &Path,
    workers: usize,
    transactions: Vec<Transaction>,
    enricher: Arc<dyn TokenEnricher>,
) -> coin_harvester::application::RunSummary {
    ResultStore::open(path, workers, RunContext::detached())
        .unwrap()
        .process(transactions, enricher)
        .await
        .unwrap()
}

/// Coin page in the streamed RSC layout the extractor expects
fn coin_page(mint: &str, pool: &str) -> String {
    let coin = json!({
        "mint": mint,
        "name": format!("{} Coin", mint),
        "symbol": mint.to_uppercase(),
        "image_uri": format!("https://ipfs.io/ipfs/{}", mint),
        "twitter": null,
        "created_timestamp": 1_737_374_400_000_i64,
        "raydium_pool": pool,
    });
    format!(
        "0:[\"$\",\"html\"]\n2:[\"$\",\"$9\",null,{{\"params\":{{}},\"coin\":{}}}]\n",
        coin
    )
}

fn pool_document(pool: &str, mint: &str, supply: &str) -> PoolDocument {
    PoolDocument::from_value(json!({
        "data": {
            "id": format!("id-{}", pool),
            "type": "pool",
            "attributes": {"address": pool},
            "relationships": {
                "pairs": {"data": [{"id": format!("pair-{}", pool), "type": "pair"}]},
                "tokens": {"data": [{"id": "tok-1", "type": "token"}]}
            }
        },
        "included": [
            {"id": "tok-1", "type": "token", "attributes": {"address": mint, "circulating_supply": supply}}
        ]
    }))
    .unwrap()
}

// ============================================================================
// Result Store
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_mint_written_at_most_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    {
        let mut writer = ResultWriter::open(&path).unwrap();
        writer.append(&sample_record("existing")).unwrap();
    }

    let enricher = ScriptedEnricher::new().into_shared();
    let summary = process(
        &path,
        3,
        batch(&["existing", "fresh", "fresh", "other", "existing"]),
        enricher.clone(),
    )
    .await;

    let mut calls = enricher.get_calls();
    calls.sort();
    assert_eq!(calls, vec!["fresh".to_string(), "other".to_string()]);
    assert_eq!(summary.skipped_existing, 2);
    assert_eq!(summary.skipped_duplicate, 1);

    // Header plus one row per distinct mint
    assert_eq!(result_lines(&path).len(), 4);
    let seen = load_seen_mints(&path).unwrap();
    let expected: HashSet<String> = ["existing", "fresh", "other"].iter().map(|m| m.to_string()).collect();
    assert_eq!(seen, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_count_does_not_change_rows() {
    let mints: Vec<String> = (0..20).map(|i| format!("mint{:02}", i)).collect();
    let mint_refs: Vec<&str> = mints.iter().map(String::as_str).collect();

    let single_dir = TempDir::new().unwrap();
    let single = single_dir.path().join("results.csv");
    let pooled_dir = TempDir::new().unwrap();
    let pooled = pooled_dir.path().join("results.csv");

    let scripted = || {
        ScriptedEnricher::new()
            .with_failure("mint03", EnrichError::NoPriceHistory)
            .with_delay(Duration::from_millis(5))
            .into_shared()
    };
    process(&single, 1, batch(&mint_refs), scripted()).await;
    let pooled_enricher = scripted();
    process(&pooled, 5, batch(&mint_refs), pooled_enricher.clone()).await;

    let mut single_rows = result_lines(&single);
    let mut pooled_rows = result_lines(&pooled);
    single_rows.sort();
    pooled_rows.sort();
    assert_eq!(single_rows, pooled_rows);
    assert_eq!(single_rows.len(), 20);
    assert!(pooled_enricher.peak_concurrency() <= 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_and_panics_leave_no_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    let enricher = ScriptedEnricher::new()
        .with_failure("bad", EnrichError::MissingIdentifier("raydium_pool"))
        .with_panic("boom")
        .into_shared();

    let summary = process(&path, 2, batch(&["good", "bad", "boom", "fine"]), enricher).await;

    let mut written = summary.written.clone();
    written.sort();
    assert_eq!(written, vec!["fine".to_string(), "good".to_string()]);
    let mut failed: Vec<&str> = summary.failed.iter().map(|f| f.mint.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["bad", "boom"]);
    assert_eq!(summary.completed(), 4);

    let seen = load_seen_mints(&path).unwrap();
    assert!(!seen.contains("bad"));
    assert!(!seen.contains("boom"));
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_harvest_end_to_end_with_reconciliation() {
    let dir = TempDir::new().unwrap();
    let window = ActivityWindow::for_date(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());

    let raw = "Signature,Time,TokenAddress\nsig-alpha,t,alpha\nsig-stuck,t,stuck\n";
    let activity = Arc::new(StaticActivitySource::new(ActivityExport {
        raw: raw.to_string(),
        transactions: batch(&["alpha", "stuck"]),
    }));

    let pools = Arc::new(
        ScriptedPoolSource::new()
            .with_script("pool-alpha", vec![Ok(pool_document("pool-alpha", "alpha", "1000000"))])
            .with_script("pool-stuck", vec![Ok(PoolDocument::default())]),
    );
    let sources = EnrichmentSources {
        coin_pages: Arc::new(
            StaticCoinPages::new()
                .with_page("alpha", coin_page("alpha", "pool-alpha"))
                .with_page("stuck", coin_page("stuck", "pool-stuck")),
        ),
        extractor: Arc::new(coin_harvester::adapters::pump_fun::RegexMetadataExtractor::new().unwrap()),
        holders: Arc::new(StaticHolderStats::new().with_stats("alpha", 812, 55_000.0)),
        pools: pools.clone(),
        candles: Arc::new(StaticCandles::new(sample_series())),
    };
    let retry = PoolRetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(10),
    };
    let settings = HarvestSettings {
        data_dir: dir.path().to_path_buf(),
        workers: 2,
        ..Default::default()
    };

    let report = HarvestPipeline::new(activity, pipeline_enricher(sources, retry), settings)
        .run(window)
        .await
        .unwrap();

    assert_eq!(report.summary.written, vec!["alpha".to_string()]);
    assert_eq!(report.summary.failed.len(), 1);
    assert_eq!(report.summary.failed[0].mint, "stuck");
    assert_eq!(pools.call_count("pool-stuck"), 2);
    assert!(report.results_path.ends_with("results_2025-01-20.csv"));

    let lines = result_lines(&report.results_path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("name,symbol,mint,volume,holder_count"));
    // 1M supply against the sample series: peak 50M at +1h, trough 8M at open
    assert!(lines[1].contains("alpha Coin,ALPHA,alpha,55000"));
    assert!(lines[1].contains(",812,"));
    assert!(lines[1].contains("50000000"));
    assert!(lines[1].contains("+1:00:00"));

    let missing = find_missing_tokens(&report.snapshot_path, &report.results_path).unwrap();
    assert_eq!(missing, vec!["stuck".to_string()]);
}
