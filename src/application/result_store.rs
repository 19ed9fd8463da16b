//! Result Store
//!
//! Deduplicating, concurrent, crash-safe persistence of enrichment results.
//!
//! - Existing mints are read once, before any work is scheduled
//! - A fixed pool of workers pulls transactions from a shared queue
//! - Each unit runs in its own task, so a panic only loses that unit
//! - Outcomes flow over a completion channel to a single consumer
//! - The consumer appends and syncs each row under the writer lock, on the
//!   blocking pool so the sync never stalls the runtime's workers
//! - `process` returns only after every worker has finished

use std::collections::{HashSet, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Instrument};

use crate::diagnostics::RunContext;
use crate::domain::{RecordError, TokenRecord, Transaction, MINT_COLUMN};
use crate::ports::{EnrichError, TokenEnricher};

/// Store error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Result set {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("Refusing to write invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("Mint {0} already written")]
    Duplicate(String),
}

/// Mints already present in a result set; an absent file has none
pub fn load_seen_mints(path: &Path) -> Result<HashSet<String>, StoreError> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    read_column(path, MINT_COLUMN)
}

/// Non-empty values of one CSV column
pub(crate) fn read_column(path: &Path, column: &'static str) -> Result<HashSet<String>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    // An empty file has no header yet
    if reader.headers()?.is_empty() {
        return Ok(HashSet::new());
    }
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| StoreError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })?;

    let mut values = HashSet::new();
    for record in reader.records() {
        if let Some(value) = record?.get(index).filter(|v| !v.is_empty()) {
            values.insert(value.to_string());
        }
    }
    Ok(values)
}

/// Append-only CSV writer for token records
///
/// The header is written only when the file is new or empty. Every append is
/// flushed and synced before returning.
#[derive(Debug)]
pub struct ResultWriter {
    path: PathBuf,
    file: File,
    needs_header: bool,
    written: HashSet<String>,
}

impl ResultWriter {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            needs_header,
            written: HashSet::new(),
        })
    }

    /// Treat these mints as already written
    pub fn with_seen(mut self, seen: impl IntoIterator<Item = String>) -> Self {
        self.written.extend(seen);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and make it durable
    pub fn append(&mut self, record: &TokenRecord) -> Result<(), StoreError> {
        record.validate()?;
        if self.written.contains(&record.mint) {
            return Err(StoreError::Duplicate(record.mint.clone()));
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(self.needs_header)
            .from_writer(&mut self.file);
        writer.serialize(record)?;
        writer.flush()?;
        drop(writer);
        self.file.sync_data()?;

        self.needs_header = false;
        self.written.insert(record.mint.clone());
        Ok(())
    }
}

/// A token that produced no row
#[derive(Debug, Clone, PartialEq)]
pub struct FailedToken {
    pub mint: String,
    pub reason: String,
}

/// What one `process` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Transactions handed to `process`
    pub received: usize,
    /// Dropped because the mint was already in the result set
    pub skipped_existing: usize,
    /// Dropped because the mint occurred earlier in the same batch
    pub skipped_duplicate: usize,
    /// Units scheduled on the worker pool
    pub scheduled: usize,
    /// Mints appended, in completion order
    pub written: Vec<String>,
    pub failed: Vec<FailedToken>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

struct Outcome {
    mint: String,
    result: Result<TokenRecord, EnrichError>,
}

/// Deduplicating store over one result file
pub struct ResultStore {
    writer: Arc<tokio::sync::Mutex<ResultWriter>>,
    seen: HashSet<String>,
    workers: usize,
    ctx: RunContext,
}

impl ResultStore {
    /// Read existing mints and open the file for appending
    pub fn open(path: &Path, workers: usize, ctx: RunContext) -> Result<Self, StoreError> {
        let seen = load_seen_mints(path)?;
        debug!(path = %path.display(), existing = seen.len(), "Result set loaded");
        let writer = ResultWriter::open(path)?.with_seen(seen.iter().cloned());
        Ok(Self {
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            seen,
            workers: workers.max(1),
            ctx,
        })
    }

    pub fn seen_mints(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Enrich and persist every transaction whose mint is not yet stored
    pub async fn process(
        &self,
        transactions: Vec<Transaction>,
        enricher: Arc<dyn TokenEnricher>,
    ) -> Result<RunSummary, StoreError> {
        let mut summary = RunSummary {
            received: transactions.len(),
            ..Default::default()
        };
        let work = self.plan(transactions, &mut summary);
        summary.scheduled = work.len();
        let span = self.ctx.span().clone();

        span.in_scope(|| {
            info!(
                scheduled = summary.scheduled,
                existing = summary.skipped_existing,
                duplicates = summary.skipped_duplicate,
                workers = self.workers,
                "Scheduling enrichment"
            )
        });
        if work.is_empty() {
            return Ok(summary);
        }

        let queue = Arc::new(Mutex::new(work));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Outcome>();

        let worker_count = self.workers.min(summary.scheduled);
        let mut handles = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let queue = queue.clone();
            let enricher = enricher.clone();
            let done_tx = done_tx.clone();
            handles.push(tokio::spawn(
                run_worker(worker, queue, enricher, done_tx).instrument(span.clone()),
            ));
        }
        drop(done_tx);

        while let Some(outcome) = done_rx.recv().await {
            self.record_outcome(outcome, &mut summary)
                .instrument(span.clone())
                .await;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                span.in_scope(|| error!("Worker task failed: {}", e));
            }
        }

        span.in_scope(|| {
            info!(
                written = summary.written.len(),
                failed = summary.failed.len(),
                "Enrichment finished"
            )
        });
        Ok(summary)
    }

    /// Fixed work set: unseen mints, first occurrence only
    fn plan(&self, transactions: Vec<Transaction>, summary: &mut RunSummary) -> VecDeque<Transaction> {
        let mut scheduled = HashSet::new();
        let mut work = VecDeque::with_capacity(transactions.len());
        for transaction in transactions {
            let mint = transaction.mint();
            if self.seen.contains(mint) {
                summary.skipped_existing += 1;
            } else if !scheduled.insert(mint.to_string()) {
                summary.skipped_duplicate += 1;
            } else {
                work.push_back(transaction);
            }
        }
        work
    }

    async fn record_outcome(&self, outcome: Outcome, summary: &mut RunSummary) {
        let Outcome { mint, result } = outcome;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(mint = %mint, "No row written: {}", e);
                summary.failed.push(FailedToken {
                    mint,
                    reason: e.to_string(),
                });
                return;
            }
        };

        // The lock travels with the blocking append, so the row is synced
        // before the next writer gets in
        let writer = self.writer.clone().lock_owned().await;
        let appended = tokio::task::spawn_blocking(move || {
            let mut writer = writer;
            writer.append(&record).map(|()| writer.path().to_path_buf())
        })
        .await;

        let reason = match appended {
            Ok(Ok(path)) => {
                debug!(mint = %mint, path = %path.display(), "Row appended");
                summary.written.push(mint);
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("append task failed: {}", e),
        };
        error!(mint = %mint, "Failed to append row: {}", reason);
        summary.failed.push(FailedToken { mint, reason });
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<VecDeque<Transaction>>>,
    enricher: Arc<dyn TokenEnricher>,
    done: mpsc::UnboundedSender<Outcome>,
) {
    loop {
        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let Some(transaction) = next else {
            break;
        };
        let mint = transaction.mint().to_string();
        debug!(worker, mint = %mint, "Unit started");

        let enricher = enricher.clone();
        let unit = tokio::spawn(
            async move { enricher.enrich(&transaction).await }.in_current_span(),
        );
        let result = match unit.await {
            Ok(result) => result,
            Err(e) => Err(EnrichError::Aborted(abort_reason(e))),
        };

        if done.send(Outcome { mint, result }).is_err() {
            break;
        }
    }
}

fn abort_reason(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{sample_record, sample_transaction, ScriptedEnricher};
    use std::time::Duration;
    use tempfile::TempDir;

    fn batch(mints: &[&str]) -> Vec<Transaction> {
        mints.iter().map(|m| sample_transaction(m)).collect()
    }

    fn rows(path: &Path) -> Vec<String> {
        let mut mints: Vec<String> = read_column(path, MINT_COLUMN).unwrap().into_iter().collect();
        mints.sort();
        mints
    }

    #[test]
    fn test_writer_header_once_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        ResultWriter::open(&path).unwrap().append(&sample_record("a")).unwrap();
        ResultWriter::open(&path).unwrap().append(&sample_record("b")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name,symbol,mint,volume,holder_count,image_uri"));
        assert!(lines[0].ends_with("current_market_cap,current_market_cap_timestamp"));
        assert_eq!(content.matches("name,symbol").count(), 1);
    }

    #[test]
    fn test_writer_refuses_invalid_and_duplicate() {
        let dir = TempDir::new().unwrap();
        let mut writer = ResultWriter::open(&dir.path().join("r.csv")).unwrap();

        let mut invalid = sample_record("x");
        invalid.raydium_pool.clear();
        assert!(matches!(writer.append(&invalid), Err(StoreError::InvalidRecord(_))));

        writer.append(&sample_record("x")).unwrap();
        assert!(matches!(writer.append(&sample_record("x")), Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn test_seen_mints() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        assert!(load_seen_mints(&path).unwrap().is_empty());

        fs::write(&path, "").unwrap();
        assert!(load_seen_mints(&path).unwrap().is_empty());

        fs::write(&path, "name,symbol\nA,B\n").unwrap();
        assert!(matches!(load_seen_mints(&path), Err(StoreError::MissingColumn { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_skips_existing_and_batch_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        ResultWriter::open(&path).unwrap().append(&sample_record("old")).unwrap();

        let store = ResultStore::open(&path, 3, RunContext::detached()).unwrap();
        let enricher = ScriptedEnricher::new().into_shared();
        let summary = store
            .process(batch(&["old", "new1", "new2", "new1"]), enricher.clone())
            .await
            .unwrap();

        assert_eq!(summary.received, 4);
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(summary.scheduled, 2);
        assert_eq!(summary.written.len(), 2);
        let mut calls = enricher.get_calls();
        calls.sort();
        assert_eq!(calls, vec!["new1".to_string(), "new2".to_string()]);
        assert_eq!(rows(&path), vec!["new1", "new2", "old"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failures_write_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let store = ResultStore::open(&path, 2, RunContext::detached()).unwrap();
        let enricher = ScriptedEnricher::new()
            .with_failure("bad", EnrichError::NoPriceHistory)
            .into_shared();

        let summary = store.process(batch(&["good", "bad"]), enricher).await.unwrap();

        assert_eq!(summary.written, vec!["good".to_string()]);
        assert_eq!(
            summary.failed,
            vec![FailedToken {
                mint: "bad".into(),
                reason: EnrichError::NoPriceHistory.to_string()
            }]
        );
        assert_eq!(rows(&path), vec!["good"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panicking_unit_is_isolated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let store = ResultStore::open(&path, 2, RunContext::detached()).unwrap();
        let enricher = ScriptedEnricher::new().with_panic("boom").into_shared();

        let summary = store
            .process(batch(&["a", "boom", "b", "c"]), enricher)
            .await
            .unwrap();

        assert_eq!(summary.completed(), 4);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].mint, "boom");
        assert!(summary.failed[0].reason.contains("scripted panic for boom"));
        assert_eq!(rows(&path), vec!["a", "b", "c"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_is_bounded() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(&dir.path().join("r.csv"), 3, RunContext::detached()).unwrap();
        let enricher = ScriptedEnricher::new()
            .with_delay(Duration::from_millis(20))
            .into_shared();
        let mints: Vec<String> = (0..12).map(|i| format!("mint{}", i)).collect();
        let refs: Vec<&str> = mints.iter().map(String::as_str).collect();

        let summary = store.process(batch(&refs), enricher.clone()).await.unwrap();

        assert_eq!(summary.written.len(), 12);
        assert!(enricher.peak_concurrency() <= 3);
        assert!(enricher.peak_concurrency() >= 2);
    }

    #[tokio::test]
    async fn test_appends_on_single_threaded_runtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let store = ResultStore::open(&path, 2, RunContext::detached()).unwrap();
        let enricher = ScriptedEnricher::new()
            .with_delay(Duration::from_millis(5))
            .into_shared();

        let summary = store.process(batch(&["a", "b", "c"]), enricher).await.unwrap();

        assert_eq!(summary.written.len(), 3);
        assert_eq!(rows(&path), vec!["a", "b", "c"]);
        // Lock released after the last append
        assert!(store.writer.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_nothing_to_do() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(&dir.path().join("r.csv"), 2, RunContext::detached()).unwrap();
        let summary = store
            .process(Vec::new(), ScriptedEnricher::new().into_shared())
            .await
            .unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
