//! Solscan Activity Export
//!
//! Fetches the CSV export of SPL transfers from the pump.fun migration
//! account into the Raydium authority for one window, and normalizes rows
//! into `Transaction`s. Incomplete or unconvertible rows are skipped with a
//! warning; the raw body is kept for the activity snapshot.

use async_trait::async_trait;
use csv::ReaderBuilder;
use tracing::{debug, warn};

use super::{SOLSCAN_EXPORT_ENDPOINT, SOLSCAN_ORIGIN};
use crate::adapters::http::{HttpClientFactory, HttpRequest};
use crate::domain::{ActivityWindow, Flow, Transaction};
use crate::ports::{ActivityExport, ActivitySource, SourceError};

/// pump.fun → Raydium migration account
pub const PUMPFUN_RAYDIUM_MIGRATION: &str = "39azUYFWPz3VHgKCf3VChUwbpURdCHRxjWVowf5jUJjg";
/// Raydium authority v4
pub const RAYDIUM_AUTHORITY_V4: &str = "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1";
/// Wrapped SOL, excluded from the export
pub const WSOL: &str = "So11111111111111111111111111111111111111112";
pub const ACTIVITY_SPL_TRANSFER: &str = "ACTIVITY_SPL_TRANSFER";

/// Export columns every kept row must fill
const REQUIRED_COLUMNS: [&str; 10] = [
    "Signature",
    "Time",
    "Action",
    "From",
    "To",
    "Amount",
    "Flow",
    "Value",
    "Decimals",
    "TokenAddress",
];

/// Activity source backed by the Solscan export endpoint
#[derive(Clone)]
pub struct SolscanActivitySource {
    http: HttpClientFactory,
    base_url: String,
}

impl SolscanActivitySource {
    pub fn new(http: HttpClientFactory, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn export_request(&self, window: &ActivityWindow) -> HttpRequest {
        HttpRequest::get(format!("{}{}", self.base_url, SOLSCAN_EXPORT_ENDPOINT))
            .query("address", PUMPFUN_RAYDIUM_MIGRATION)
            .query("activity_type[]", ACTIVITY_SPL_TRANSFER)
            .query("to", RAYDIUM_AUTHORITY_V4)
            .query("exclude_token", WSOL)
            .query("block_time[]", window.start)
            .query("block_time[]", window.end)
            .query("remove_spam", "true")
            .header("origin", SOLSCAN_ORIGIN)
    }
}

#[async_trait]
impl ActivitySource for SolscanActivitySource {
    async fn fetch_activity(&self, window: &ActivityWindow) -> Result<ActivityExport, SourceError> {
        let response = self.http.send(self.export_request(window)).await;
        let raw = response.into_text().map_err(SourceError::from)?;
        let transactions = parse_export(&raw)?;
        debug!(window = %window, rows = transactions.len(), "Activity export parsed");
        Ok(ActivityExport { raw, transactions })
    }
}

/// Normalize an export body into transactions
///
/// Row numbers in warnings are 1-based with the header as row 1.
pub fn parse_export(raw: &str) -> Result<Vec<Transaction>, SourceError> {
    if raw.trim().is_empty() {
        return Err(SourceError::Empty("activity export is empty".into()));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Malformed(format!("activity export header: {}", e)))?
        .clone();

    let mut positions = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == column)
            .ok_or_else(|| SourceError::Malformed(format!("activity export lacks column {}", column)))?;
    }

    let mut transactions = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Row {} skipped: unreadable record: {}", row, e);
                continue;
            }
        };

        let fields: Vec<&str> = positions
            .iter()
            .map(|&i| record.get(i).unwrap_or_default())
            .collect();
        if fields.iter().any(|f| f.is_empty()) {
            warn!("Row {} skipped: missing one or more required fields", row);
            continue;
        }

        match convert_row(&fields) {
            Ok(transaction) => transactions.push(transaction),
            Err(reason) => warn!("Row {} skipped due to conversion error: {}", row, reason),
        }
    }

    Ok(transactions)
}

fn convert_row(fields: &[&str]) -> Result<Transaction, String> {
    let [signature, time, action, sender, receiver, amount, flow, value, decimals, token_address] =
        fields
    else {
        return Err(format!("expected {} fields, got {}", REQUIRED_COLUMNS.len(), fields.len()));
    };

    Ok(Transaction {
        signature: signature.to_string(),
        time: time.to_string(),
        action: action.to_string(),
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        amount: parse_amount(amount)?,
        flow: Flow::parse(flow).ok_or_else(|| format!("unknown flow '{}'", flow))?,
        value: value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid value '{}'", value))?,
        decimals: decimals
            .parse::<u8>()
            .map_err(|_| format!("invalid decimals '{}'", decimals))?,
        token_address: token_address.to_string(),
    })
}

// Raw amounts are integers, but some exports render them as "123.0"
fn parse_amount(raw: &str) -> Result<u128, String> {
    if let Ok(amount) = raw.parse::<u128>() {
        return Ok(amount);
    }
    match raw.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 && amount.fract() == 0.0 => Ok(amount as u128),
        _ => Err(format!("invalid amount '{}'", raw)),
    }
}
