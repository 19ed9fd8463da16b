use async_trait::async_trait;
use serde_json::Value;

use super::{SOLSCAN_DEFI_POOL_INFO_ENDPOINT, SOLSCAN_HOLDER_ENDPOINT, SOLSCAN_ORIGIN};
use crate::adapters::http::{HttpClientFactory, HttpRequest};
use crate::ports::{HolderStatsSource, SourceError};

/// Holder total and 24h volume from Solscan
#[derive(Clone)]
pub struct SolscanHolderStats {
    http: HttpClientFactory,
    base_url: String,
}

impl SolscanHolderStats {
    pub fn new(http: HttpClientFactory, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, endpoint: &str, mint: &str) -> Result<Value, SourceError> {
        let request = HttpRequest::get(format!("{}{}", self.base_url, endpoint))
            .query("address", mint)
            .header("origin", SOLSCAN_ORIGIN)
            .header("accept", "application/json");
        let body = self.http.send(request).await.into_json()?;
        if !body.is_object() {
            return Err(SourceError::Malformed(format!("{} returned a non-object body", endpoint)));
        }
        Ok(body)
    }
}

#[async_trait]
impl HolderStatsSource for SolscanHolderStats {
    async fn holder_count(&self, mint: &str) -> Result<u64, SourceError> {
        let body = self.get_json(SOLSCAN_HOLDER_ENDPOINT, mint).await?;
        parse_holder_total(&body)
    }

    async fn volume_24h(&self, mint: &str) -> Result<f64, SourceError> {
        let body = self.get_json(SOLSCAN_DEFI_POOL_INFO_ENDPOINT, mint).await?;
        parse_volume_24h(&body)
    }
}

/// `{"data": <int>}`
fn parse_holder_total(body: &Value) -> Result<u64, SourceError> {
    let data = &body["data"];
    data.as_u64()
        .or_else(|| data.as_f64().filter(|v| *v >= 0.0 && v.fract() == 0.0).map(|v| v as u64))
        .ok_or_else(|| SourceError::Malformed(format!("holder total is not a count: {}", data)))
}

/// `{"data": {"total_volume_24h": <number>}}`
fn parse_volume_24h(body: &Value) -> Result<f64, SourceError> {
    let volume = &body["data"]["total_volume_24h"];
    volume
        .as_f64()
        .or_else(|| volume.as_str().and_then(|s| s.parse::<f64>().ok()))
        .filter(|v| v.is_finite())
        .ok_or_else(|| SourceError::Malformed(format!("24h volume missing or invalid: {}", volume)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_holder_total() {
        assert_eq!(parse_holder_total(&json!({"data": 1523})).unwrap(), 1523);
        assert_eq!(parse_holder_total(&json!({"data": 12.0})).unwrap(), 12);
        assert!(parse_holder_total(&json!({"data": -1})).is_err());
        assert!(parse_holder_total(&json!({"data": null})).is_err());
        assert!(parse_holder_total(&json!({"success": true})).is_err());
    }

    #[test]
    fn test_volume_24h() {
        let body = json!({"success": true, "data": {"total_volume_24h": 98765.43}});
        assert!((parse_volume_24h(&body).unwrap() - 98765.43).abs() < 1e-9);

        let as_string = json!({"data": {"total_volume_24h": "100.5"}});
        assert_eq!(parse_volume_24h(&as_string).unwrap(), 100.5);

        assert!(matches!(
            parse_volume_24h(&json!({"data": {}})),
            Err(SourceError::Malformed(_))
        ));
    }
}
