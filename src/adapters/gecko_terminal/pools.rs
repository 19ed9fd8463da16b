use async_trait::async_trait;

use super::GECKO_TERMINAL_POOLS_ENDPOINT;
use crate::adapters::http::{HttpClientFactory, HttpRequest};
use crate::domain::PoolDocument;
use crate::ports::{PoolSource, SourceError};

/// Pool documents by Raydium pool address
#[derive(Clone)]
pub struct GeckoPoolSource {
    http: HttpClientFactory,
    base_url: String,
}

impl GeckoPoolSource {
    pub fn new(http: HttpClientFactory, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn pool_request(&self, pool_address: &str) -> HttpRequest {
        HttpRequest::get(format!(
            "{}{}/{}",
            self.base_url, GECKO_TERMINAL_POOLS_ENDPOINT, pool_address
        ))
        .query("include", "tokens.tags")
        .query("base_token", 0)
        .header("accept", "application/json")
    }
}

#[async_trait]
impl PoolSource for GeckoPoolSource {
    /// Returns the document as served; completeness is the caller's concern
    async fn fetch_pool(&self, pool_address: &str) -> Result<PoolDocument, SourceError> {
        let body = self.http.send(self.pool_request(pool_address)).await.into_json()?;
        PoolDocument::from_value(body)
            .map_err(|e| SourceError::Malformed(format!("pool document for {}: {}", pool_address, e)))
    }
}
