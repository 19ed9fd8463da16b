use async_trait::async_trait;

use super::router_state::encode_router_state_tree;
use crate::adapters::http::{HttpClientFactory, HttpRequest};
use crate::ports::{CoinPageSource, SourceError};

/// Default site root
pub const PUMPFUN_BASE_URL: &str = "https://pump.fun";
/// RSC cache-buster the site expects on coin page fetches
pub const RSC_QUERY: &str = "1h9q6";

/// Fetches the RSC payload of a coin page
#[derive(Clone)]
pub struct PumpFunCoinPages {
    http: HttpClientFactory,
    base_url: String,
    user_agent: String,
}

impl PumpFunCoinPages {
    pub fn new(http: HttpClientFactory, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    fn page_request(&self, mint: &str) -> HttpRequest {
        HttpRequest::get(format!("{}/coin/{}", self.base_url, mint))
            .query("_rsc", RSC_QUERY)
            .header("accept", "*/*")
            .header("user-agent", self.user_agent.as_str())
            .header("dnt", "1")
            .header("rsc", "1")
            .header("next-router-state-tree", encode_router_state_tree(mint))
    }
}

#[async_trait]
impl CoinPageSource for PumpFunCoinPages {
    async fn fetch_coin_page(&self, mint: &str) -> Result<String, SourceError> {
        let body = self.http.send(self.page_request(mint)).await.into_text()?;
        if body.trim().is_empty() {
            return Err(SourceError::Empty(format!("coin page for {} is empty", mint)));
        }
        Ok(body)
    }
}
