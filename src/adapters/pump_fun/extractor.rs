//! Coin metadata extraction from RSC coin pages
//!
//! The coin object sits inside a React Server Components line of the form
//! `2:["$","$9",null,{ ... "coin":{...} ...}]`. The marker is located with a
//! regex and the object after it is read with a streaming JSON deserializer,
//! which stops at the end of the first complete value.

use regex::Regex;
use serde_json::{Deserializer, Value};
use tracing::error;

use crate::diagnostics::compress_payload;
use crate::domain::CoinMeta;
use crate::ports::{ExtractError, MetadataExtractor};

/// Start of the embedded coin object
pub const COIN_MARKER: &str = r#"(?s)2:\["\$","\$9",null,\{.*?"coin":"#;

/// Page text served for unknown or not yet indexed mints
pub const NOT_FOUND_TEXT: &str = "coin doesn't exist or is still indexing";

/// `MetadataExtractor` driven by a marker regex
#[derive(Debug, Clone)]
pub struct RegexMetadataExtractor {
    marker: Regex,
}

impl RegexMetadataExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_marker(COIN_MARKER)
    }

    /// Use a different marker; the match must end right before the object
    pub fn with_marker(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(pattern)?,
        })
    }
}

impl MetadataExtractor for RegexMetadataExtractor {
    fn extract(&self, raw_payload: &str) -> Result<CoinMeta, ExtractError> {
        let Some(found) = self.marker.find(raw_payload) else {
            if raw_payload.contains(NOT_FOUND_TEXT) {
                return Err(ExtractError::NotFound);
            }
            let payload = compress_payload(raw_payload);
            error!("Failed to find coin data in response (compressed): {}", payload);
            return Err(ExtractError::MissingMarker { payload });
        };

        let rest = raw_payload[found.end()..].trim_start();
        let (fragment, value) = leading_object(rest).ok_or_else(|| {
            let payload = compress_payload(rest);
            error!("Coin object is not a complete JSON object (compressed): {}", payload);
            ExtractError::Malformed {
                reason: "coin object is missing or unterminated".into(),
                payload,
            }
        })?;

        serde_json::from_value::<CoinMeta>(value).map_err(|e| {
            let payload = compress_payload(fragment);
            error!("Failed to parse coin data (compressed): {}", payload);
            ExtractError::Malformed {
                reason: e.to_string(),
                payload,
            }
        })
    }
}

/// Leading JSON object of `text` and the slice it was read from
fn leading_object(text: &str) -> Option<(&str, Value)> {
    let mut stream = Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) if value.is_object() => Some((&text[..stream.byte_offset()], value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::decompress_payload;

    const COIN: &str = r#"{"mint":"Mint111pump","name":"Cat {in} Hat","symbol":"CIH","image_uri":"https://ipfs.io/ipfs/Qm","telegram":null,"twitter":"https://x.com/cih","website":null,"created_timestamp":1737374400000,"raydium_pool":"PoolAddr111","nested":{"a":{"b":1}},"usd_market_cap":61000.5}"#;

    fn page(coin: &str) -> String {
        format!(
            "0:[\"$\",\"html\"]\n1:{{}}\n2:[\"$\",\"$9\",null,{{\"params\":{{}},\"coin\":{},\"replies\":[]}}]\n",
            coin
        )
    }

    fn extractor() -> RegexMetadataExtractor {
        RegexMetadataExtractor::new().unwrap()
    }

    #[test]
    fn test_extracts_coin() {
        let meta = extractor().extract(&page(COIN)).unwrap();

        assert_eq!(meta.mint, "Mint111pump");
        assert_eq!(meta.name, "Cat {in} Hat");
        assert_eq!(meta.symbol, "CIH");
        assert_eq!(meta.telegram, None);
        assert_eq!(meta.twitter.as_deref(), Some("https://x.com/cih"));
        assert_eq!(meta.created_timestamp, Some(1_737_374_400_000));
        assert_eq!(meta.pool_address(), Some("PoolAddr111"));
    }

    #[test]
    fn test_not_found_page() {
        let raw = "3:T52,<p>This coin doesn't exist or is still indexing</p>";
        assert_eq!(extractor().extract(raw), Err(ExtractError::NotFound));
    }

    #[test]
    fn test_missing_marker_carries_compressed_page() {
        let raw = "0:[\"$\",\"html\"]\n1:{\"unrelated\":true}";
        match extractor().extract(raw) {
            Err(ExtractError::MissingMarker { payload }) => {
                assert_eq!(decompress_payload(&payload).unwrap(), raw);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_coin_json() {
        let bad = r#"{"mint":"Mint111pump","name":"X","created_timestamp":"soon"}"#;
        match extractor().extract(&page(bad)) {
            Err(ExtractError::Malformed { payload, .. }) => {
                assert_eq!(decompress_payload(&payload).unwrap(), bad);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_object() {
        let raw = "2:[\"$\",\"$9\",null,{\"coin\":{\"mint\":\"M\",\"name\":\"}";
        assert!(matches!(
            extractor().extract(raw),
            Err(ExtractError::Malformed { .. })
        ));
    }

    #[test]
    fn test_leading_object_stops_at_its_end() {
        let text = r#"{"a":"quote \" and brace }","b":{"c":2}},"replies":[]}]"#;
        let (fragment, value) = leading_object(text).unwrap();
        assert_eq!(fragment, r#"{"a":"quote \" and brace }","b":{"c":2}}"#);
        assert_eq!(value["b"]["c"], 2);
        assert!(leading_object("null,").is_none());
        assert!(leading_object(r#"{"open": "#).is_none());
    }
}
