//! Compressed diagnostic payloads
//!
//! Scraped pages are large; failures log them zlib-compressed and base64
//! encoded so one log line still carries the full evidence.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Payload failed to inflate: {0}")]
    Inflate(#[from] std::io::Error),
}

/// zlib + base64 encoding of `text`
pub fn compress_payload(text: &str) -> String {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(text.len() / 4), Compression::best());
    // Writes into a Vec cannot fail
    if encoder.write_all(text.as_bytes()).is_err() {
        return String::new();
    }
    STANDARD.encode(encoder.finish().unwrap_or_default())
}

/// Inverse of `compress_payload`
pub fn decompress_payload(encoded: &str) -> Result<String, PayloadError> {
    let compressed = STANDARD.decode(encoded.trim())?;
    let mut text = String::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_large_page() {
        let page = "0:[\"$\",\"html\"]\n".repeat(2_000);
        let encoded = compress_payload(&page);
        assert!(encoded.len() < page.len() / 10);
        assert_eq!(decompress_payload(&encoded).unwrap(), page);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(decompress_payload("not base64!!"), Err(PayloadError::Base64(_))));
        assert!(matches!(decompress_payload("aGVsbG8="), Err(PayloadError::Inflate(_))));
    }
}
