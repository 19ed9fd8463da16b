//! Uniform response value returned by the resilient client

use serde_json::Value;
use thiserror::Error;

use super::connector::RawResponse;
use crate::ports::SourceError;

/// Status used when no response was ever received
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// HTTP error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("Request failed on every route: {0}")]
    Exhausted(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Body(String),
}

impl From<HttpError> for SourceError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Exhausted(message) => SourceError::Transport(message),
            HttpError::Status { status, message } => SourceError::Status { status, message },
            HttpError::Body(message) => SourceError::Malformed(message),
        }
    }
}

/// Decoded body; a JSON body keeps the text it was decoded from
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json { value: Value, raw: String },
    Text(String),
}

/// Status, optional error message and optional decoded body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub error: Option<String>,
    pub body: Option<ResponseBody>,
}

impl ApiResponse {
    /// Wrap a received response
    ///
    /// Status >= 400 sets `error` to the reason phrase and keeps the body as
    /// text. Otherwise the body is JSON-decoded when it parses, raw text when
    /// it does not, and absent when empty.
    pub fn from_raw(raw: RawResponse) -> Self {
        if raw.status >= 400 {
            return Self {
                status: raw.status,
                error: Some(raw.reason),
                body: (!raw.body.is_empty()).then(|| ResponseBody::Text(raw.body)),
            };
        }

        let body = if raw.body.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(&raw.body) {
                Ok(value) => Some(ResponseBody::Json { value, raw: raw.body }),
                Err(_) => Some(ResponseBody::Text(raw.body)),
            }
        };

        Self {
            status: raw.status,
            error: None,
            body,
        }
    }

    /// Nothing was received on any route
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            status: TRANSPORT_FAILURE_STATUS,
            error: Some(message.into()),
            body: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..400).contains(&self.status)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE_STATUS
    }

    pub fn raise_for_status(&self) -> Result<(), HttpError> {
        if self.is_transport_failure() {
            return Err(HttpError::Exhausted(self.error.clone().unwrap_or_default()));
        }
        if let Some(message) = &self.error {
            return Err(HttpError::Status {
                status: self.status,
                message: message.clone(),
            });
        }
        Ok(())
    }

    /// Decoded JSON body, if the body was JSON
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Some(ResponseBody::Json { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Body exactly as received, regardless of how it was decoded
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            Some(ResponseBody::Text(text)) | Some(ResponseBody::Json { raw: text, .. }) => Some(text),
            None => None,
        }
    }

    /// Successful JSON body or the reason there is none
    pub fn into_json(self) -> Result<Value, HttpError> {
        self.raise_for_status()?;
        match self.body {
            Some(ResponseBody::Json { value, .. }) => Ok(value),
            Some(ResponseBody::Text(text)) => Err(HttpError::Body(format!(
                "expected JSON, got {} bytes of text",
                text.len()
            ))),
            None => Err(HttpError::Body("empty body".into())),
        }
    }

    /// Successful body as text or the reason there is none
    pub fn into_text(self) -> Result<String, HttpError> {
        self.raise_for_status()?;
        match self.body {
            Some(ResponseBody::Text(text)) | Some(ResponseBody::Json { raw: text, .. }) => Ok(text),
            None => Err(HttpError::Body("empty body".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, reason: &str, body: &str) -> RawResponse {
        RawResponse {
            status,
            reason: reason.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_json_body_decoded() {
        let response = ApiResponse::from_raw(raw(200, "OK", r#"{"data": 42}"#));
        assert!(response.is_success());
        assert_eq!(response.json(), Some(&json!({"data": 42})));
        assert_eq!(response.into_json().unwrap()["data"], 42);
    }

    #[test]
    fn test_json_body_text_is_unmodified() {
        let body = "{ \"data\" : 42,\n  \"b\": 1.50 }";
        let response = ApiResponse::from_raw(raw(200, "OK", body));
        assert_eq!(response.json(), Some(&json!({"data": 42, "b": 1.5})));
        assert_eq!(response.text(), Some(body));
        assert_eq!(response.into_text().unwrap(), body);
    }

    #[test]
    fn test_text_body_kept_raw() {
        let response = ApiResponse::from_raw(raw(200, "OK", "Signature,Time\nabc,1"));
        assert!(response.json().is_none());
        assert_eq!(response.text().unwrap(), "Signature,Time\nabc,1");
    }

    #[test]
    fn test_error_status_not_decoded() {
        let response = ApiResponse::from_raw(raw(429, "Too Many Requests", r#"{"error":"slow down"}"#));
        assert!(!response.is_success());
        assert_eq!(response.error.as_deref(), Some("Too Many Requests"));
        assert!(response.json().is_none());
        assert_eq!(
            response.raise_for_status(),
            Err(HttpError::Status {
                status: 429,
                message: "Too Many Requests".into()
            })
        );
    }

    #[test]
    fn test_transport_failure() {
        let response = ApiResponse::from_raw(raw(204, "No Content", ""));
        assert!(response.body.is_none());

        let failed = ApiResponse::transport_failure("all routes exhausted");
        assert_eq!(failed.status, 0);
        assert!(failed.is_transport_failure());
        let error: SourceError = failed.into_json().unwrap_err().into();
        assert_eq!(error, SourceError::Transport("all routes exhausted".into()));
    }
}
