//! Transport Seam
//!
//! `Connector` opens a `Connection` bound to one route (direct or through a
//! proxy). The resilient client only talks to these traits, so failover can
//! be exercised without sockets. `ReqwestConnector` is the production
//! implementation: one reqwest client per connection, proxied with
//! `reqwest::Proxy::all` (HTTP and SOCKS alike).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde_json::Value;
use thiserror::Error;

use super::proxy_pool::ProxyEndpoint;

/// Transport error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection timed out: {0}")]
    Timeout(String),

    #[error("Connection reset: {0}")]
    Reset(String),

    /// The request itself could not be built; no route would help
    #[error("Invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Failures that a reconnect or another route may cure
    pub fn is_connection_failure(&self) -> bool {
        !matches!(self, TransportError::Request(_))
    }
}

/// Where a connection goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    Proxy(ProxyEndpoint),
}

impl Route {
    pub fn proxy_id(&self) -> Option<usize> {
        match self {
            Route::Direct => None,
            Route::Proxy(endpoint) => Some(endpoint.id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Direct => write!(f, "direct"),
            Route::Proxy(endpoint) => write!(f, "proxy {}", endpoint),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

/// One logical request against an absolute URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Ordered; repeated keys are allowed (`block_time[]`)
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }
}

/// Status line and body as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// An open transport bound to one route
#[async_trait]
pub trait Connection: Send {
    fn route(&self) -> &Route;

    async fn send(&mut self, request: &HttpRequest) -> Result<RawResponse, TransportError>;

    /// Release the transport; sending afterwards fails
    fn close(&mut self);
}

/// Opens connections for a route
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, route: &Route) -> Result<Box<dyn Connection>, TransportError>;
}

/// Reqwest connector configuration
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Production connector backed by reqwest
#[derive(Debug, Clone, Default)]
pub struct ReqwestConnector {
    config: ConnectorConfig,
}

impl ReqwestConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for ReqwestConnector {
    async fn connect(&self, route: &Route) -> Result<Box<dyn Connection>, TransportError> {
        let builder = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .user_agent(self.config.user_agent.as_str());

        let builder = match route {
            Route::Direct => builder.no_proxy(),
            Route::Proxy(endpoint) => {
                let proxy = Proxy::all(endpoint.uri.as_str())
                    .map_err(|e| TransportError::Connect(format!("bad proxy {}: {}", endpoint, e)))?;
                builder.proxy(proxy)
            }
        };

        let client = builder
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Box::new(ReqwestConnection {
            client: Some(client),
            route: route.clone(),
        }))
    }
}

struct ReqwestConnection {
    client: Option<Client>,
    route: Route,
}

#[async_trait]
impl Connection for ReqwestConnection {
    fn route(&self) -> &Route {
        &self.route
    }

    async fn send(&mut self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| TransportError::Connect("connection already closed".into()))?;

        let mut req = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req = match &request.body {
            Some(RequestBody::Json(value)) => req.json(value),
            Some(RequestBody::Text(text)) => req.body(text.clone()),
            None => req,
        };

        let response = req.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        })
    }

    fn close(&mut self) {
        // Dropping the client releases its pooled sockets
        self.client.take();
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    let message = error.to_string();
    if error.is_builder() {
        TransportError::Request(message)
    } else if error.is_timeout() {
        TransportError::Timeout(message)
    } else if error.is_connect() {
        TransportError::Connect(message)
    } else {
        TransportError::Reset(message)
    }
}
