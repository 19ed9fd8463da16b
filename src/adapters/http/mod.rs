//! HTTP Transport
//!
//! Proxy-aware request execution shared by every upstream adapter.

pub mod proxy_pool;
pub mod connector;
pub mod response;
pub mod client;

pub use proxy_pool::{Liveness, ProxyEndpoint, ProxyError, ProxyPool, ProxyScheme};
pub use connector::{
    Connection, Connector, ConnectorConfig, HttpRequest, Method, RawResponse, ReqwestConnector,
    RequestBody, Route, TransportError,
};
pub use response::{ApiResponse, HttpError, ResponseBody};
pub use client::{HttpClientConfig, HttpClientFactory, ResilientHttpClient};
