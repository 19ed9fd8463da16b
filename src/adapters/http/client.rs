//! Resilient HTTP Client
//!
//! Executes one logical request, moving across routes when the transport
//! fails:
//! - reconnect a few times on the current route
//! - then mark the proxy dead and pick another at random
//! - then go direct
//! - then give up with a status 0 response
//!
//! HTTP error statuses are answers, not transport failures; they are
//! returned as-is and never retried here.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::connector::{Connection, Connector, HttpRequest, RawResponse, Route, TransportError};
use super::proxy_pool::ProxyPool;
use super::response::ApiResponse;

/// Resilient client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Route through the proxy pool when it has viable proxies
    pub use_proxies: bool,
    /// Reconnects on the same route after its first failure
    pub reconnect_retries: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            use_proxies: true,
            reconnect_retries: 2,
        }
    }
}

/// Client owning at most one open connection at a time
///
/// Not shared between workers. The connection is closed exactly once,
/// either by `close` or on drop.
pub struct ResilientHttpClient {
    connector: Arc<dyn Connector>,
    pool: Arc<ProxyPool>,
    config: HttpClientConfig,
    route: Route,
    connection: Option<Box<dyn Connection>>,
    /// Proxies this client already gave up on
    abandoned: HashSet<usize>,
}

impl ResilientHttpClient {
    pub fn new(connector: Arc<dyn Connector>, pool: Arc<ProxyPool>, config: HttpClientConfig) -> Self {
        let mut client = Self {
            connector,
            pool,
            config,
            route: Route::Direct,
            connection: None,
            abandoned: HashSet::new(),
        };
        client.route = client.next_route();
        client
    }

    /// Route the next attempt will use
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Execute a request, failing over between routes on transport errors
    pub async fn execute(&mut self, request: &HttpRequest) -> ApiResponse {
        loop {
            let mut last_error = None;

            for attempt in 0..=self.config.reconnect_retries {
                match self.attempt(request).await {
                    Ok(raw) => {
                        if let Some(id) = self.route.proxy_id() {
                            self.pool.mark_alive(id);
                        }
                        return ApiResponse::from_raw(raw);
                    }
                    Err(error) if !error.is_connection_failure() => {
                        return ApiResponse::transport_failure(error.to_string());
                    }
                    Err(error) => {
                        warn!(
                            route = %self.route,
                            attempt = attempt + 1,
                            url = %request.url,
                            "Transport failure: {}", error
                        );
                        if attempt == 0 {
                            if let Some(id) = self.route.proxy_id() {
                                self.pool.mark_failed(id);
                            }
                        }
                        last_error = Some(error);
                    }
                }
            }

            let reason = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string());

            match self.route.proxy_id() {
                Some(id) => {
                    self.pool.mark_dead(id);
                    self.abandoned.insert(id);
                    self.route = self.next_route();
                    info!(route = %self.route, "Failing over");
                }
                None => {
                    warn!(url = %request.url, "All routes exhausted");
                    return ApiResponse::transport_failure(format!(
                        "all routes exhausted for {}: {}",
                        request.url, reason
                    ));
                }
            }
        }
    }

    /// Close the open connection, if any
    pub fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            debug!(route = %connection.route(), "Closing connection");
            connection.close();
        }
    }

    async fn attempt(&mut self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        if self.connection.is_none() {
            let connection = self.connector.connect(&self.route).await?;
            self.connection = Some(connection);
        }

        let result = match self.connection.as_mut() {
            Some(connection) => connection.send(request).await,
            None => Err(TransportError::Connect("no connection".into())),
        };

        if matches!(&result, Err(e) if e.is_connection_failure()) {
            self.close();
        }
        result
    }

    fn next_route(&self) -> Route {
        if !self.config.use_proxies {
            return Route::Direct;
        }
        self.pool
            .pick(&self.abandoned)
            .map(Route::Proxy)
            .unwrap_or(Route::Direct)
    }
}

impl Drop for ResilientHttpClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Shared source of resilient clients
///
/// Cheap to clone; every clone shares the connector, the proxy pool and the
/// idle clients. `send` borrows an idle client for the duration of one
/// request and hands it back afterwards, so the number of clients ever built
/// equals the peak number of concurrent requests (one per worker) and each
/// keeps its connection and route between requests. A client is never used
/// by two requests at once.
#[derive(Clone)]
pub struct HttpClientFactory {
    connector: Arc<dyn Connector>,
    pool: Arc<ProxyPool>,
    config: HttpClientConfig,
    idle: Arc<Mutex<Vec<ResilientHttpClient>>>,
}

impl HttpClientFactory {
    pub fn new(connector: Arc<dyn Connector>, pool: Arc<ProxyPool>, config: HttpClientConfig) -> Self {
        Self {
            connector,
            pool,
            config,
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A new client, not tracked by the factory
    pub fn client(&self) -> ResilientHttpClient {
        ResilientHttpClient::new(self.connector.clone(), self.pool.clone(), self.config.clone())
    }

    /// Execute one request on an idle client, building one if none is free
    pub async fn send(&self, request: HttpRequest) -> ApiResponse {
        let mut client = self.checkout();
        let response = client.execute(&request).await;
        self.lock_idle().push(client);
        response
    }

    /// Clients waiting for the next request
    pub fn idle_clients(&self) -> usize {
        self.lock_idle().len()
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    fn checkout(&self) -> ResilientHttpClient {
        let reused = self.lock_idle().pop();
        reused.unwrap_or_else(|| self.client())
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<ResilientHttpClient>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
