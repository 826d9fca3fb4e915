//! HTTP client with connection pooling and cache policy headers

use crate::transport::{HttpReply, HttpTransport, TransportFailure};
use async_trait::async_trait;
use imgbind_config::{CacheConfig, Config};
use imgbind_errors::{Error, FetchError};
use imgbind_types::{CachePolicy, HttpResponse};
use reqwest::header::{HeaderValue, CACHE_CONTROL};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Network client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    pub cache: CacheConfig,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: default_user_agent(),
            cache: CacheConfig::default(),
        }
    }
}

impl NetConfig {
    /// Build client settings from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.network.timeout),
            connect_timeout: Duration::from_secs(config.network.connect_timeout),
            user_agent: config
                .network
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent),
            cache: config.cache.clone(),
            ..Self::default()
        }
    }
}

fn default_user_agent() -> String {
    format!("imgbind/{}", env!("CARGO_PKG_VERSION"))
}

/// `Cache-Control` request directive for a cache policy
///
/// `UseProtocolPolicy` sends nothing and lets response headers decide.
#[must_use]
pub fn cache_control_directive(policy: CachePolicy) -> Option<&'static str> {
    match policy {
        CachePolicy::UseProtocolPolicy => None,
        CachePolicy::ReloadIgnoringCache => Some("no-cache"),
        CachePolicy::ReturnCacheElseLoad => Some("max-stale"),
        CachePolicy::ReturnCacheOnly => Some("only-if-cached"),
    }
}

/// HTTP client wrapper used as the default transport
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        tracing::debug!(
            policy = %config.cache.request_cache_policy,
            memory_capacity = config.cache.memory_capacity_bytes,
            disk_capacity = config.cache.disk_capacity_bytes,
            "built HTTP client"
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Cache settings this client was built with
    #[must_use]
    pub fn cache_settings(&self) -> &CacheConfig {
        &self.config.cache
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpTransport for NetClient {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportFailure> {
        let mut request = self.client.get(url.clone());
        if let Some(directive) = cache_control_directive(self.config.cache.request_cache_policy) {
            request = request.header(CACHE_CONTROL, HeaderValue::from_static(directive));
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("request to {url} timed out")
            } else {
                e.to_string()
            };
            TransportFailure::new(message, None)
        })?;

        let snapshot = snapshot(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure::new(e.to_string(), Some(snapshot.clone())))?;

        Ok(HttpReply {
            response: snapshot,
            body,
        })
    }
}

fn snapshot(response: &Response) -> HttpResponse {
    let mut snapshot = HttpResponse::new(response.url().as_str(), response.status().as_u16());
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            snapshot.insert_header(name.as_str(), value);
        }
    }
    snapshot
}
