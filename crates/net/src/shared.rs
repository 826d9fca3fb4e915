//! Lazily built client that is rebuilt when cache settings change

use crate::client::{NetClient, NetConfig};
use crate::transport::{HttpReply, HttpTransport, TransportFailure};
use async_trait::async_trait;
use imgbind_config::CacheConfig;
use imgbind_errors::Error;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

struct SharedState {
    config: NetConfig,
    client: Option<NetClient>,
}

/// Process-wide transport handle
///
/// The reqwest client is created on first use. Changing the cache settings
/// drops it so the next request picks the new settings up; setting equal
/// values keeps the existing client and its connection pool.
#[derive(Clone)]
pub struct SharedClient {
    state: Arc<RwLock<SharedState>>,
}

impl SharedClient {
    #[must_use]
    pub fn new(config: NetConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(SharedState {
                config,
                client: None,
            })),
        }
    }

    /// The current client, building it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn client(&self) -> Result<NetClient, Error> {
        if let Some(client) = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .client
            .clone()
        {
            return Ok(client);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = &state.client {
            return Ok(client.clone());
        }
        let client = NetClient::new(state.config.clone())?;
        state.client = Some(client.clone());
        Ok(client)
    }

    /// Replace the cache settings
    ///
    /// Returns `true` when the settings differed and the client was dropped.
    pub fn update_cache(&self, cache: CacheConfig) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.config.cache == cache {
            return false;
        }
        tracing::debug!(policy = %cache.request_cache_policy, "cache settings changed, dropping HTTP client");
        state.config.cache = cache;
        state.client = None;
        true
    }

    #[must_use]
    pub fn cache_settings(&self) -> CacheConfig {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config
            .cache
            .clone()
    }

    /// Whether a client has been built since the last settings change
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .client
            .is_some()
    }
}

impl Default for SharedClient {
    fn default() -> Self {
        Self::new(NetConfig::default())
    }
}

#[async_trait]
impl HttpTransport for SharedClient {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportFailure> {
        let client = self
            .client()
            .map_err(|e| TransportFailure::new(e.to_string(), None))?;
        client.get(url).await
    }
}
