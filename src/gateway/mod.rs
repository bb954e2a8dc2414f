//! Cached, retried JSON fetcher shared by every upstream provider.
//!
//! Knows nothing about graphs: a request goes in, a `serde_json::Value` comes
//! out, or an error once the retry budget is spent.

mod cache;

pub use cache::{Clock, ManualClock, ResponseCache, SystemClock};

use crate::config::GatewayConfig;
use crate::error::{FollowGraphError, Result};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// HTTP method of a gateway request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request as seen by the gateway; also the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GatewayRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
}

impl GatewayRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
        }
    }

    /// POST with a JSON body
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body.into()),
        }
    }
}

/// Retry budget and backoff shape
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first; total attempts = max_retries + 1
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            retry_client_errors: config.retry_client_errors,
        }
    }

    fn should_retry(&self, err: &FollowGraphError) -> bool {
        err.is_retryable()
            || (self.retry_client_errors && matches!(err, FollowGraphError::Rejected { .. }))
    }
}

/// Cached and retried JSON fetcher
///
/// Successful responses are cached by exact request for the cache's TTL.
/// Network errors, 5xx/429 responses and malformed bodies are retried with
/// exponential backoff; when the budget runs out the call fails with
/// [`FollowGraphError::TransportExhausted`].
pub struct RequestGateway {
    client: Client,
    cache: Arc<ResponseCache>,
    policy: RetryPolicy,
}

impl RequestGateway {
    pub fn new(client: Client, cache: Arc<ResponseCache>, policy: RetryPolicy) -> Self {
        Self {
            client,
            cache,
            policy,
        }
    }

    /// Build a gateway with its own HTTP client and cache from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FollowGraphError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let cache = Arc::new(ResponseCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        ));

        Ok(Self::new(client, cache, RetryPolicy::from_config(config)))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Shorthand for a cached GET
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        self.fetch(&GatewayRequest::get(url)).await
    }

    /// Fetch a JSON value, from cache when fresh, otherwise with retries
    pub async fn fetch(&self, request: &GatewayRequest) -> Result<Value> {
        if let Some(cached) = self.cache.get(request) {
            log::debug!("Cache hit for {:?} {}", request.method, request.url);
            return Ok(cached);
        }

        let start = std::time::Instant::now();
        let mut attempt = 0;
        let mut delay = self.policy.initial_backoff;

        loop {
            match self.send_once(request).await {
                Ok(value) => {
                    log::debug!(
                        "{:?} {} took {:?} (attempt {})",
                        request.method,
                        request.url,
                        start.elapsed(),
                        attempt + 1
                    );
                    self.cache.put(request.clone(), value.clone());
                    return Ok(value);
                }
                Err(e) if !self.policy.should_retry(&e) => return Err(e),
                Err(e) if attempt < self.policy.max_retries => {
                    log::warn!(
                        "Retry {}/{} for {} after error: {}",
                        attempt + 1,
                        self.policy.max_retries,
                        request.url,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.policy.max_backoff);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FollowGraphError::TransportExhausted {
                        url: request.url.clone(),
                        attempts: attempt + 1,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// One uncached, unretried GET that must answer 2xx within `deadline`
    pub async fn ping(&self, url: &str, deadline: Duration) -> Result<()> {
        let response = tokio::time::timeout(deadline, self.client.get(url).send())
            .await
            .map_err(|_| FollowGraphError::Network(format!("{} did not answer within {:?}", url, deadline)))?
            .map_err(|e| FollowGraphError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FollowGraphError::Rejected {
                status: response.status().as_u16(),
                body: None,
            });
        }
        Ok(())
    }

    async fn send_once(&self, request: &GatewayRequest) -> Result<Value> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(body.clone()),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| FollowGraphError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FollowGraphError::Network(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(FollowGraphError::Rejected {
                status: status.as_u16(),
                body: serde_json::from_str(&text).ok(),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| FollowGraphError::Decode(format!("Failed to parse response from {}: {}", request.url, e)))
    }
}
