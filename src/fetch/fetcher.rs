//! Resilient Fetcher
//!
//! One logical request is an attempt chain:
//!
//! ```text
//! ATTEMPT --success--> DONE(value)
//! ATTEMPT --failure & retries > 0--> WAIT(delay) -> ATTEMPT(retries - 1)
//! ATTEMPT --failure & retries == 0--> DONE(NetworkFailure)
//! ```
//!
//! Attempts run strictly one after another. Each attempt races the whole
//! send/status/decode sequence against the request timeout; losing the race
//! drops the in-flight request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{RequestOptions, COMPONENT};
use crate::cache::ExpiringCache;
use crate::config::Config;
use crate::error::{AttemptError, ConfigError, NetworkFailure};
use crate::metrics::PerformanceMetrics;
use crate::observability::{FailureContext, FailureReporter, TracingReporter};

/// Header carrying the client version on every request.
pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

// == Retry Policy ==
/// Retry count and the constant delay slept between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn constant(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Upper bound on the time one logical request can take, saturating at
    /// [`Duration::MAX`].
    pub fn worst_case(&self, timeout: Duration) -> Duration {
        timeout
            .saturating_add(self.delay)
            .saturating_mul(self.retries.saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::constant(3, Duration::from_secs(1))
    }
}

struct ResponseCache {
    store: ExpiringCache<Value>,
    ttl: Duration,
}

// == Resilient Fetcher ==
pub struct ResilientFetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    metrics: Arc<PerformanceMetrics>,
    reporter: Arc<dyn FailureReporter>,
    cache: Option<ResponseCache>,
}

impl ResilientFetcher {
    // == Constructor ==
    /// Builds a fetcher with a [`TracingReporter`] and no response cache.
    ///
    /// # Arguments
    /// * `base_url` - Prefix for every endpoint path
    /// * `client_version` - Value of the `X-Client-Version` header
    /// * `timeout` - Deadline for a single attempt
    /// * `retry` - Default retries and delay between attempts
    /// * `metrics` - Shared counters; one call is recorded per attempt
    pub fn new(
        base_url: impl Into<String>,
        client_version: &str,
        timeout: Duration,
        retry: RetryPolicy,
        metrics: Arc<PerformanceMetrics>,
    ) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let version = HeaderValue::from_str(client_version)
            .map_err(|e| ConfigError::Invalid(format!("CLIENT_VERSION: {}", e)))?;
        headers.insert(CLIENT_VERSION_HEADER, version);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            retry,
            metrics,
            reporter: Arc::new(TracingReporter),
            cache: None,
        })
    }

    /// Builds a fetcher from gateway configuration.
    pub fn from_config(
        config: &Config,
        metrics: Arc<PerformanceMetrics>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(
            config.api_base_url.clone(),
            &config.client_version,
            config.api_timeout(),
            RetryPolicy::constant(config.max_retries, config.retry_delay()),
            metrics,
        )
    }

    /// Replaces the collaborator notified when a request gives up.
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Serves repeated body-less GETs from `cache` for `ttl`.
    pub fn with_cache(mut self, cache: ExpiringCache<Value>, ttl: Duration) -> Self {
        self.cache = Some(ResponseCache { store: cache, ttl });
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn metrics(&self) -> &Arc<PerformanceMetrics> {
        &self.metrics
    }

    /// Absolute URL for an endpoint path.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.is_empty() || endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    // == Fetch ==
    /// [`ResilientFetcher::request`] with the configured retry count.
    pub async fn fetch(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<Value, NetworkFailure> {
        self.request(endpoint, options, self.retry.retries).await
    }

    // == Request ==
    /// Runs one logical request with up to `retries` retries.
    ///
    /// Returns the parsed JSON body of the first successful attempt. Timeouts,
    /// transport errors, non-2xx statuses and undecodable bodies all consume a
    /// retry; once none are left the failure is reported and
    /// [`NetworkFailure`] is returned.
    pub async fn request(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        retries: u32,
    ) -> Result<Value, NetworkFailure> {
        let cached = self
            .cache
            .as_ref()
            .filter(|_| options.is_cacheable())
            .map(|cache| (cache, options.cache_key(endpoint)));

        if let Some((cache, key)) = &cached {
            if let Some(hit) = cache.store.get(key) {
                debug!(endpoint, key = %key, "Serving upstream response from cache");
                return Ok(hit);
            }
        }

        let value = self.request_uncached(endpoint, options, retries).await?;

        if let Some((cache, key)) = cached {
            cache.store.set(key, value.clone(), cache.ttl);
        }
        Ok(value)
    }

    async fn request_uncached(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        retries: u32,
    ) -> Result<Value, NetworkFailure> {
        let url = self.url_for(endpoint);
        let mut remaining = retries;
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            self.metrics.record_api_call();

            let error = match self.attempt(&url, options).await {
                Ok(value) => {
                    debug!(endpoint, attempts, "Upstream request succeeded");
                    return Ok(value);
                }
                Err(error) => error,
            };

            if remaining == 0 {
                self.metrics.record_error();
                let context = FailureContext {
                    component: COMPONENT,
                    endpoint,
                    attempts,
                };
                self.reporter.report(&error, &context);
                return Err(NetworkFailure);
            }

            warn!(
                endpoint,
                attempts,
                remaining,
                error = %error,
                "Upstream attempt failed, retrying in {}ms",
                self.retry.delay.as_millis()
            );
            remaining -= 1;
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    /// One attempt bounded by the request timeout.
    async fn attempt(&self, url: &str, options: &RequestOptions) -> Result<Value, AttemptError> {
        match tokio::time::timeout(self.timeout, self.send(url, options)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(self.timeout)),
        }
    }

    async fn send(&self, url: &str, options: &RequestOptions) -> Result<Value, AttemptError> {
        let mut builder = self.client.request(options.method.clone(), url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::HttpStatus(status));
        }

        response.json::<Value>().await.map_err(AttemptError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base_url: &str) -> ResilientFetcher {
        ResilientFetcher::new(
            base_url,
            "2.1.0",
            Duration::from_secs(10),
            RetryPolicy::default(),
            Arc::new(PerformanceMetrics::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_retry_policy_default_is_constant_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_worst_case_bound() {
        let policy = RetryPolicy::constant(2, Duration::from_millis(100));
        assert_eq!(
            policy.worst_case(Duration::from_millis(400)),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_worst_case_saturates() {
        let policy = RetryPolicy::constant(u32::MAX, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.worst_case(Duration::from_secs(u64::MAX / 2)), Duration::MAX);
    }

    #[test]
    fn test_url_for_joins_base_and_endpoint() {
        let fetcher = fetcher("https://api.example.com/v1/");

        assert_eq!(fetcher.url_for("/market"), "https://api.example.com/v1/market");
        assert_eq!(fetcher.url_for("trending"), "https://api.example.com/v1/trending");
        assert_eq!(fetcher.url_for(""), "https://api.example.com/v1");
    }

    #[test]
    fn test_invalid_client_version_rejected() {
        let result = ResilientFetcher::new(
            "http://localhost",
            "bad\nversion",
            Duration::from_secs(1),
            RetryPolicy::default(),
            Arc::new(PerformanceMetrics::new()),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_config_uses_configured_policy() {
        let config = Config {
            max_retries: 5,
            retry_delay_ms: 250,
            api_timeout_ms: 2_000,
            ..Config::default()
        };
        let fetcher =
            ResilientFetcher::from_config(&config, Arc::new(PerformanceMetrics::new())).unwrap();

        assert_eq!(
            fetcher.retry_policy(),
            RetryPolicy::constant(5, Duration::from_millis(250))
        );
        assert_eq!(fetcher.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_from_config_validates() {
        let config = Config {
            api_timeout_ms: 0,
            ..Config::default()
        };
        let result = ResilientFetcher::from_config(&config, Arc::new(PerformanceMetrics::new()));
        assert!(result.is_err());
    }
}
