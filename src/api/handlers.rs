//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{ExpiringCache, MAX_TTL};
use crate::config::Config;
use crate::error::{ConfigError, GatewayError, Result};
use crate::fetch::{RequestOptions, ResilientFetcher};
use crate::metrics::PerformanceMetrics;
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::scheduler::{Scheduler, TokioScheduler};

/// Application context shared across all handlers.
///
/// `cache` backs the `/cache` endpoints. Upstream responses live in the
/// separate `responses` store, which clients cannot write to.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<ResilientFetcher>,
    pub cache: ExpiringCache<Value>,
    pub responses: ExpiringCache<Value>,
    pub metrics: Arc<PerformanceMetrics>,
}

impl AppState {
    /// Builds the context from configuration with tokio-backed timers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        Self::with_scheduler(config, Arc::new(TokioScheduler::current()))
    }

    /// Builds the context from configuration with the given timer source.
    pub fn with_scheduler(
        config: &Config,
        scheduler: Arc<dyn Scheduler>,
    ) -> std::result::Result<Self, ConfigError> {
        let metrics = Arc::new(PerformanceMetrics::new());
        let cache = ExpiringCache::new(Arc::clone(&scheduler), config.cache_ttl())
            .with_max_entries(config.max_entries);
        let responses = ExpiringCache::new(scheduler, config.cache_ttl())
            .with_max_entries(config.max_entries);
        let fetcher = ResilientFetcher::from_config(config, Arc::clone(&metrics))?
            .with_cache(responses.clone(), config.cache_ttl());

        Ok(Self {
            fetcher: Arc::new(fetcher),
            cache,
            responses,
            metrics,
        })
    }
}

/// Handler for GET /api/*endpoint
///
/// Forwards the request upstream through the resilient fetcher, serving
/// repeated calls from cache. Query parameters are passed through in order,
/// repeated names included.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>> {
    let endpoint = format!("/{}", endpoint.trim_start_matches('/'));
    let options = params
        .into_iter()
        .fold(RequestOptions::get(), |options, (name, value)| {
            options.query(name, value)
        });

    let value = state.fetcher.fetch(&endpoint, &options).await?;
    Ok(Json(value))
}

/// Handler for PUT /cache
///
/// Stores a JSON value with an optional TTL in seconds.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(GatewayError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.cache.default_ttl())
        .min(MAX_TTL);
    state.cache.set(req.key.clone(), req.value, ttl);

    Ok(Json(SetResponse::new(req.key, ttl.as_secs())))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| GatewayError::NotFound(key.clone()))?;
    let ttl_remaining_ms = state
        .cache
        .ttl_remaining(&key)
        .map(|ttl| ttl.as_millis() as u64);

    Ok(Json(GetResponse::new(key, value, ttl_remaining_ms)))
}

/// Handler for DELETE /cache/:key
///
/// Idempotent: deleting an absent key succeeds with `deleted: false`.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key);
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.metrics.snapshot(),
        state.cache.stats(),
        state.responses.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use serde_json::json;

    fn test_state() -> (Arc<ManualScheduler>, AppState) {
        let scheduler = Arc::new(ManualScheduler::new());
        let config = Config {
            api_base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let state = AppState::with_scheduler(&config, scheduler.clone()).unwrap();
        (scheduler, state)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let (_, state) = test_state();

        let req = SetRequest {
            key: "market".to_string(),
            value: json!({"btc": 64000}),
            ttl: Some(60),
        };
        let response = set_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(response.ttl, 60);

        let response = get_handler(State(state), Path("market".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"btc": 64000}));
        assert_eq!(response.ttl_remaining_ms, Some(60_000));
    }

    #[tokio::test]
    async fn test_set_clamps_unbounded_ttl() {
        let (_, state) = test_state();
        state.cache.set("k", json!("old"), Duration::from_secs(60));

        let req = SetRequest {
            key: "k".to_string(),
            value: json!("new"),
            ttl: Some(u64::MAX),
        };
        let response = set_handler(State(state.clone()), Json(req)).await.unwrap();

        assert_eq!(response.ttl, MAX_TTL.as_secs());
        assert_eq!(state.cache.get("k"), Some(json!("new")));
    }

    #[tokio::test]
    async fn test_set_uses_default_ttl() {
        let (_, state) = test_state();

        let req = SetRequest {
            key: "k".to_string(),
            value: json!(1),
            ttl: None,
        };
        let response = set_handler(State(state), Json(req)).await.unwrap();
        assert_eq!(response.ttl, 300);
    }

    #[tokio::test]
    async fn test_get_after_expiry_is_not_found() {
        let (scheduler, state) = test_state();
        state.cache.set("k", json!("v"), Duration::from_secs(1));

        scheduler.advance(Duration::from_secs(1));

        let result = get_handler(State(state), Path("k".to_string())).await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler_is_idempotent() {
        let (_, state) = test_state();
        state.cache.set_default("k", json!("v"));

        let first = delete_handler(State(state.clone()), Path("k".to_string())).await;
        let second = delete_handler(State(state), Path("k".to_string())).await;

        assert!(first.deleted);
        assert!(!second.deleted);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let (_, state) = test_state();

        let req = SetRequest {
            key: String::new(),
            value: json!(null),
            ttl: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_proxy_serves_cached_response_without_upstream() {
        let (_, state) = test_state();
        state.responses.set_default("/trending?limit=5", json!(["btc", "eth"]));

        let params = vec![("limit".to_string(), "5".to_string())];
        let response = proxy_handler(
            State(state.clone()),
            Path("trending".to_string()),
            Query(params),
        )
        .await
        .unwrap();

        assert_eq!(response.0, json!(["btc", "eth"]));
        assert_eq!(state.metrics.api_calls(), 0);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (_, state) = test_state();
        state.cache.get("missing");

        let response = stats_handler(State(state)).await;
        assert_eq!(response.metrics.api_calls, 0);
        assert_eq!(response.cache.misses, 1);
        assert_eq!(response.responses.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
