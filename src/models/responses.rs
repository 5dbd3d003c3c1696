//! Response DTOs for the gateway API

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::metrics::MetricsSnapshot;

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
    /// Milliseconds until the entry expires
    pub ttl_remaining_ms: Option<u64>,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value, ttl_remaining_ms: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl_remaining_ms,
        }
    }
}

/// Response body for `PUT /cache`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
    /// Effective TTL in seconds
    pub ttl: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for `DELETE /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// Whether an entry existed
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        Self {
            key: key.into(),
            deleted,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    pub cache: CacheStats,
    /// Cache hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Upstream response cache behind `/api`
    pub responses: CacheStats,
}

impl StatsResponse {
    pub fn new(metrics: MetricsSnapshot, cache: CacheStats, responses: CacheStats) -> Self {
        let hit_rate = cache.hit_rate();
        Self {
            metrics,
            cache,
            hit_rate,
            responses,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("market", json!({"btc": 1}), Some(1500));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "market");
        assert_eq!(json["value"]["btc"], 1);
        assert_eq!(json["ttl_remaining_ms"], 1500);
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key", 300);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response_serialize() {
        let json = serde_json::to_value(DeleteResponse::new("gone", false)).unwrap();
        assert_eq!(json["deleted"], false);
    }

    #[test]
    fn test_stats_response_flattens_metrics() {
        let mut cache = CacheStats::new();
        cache.record_hit();
        cache.record_hit();
        cache.record_hit();
        cache.record_miss();
        let metrics = MetricsSnapshot {
            api_calls: 7,
            errors: 1,
            uptime_secs: 3,
        };

        let json =
            serde_json::to_value(StatsResponse::new(metrics, cache, CacheStats::new())).unwrap();
        assert_eq!(json["api_calls"], 7);
        assert_eq!(json["errors"], 1);
        assert_eq!(json["cache"]["hits"], 3);
        assert_eq!(json["responses"]["hits"], 0);
        assert!((json["hit_rate"].as_f64().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("Something went wrong")).unwrap();
        assert!(json.contains("Something went wrong"));
    }
}
