use crate::cache::CacheClient;
use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use crate::transport::{Transport, TransportError};
use aiden_core::{
    CacheConfig, CacheMetrics, CommunityApiError, CommunityMetrics, CommunityOverview,
    HourlyActivityConfig, Platform, PlatformMetrics, SentimentData, TimeRange, TrendingTopic,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const METRICS_ENDPOINT: &str = "/community/metrics";
pub const SENTIMENT_ENDPOINT: &str = "/community/sentiment";
pub const TRENDING_ENDPOINT: &str = "/community/trending";
pub const PLATFORMS_ENDPOINT: &str = "/community/platforms";
pub const OVERVIEW_ENDPOINT: &str = "/community";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const REQUIRED_METRICS_FIELDS: [&str; 3] = ["sentiment", "engagement", "growth"];
const REQUIRED_OVERVIEW_SERIES: [&str; 5] = [
    "sentiment",
    "topics",
    "memberGrowth",
    "hourlyActivity",
    "growthAnomalies",
];

// A 401 drops the cached entry for its key; transport failures and timeouts
// leave the cache alone.
#[derive(Debug, Clone)]
pub struct CommunityApiClient {
    transport: Arc<dyn Transport>,
    cache: CacheClient,
    metrics: Arc<MetricsCollector>,
    request_timeout: Duration,
}

impl CommunityApiClient {
    pub fn new(transport: Arc<dyn Transport>, cache: CacheClient) -> Self {
        Self {
            transport,
            cache,
            metrics: Arc::new(MetricsCollector::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    pub async fn fetch_community_metrics(
        &self,
        platform: Platform,
        time_range: TimeRange,
        config: CacheConfig,
    ) -> Result<CommunityMetrics, CommunityApiError> {
        let params = vec![
            ("platform", platform.to_string()),
            ("timeRange", time_range.to_string()),
        ];
        self.fetch_cached("metrics", METRICS_ENDPOINT, params, config, validate_metrics)
            .await
    }

    pub async fn fetch_sentiment_data(
        &self,
        time_range: TimeRange,
        config: CacheConfig,
    ) -> Result<Vec<SentimentData>, CommunityApiError> {
        let params = vec![("timeRange", time_range.to_string())];
        self.fetch_cached("sentiment", SENTIMENT_ENDPOINT, params, config, validate_array)
            .await
    }

    pub async fn fetch_trending_topics(
        &self,
        time_range: TimeRange,
        config: CacheConfig,
    ) -> Result<Vec<TrendingTopic>, CommunityApiError> {
        let params = vec![("timeRange", time_range.to_string())];
        self.fetch_cached(
            "trending_topics",
            TRENDING_ENDPOINT,
            params,
            config,
            validate_array,
        )
        .await
    }

    pub async fn fetch_platform_metrics(
        &self,
        time_range: TimeRange,
        config: CacheConfig,
    ) -> Result<PlatformMetrics, CommunityApiError> {
        let params = vec![("timeRange", time_range.to_string())];
        self.fetch_cached(
            "platforms",
            PLATFORMS_ENDPOINT,
            params,
            config,
            validate_object,
        )
        .await
    }

    pub async fn fetch_community_overview(
        &self,
        platform: Platform,
        time_range: TimeRange,
        hourly_activity: Option<&HourlyActivityConfig>,
        config: CacheConfig,
    ) -> Result<CommunityOverview, CommunityApiError> {
        let mut params = vec![
            ("platform", platform.to_string()),
            ("timeRange", time_range.to_string()),
        ];
        if let Some(activity) = hourly_activity {
            let issues = activity.validate();
            if !issues.is_empty() {
                let value = issues
                    .iter()
                    .map(|issue| format!("{} {}", issue.field, issue.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!("Rejecting hourly activity configuration: {}", value);
                return Err(CommunityApiError::InvalidParameter {
                    name: "hourlyActivityConfig".to_string(),
                    value,
                });
            }
            let encoded = serde_json::to_string(activity).map_err(|e| {
                CommunityApiError::InvalidParameter {
                    name: "hourlyActivityConfig".to_string(),
                    value: e.to_string(),
                }
            })?;
            params.push(("hourlyActivityConfig", encoded));
        }

        self.fetch_cached(
            "overview",
            OVERVIEW_ENDPOINT,
            params,
            config,
            validate_overview,
        )
        .await
    }

    pub fn clear_community_cache(&self, pattern: Option<&str>) -> usize {
        let removed = self.cache.clear(pattern);
        info!("Cleared {} cached community responses", removed);
        removed
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    pub fn cache_status(&self) -> BTreeMap<String, i64> {
        self.cache.status()
    }

    pub async fn request_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    async fn fetch_cached<T, F>(
        &self,
        base_key: &str,
        path: &str,
        params: Vec<(&str, String)>,
        config: CacheConfig,
        validate: F,
    ) -> Result<T, CommunityApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&Value) -> Result<(), CommunityApiError>,
    {
        let key = self.cache.cache_key(base_key, params.iter().cloned());

        if let Some(cached) = self.cache.get::<T>(&key, &config) {
            debug!("Cache hit for {}", key);
            self.metrics.record_cache_hit(path).await;
            return Ok(cached);
        }
        debug!("Cache miss for {}", key);

        let query: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let start_time = Instant::now();
        let result = self
            .request(path, &query)
            .await
            .and_then(|body| {
                validate(&body)?;
                serde_json::from_value::<T>(body).map_err(|e| CommunityApiError::InvalidResponse {
                    details: e.to_string(),
                })
            });

        self.metrics
            .record_request(RequestMetrics {
                endpoint: path.to_string(),
                response_time: start_time.elapsed(),
                error_kind: result.as_ref().err().map(error_kind),
            })
            .await;

        match result {
            Ok(data) => {
                self.cache.set(&key, &data);
                Ok(data)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    warn!("Unauthorized response for {}, invalidating {}", path, key);
                    self.cache.invalidate(&key);
                }
                error!("Request to {} failed: {}", path, e);
                Err(e)
            }
        }
    }

    async fn request(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, CommunityApiError> {
        info!("Making community API request: GET {}", path);

        let response =
            match tokio::time::timeout(self.request_timeout, self.transport.get(path, query)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(TransportError::Network(message))) => {
                    return Err(CommunityApiError::Transport { message })
                }
                Ok(Err(TransportError::Timeout(after))) => {
                    return Err(CommunityApiError::Timeout {
                        millis: after.as_millis() as u64,
                    })
                }
                Err(_) => {
                    return Err(CommunityApiError::Timeout {
                        millis: self.request_timeout.as_millis() as u64,
                    })
                }
            };

        if !response.is_success() {
            return Err(CommunityApiError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| CommunityApiError::Transport {
            message: e.to_string(),
        })
    }
}

fn error_kind(error: &CommunityApiError) -> String {
    match error {
        CommunityApiError::Transport { .. } => "network_error".to_string(),
        CommunityApiError::Http { status, .. } => format!("http_{}", status),
        CommunityApiError::InvalidResponse { .. } => "invalid_response".to_string(),
        CommunityApiError::Timeout { .. } => "timeout".to_string(),
        CommunityApiError::InvalidParameter { .. } => "invalid_parameter".to_string(),
    }
}

fn missing_fields<'a>(body: &Value, fields: &[&'a str]) -> Vec<&'a str> {
    fields
        .iter()
        .copied()
        .filter(|field| body.get(field).map_or(true, Value::is_null))
        .collect()
}

pub(crate) fn validate_metrics(body: &Value) -> Result<(), CommunityApiError> {
    if !body.is_object() {
        return Err(CommunityApiError::InvalidResponse {
            details: "expected a metrics object".to_string(),
        });
    }

    let missing = missing_fields(body, &REQUIRED_METRICS_FIELDS);
    if !missing.is_empty() {
        return Err(CommunityApiError::InvalidResponse {
            details: format!("missing required fields: {}", missing.join(", ")),
        });
    }
    Ok(())
}

pub(crate) fn validate_array(body: &Value) -> Result<(), CommunityApiError> {
    if body.is_array() {
        Ok(())
    } else {
        Err(CommunityApiError::InvalidResponse {
            details: "expected an array".to_string(),
        })
    }
}

fn validate_object(body: &Value) -> Result<(), CommunityApiError> {
    if body.is_object() {
        Ok(())
    } else {
        Err(CommunityApiError::InvalidResponse {
            details: "expected an object".to_string(),
        })
    }
}

fn validate_overview(body: &Value) -> Result<(), CommunityApiError> {
    validate_object(body)?;
    validate_metrics(body.get("metrics").unwrap_or(&Value::Null))?;

    let not_arrays: Vec<&str> = REQUIRED_OVERVIEW_SERIES
        .iter()
        .copied()
        .filter(|field| !body.get(field).map_or(false, Value::is_array))
        .collect();
    if !not_arrays.is_empty() {
        return Err(CommunityApiError::InvalidResponse {
            details: format!("expected arrays for: {}", not_arrays.join(", ")),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_metrics_requires_all_sections() {
        let complete = json!({"sentiment": {}, "engagement": {}, "growth": {}});
        assert!(validate_metrics(&complete).is_ok());

        let partial = json!({"sentiment": {}, "engagement": null});
        let err = validate_metrics(&partial).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("engagement, growth"));

        assert!(validate_metrics(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_array() {
        assert!(validate_array(&json!([])).is_ok());
        assert!(validate_array(&json!({"items": []})).is_err());
    }

    #[test]
    fn test_validate_overview() {
        let body = json!({
            "metrics": {"sentiment": {}, "engagement": {}, "growth": {}},
            "sentiment": [],
            "topics": [],
            "memberGrowth": [],
            "hourlyActivity": [],
            "growthAnomalies": []
        });
        assert!(validate_overview(&body).is_ok());

        let missing_series = json!({
            "metrics": {"sentiment": {}, "engagement": {}, "growth": {}},
            "sentiment": [],
            "topics": {}
        });
        let err = validate_overview(&missing_series).unwrap_err();
        assert!(err.to_string().contains("topics"));
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(
            error_kind(&CommunityApiError::Http {
                status: 404,
                status_text: "Not Found".to_string()
            }),
            "http_404"
        );
        assert_eq!(
            error_kind(&CommunityApiError::Timeout { millis: 5 }),
            "timeout"
        );
    }
}
