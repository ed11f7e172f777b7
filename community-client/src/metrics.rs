use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Counters for one endpoint path. Failed requests are bucketed by error kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointMetrics {
    pub requests: u64,
    pub cache_hits: u64,
    pub total_response_time: Duration,
    pub errors: BTreeMap<String, u64>,
}

impl EndpointMetrics {
    pub fn failures(&self) -> u64 {
        self.errors.values().sum()
    }

    /// Share of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.requests + self.cache_hits;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub average_response_time: Duration,
    pub last_request_time: Option<SystemTime>,
    pub endpoints: HashMap<String, EndpointMetrics>,
}

impl ApiMetrics {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.total_requests + self.cache_hits;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    /// Failure counts per error kind across all endpoints.
    pub fn errors_by_kind(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for endpoint in self.endpoints.values() {
            for (kind, count) in &endpoint.errors {
                *totals.entry(kind.clone()).or_insert(0) += count;
            }
        }
        totals
    }
}

/// One network request issued by the API client. `error_kind` is `None` for
/// a successful request.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub endpoint: String,
    pub response_time: Duration,
    pub error_kind: Option<String>,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: RwLock<ApiMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request: RequestMetrics) {
        let mut metrics = self.metrics.write().await;

        let previous_total = metrics.average_response_time * metrics.total_requests as u32;
        metrics.total_requests += 1;
        metrics.average_response_time =
            (previous_total + request.response_time) / metrics.total_requests as u32;
        metrics.last_request_time = Some(SystemTime::now());
        if request.error_kind.is_some() {
            metrics.failed_requests += 1;
        }

        let endpoint = metrics.endpoints.entry(request.endpoint).or_default();
        endpoint.requests += 1;
        endpoint.total_response_time += request.response_time;
        if let Some(kind) = request.error_kind {
            *endpoint.errors.entry(kind).or_insert(0) += 1;
        }
    }

    pub async fn record_cache_hit(&self, endpoint: &str) {
        let mut metrics = self.metrics.write().await;
        metrics.cache_hits += 1;
        metrics
            .endpoints
            .entry(endpoint.to_string())
            .or_default()
            .cache_hits += 1;
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }
}
