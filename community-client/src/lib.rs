//! Client for the community analytics endpoints.
//!
//! Requests go through a [`Transport`] (real HTTP or the in-process
//! [`MockBackend`]) and responses are cached through [`CacheClient`] in a
//! [`KeyValueStore`].

pub mod api;
pub mod cache;
pub mod metrics;
pub mod mock;
pub mod storage;
pub mod transport;


pub use api::{
    CommunityApiClient, METRICS_ENDPOINT, OVERVIEW_ENDPOINT, PLATFORMS_ENDPOINT,
    SENTIMENT_ENDPOINT, TRENDING_ENDPOINT,
};
pub use cache::{cache_key, CacheClient, Clock, ManualClock, SystemClock};
pub use metrics::{ApiMetrics, EndpointMetrics, MetricsCollector, RequestMetrics};
pub use mock::MockBackend;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
