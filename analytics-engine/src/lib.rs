//! Derived analytics over fetched community data.
//!
//! Everything here is a pure function of its inputs: the health score, z-score
//! anomaly flags, and the percentage aggregations shown next to the charts.

pub mod aggregate;
pub mod anomaly;
pub mod health;

pub use aggregate::{
    aggregate_platforms, percentage_change, round_percentages, sentiment_distribution,
    PlatformTotals, SentimentBreakdown,
};
pub use anomaly::{detect_anomalies, detect_growth_anomalies, DEFAULT_ANOMALY_THRESHOLD};
pub use health::calculate_health_score;
