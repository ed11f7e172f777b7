use aiden_core::MemberGrowthPoint;
use tracing::debug;

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

/// Flags every value whose z-score magnitude is strictly greater than `threshold`.
///
/// Mean and standard deviation are computed over the whole series (population
/// form, dividing by N) in a single pass; there is no rolling window. The
/// output has the same length and order as the input.
///
/// A constant series has a standard deviation of zero and produces no
/// anomalies rather than dividing by zero.
pub fn detect_anomalies(series: &[f64], threshold: f64) -> Vec<bool> {
    if series.is_empty() {
        return Vec::new();
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 || !std_dev.is_finite() {
        debug!(
            "Series of {} points has no spread, reporting no anomalies",
            series.len()
        );
        return vec![false; series.len()];
    }

    series
        .iter()
        .map(|value| ((value - mean) / std_dev).abs() > threshold)
        .collect()
}

/// Anomalies in daily member joins.
pub fn detect_growth_anomalies(points: &[MemberGrowthPoint], threshold: f64) -> Vec<bool> {
    let joins: Vec<f64> = points.iter().map(|p| p.new_members as f64).collect();
    detect_anomalies(&joins, threshold)
}
