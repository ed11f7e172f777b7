use aiden_core::CommunityMetrics;

pub const SENTIMENT_WEIGHT: f64 = 0.4;
pub const ENGAGEMENT_WEIGHT: f64 = 0.3;
pub const GROWTH_WEIGHT: f64 = 0.3;

/// Growth rate (in percent) that earns the full growth component.
pub const GROWTH_CEILING: f64 = 20.0;

/// Weighted 0-100 summary of sentiment, engagement and growth.
///
/// A component that is zero or not a number is left out of both the weighted
/// sum and the weight total, so the score renormalizes over the components
/// that are present. With no components present the score is 0.
pub fn calculate_health_score(metrics: &CommunityMetrics) -> u8 {
    let mut weighted_total = 0.0;
    let mut applied_weight = 0.0;

    let sentiment = metrics.sentiment.score;
    if is_present(sentiment) {
        weighted_total += sentiment * SENTIMENT_WEIGHT;
        applied_weight += SENTIMENT_WEIGHT;
    }

    let engagement = metrics.engagement.rate;
    if is_present(engagement) {
        weighted_total += engagement * ENGAGEMENT_WEIGHT;
        applied_weight += ENGAGEMENT_WEIGHT;
    }

    let growth = metrics.growth.rate;
    if is_present(growth) {
        let normalized = (growth / GROWTH_CEILING).min(1.0) * 100.0;
        weighted_total += normalized * GROWTH_WEIGHT;
        applied_weight += GROWTH_WEIGHT;
    }

    if applied_weight == 0.0 {
        return 0;
    }

    (weighted_total / applied_weight).clamp(0.0, 100.0).round() as u8
}

fn is_present(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiden_core::{SentimentMetrics, TrendMetric};

    fn metrics(score: f64, engagement: f64, growth: f64) -> CommunityMetrics {
        CommunityMetrics {
            sentiment: SentimentMetrics {
                score,
                ..Default::default()
            },
            engagement: TrendMetric {
                rate: engagement,
                ..Default::default()
            },
            growth: TrendMetric {
                rate: growth,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_all_components_present() {
        // 80*0.4 + 60*0.3 + 50*0.3 = 65
        assert_eq!(calculate_health_score(&metrics(80.0, 60.0, 10.0)), 65);
    }

    #[test]
    fn test_renormalizes_over_present_components() {
        assert_eq!(calculate_health_score(&metrics(80.0, 0.0, 0.0)), 80);
        // (60*0.3 + 100*0.3) / 0.6 = 80
        assert_eq!(calculate_health_score(&metrics(0.0, 60.0, 40.0)), 80);
    }

    #[test]
    fn test_no_components_scores_zero() {
        assert_eq!(calculate_health_score(&CommunityMetrics::default()), 0);
        assert_eq!(calculate_health_score(&metrics(f64::NAN, 0.0, 0.0)), 0);
    }

    #[test]
    fn test_growth_is_capped_at_ceiling() {
        assert_eq!(calculate_health_score(&metrics(0.0, 0.0, 20.0)), 100);
        assert_eq!(calculate_health_score(&metrics(0.0, 0.0, 55.0)), 100);
    }

    #[test]
    fn test_result_is_clamped() {
        assert_eq!(calculate_health_score(&metrics(250.0, 0.0, 0.0)), 100);
        assert_eq!(calculate_health_score(&metrics(0.0, 0.0, -40.0)), 0);
    }

    #[test]
    fn test_rounds_to_nearest_integer() {
        // (71*0.4 + 33*0.3) / 0.7 = 54.714...
        assert_eq!(calculate_health_score(&metrics(71.0, 33.0, 0.0)), 55);
    }
}
