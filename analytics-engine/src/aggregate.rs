use aiden_core::{PlatformMetrics, SentimentData};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTotals {
    pub platforms: usize,
    pub total_audience: u64,
    pub total_active: u64,
    pub total_messages: u64,
    pub average_engagement: f64,
    pub active_percentage: f64,
}

/// Converts non-negative weights into whole percentages that total exactly 100,
/// using largest-remainder rounding. Ties go to the earlier value.
/// Returns all zeros when nothing positive is supplied.
pub fn round_percentages(values: &[f64]) -> Vec<u32> {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    let total: f64 = values.iter().copied().filter(|v| usable(*v)).sum();
    if total <= 0.0 {
        return vec![0; values.len()];
    }

    let raw: Vec<f64> = values
        .iter()
        .map(|v| if usable(*v) { v / total * 100.0 } else { 0.0 })
        .collect();
    let mut rounded: Vec<u32> = raw.iter().map(|r| r.floor() as u32).collect();
    let mut remaining = 100u32.saturating_sub(rounded.iter().sum());

    let mut by_remainder: Vec<usize> = (0..raw.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = raw[a] - raw[a].floor();
        let rb = raw[b] - raw[b].floor();
        rb.partial_cmp(&ra).unwrap_or(Ordering::Equal)
    });

    for idx in by_remainder {
        if remaining == 0 {
            break;
        }
        rounded[idx] += 1;
        remaining -= 1;
    }

    rounded
}

/// Overall positive/neutral/negative split across a sentiment series.
pub fn sentiment_distribution(series: &[SentimentData]) -> Option<SentimentBreakdown> {
    let (positive, neutral, negative) = series.iter().fold((0.0, 0.0, 0.0), |acc, point| {
        (
            acc.0 + point.positive,
            acc.1 + point.neutral,
            acc.2 + point.negative,
        )
    });

    if positive + neutral + negative <= 0.0 {
        return None;
    }

    let split = round_percentages(&[positive, neutral, negative]);
    Some(SentimentBreakdown {
        positive: split[0],
        neutral: split[1],
        negative: split[2],
    })
}

/// Totals across platforms. Audience counts members where a platform reports
/// them and followers otherwise.
pub fn aggregate_platforms(platforms: &PlatformMetrics) -> PlatformTotals {
    if platforms.is_empty() {
        return PlatformTotals::default();
    }

    let mut totals = PlatformTotals {
        platforms: platforms.len(),
        ..Default::default()
    };
    let mut engagement_sum = 0.0;

    for stats in platforms.values() {
        totals.total_audience = totals.total_audience.saturating_add(stats.audience());
        totals.total_active = totals.total_active.saturating_add(stats.active);
        totals.total_messages = totals
            .total_messages
            .saturating_add(stats.messages.unwrap_or(0));
        engagement_sum += stats.engagement_rate;
    }

    totals.average_engagement = engagement_sum / platforms.len() as f64;
    if totals.total_audience > 0 {
        totals.active_percentage =
            totals.total_active as f64 / totals.total_audience as f64 * 100.0;
    }

    totals
}

/// Relative change in percent; `None` when there is no baseline.
pub fn percentage_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous.abs() * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiden_core::{Platform, PlatformStats, SentimentSplit};

    fn point(positive: f64, neutral: f64, negative: f64) -> SentimentData {
        SentimentData {
            date: "2024-03-01".to_string(),
            positive,
            neutral,
            negative,
            score: None,
        }
    }

    #[test]
    fn test_round_percentages_totals_one_hundred() {
        assert_eq!(round_percentages(&[1.0, 1.0, 1.0]), vec![34, 33, 33]);
        assert_eq!(round_percentages(&[2.0, 1.0, 1.0]), vec![50, 25, 25]);
        assert_eq!(round_percentages(&[0.0, 0.0]), vec![0, 0]);
        assert_eq!(round_percentages(&[-5.0, 5.0]), vec![0, 100]);
    }

    #[test]
    fn test_sentiment_distribution_averages_series() {
        let series = vec![point(60.0, 30.0, 10.0), point(70.0, 20.0, 10.0)];
        assert_eq!(
            sentiment_distribution(&series),
            Some(SentimentBreakdown {
                positive: 65,
                neutral: 25,
                negative: 10
            })
        );
        assert_eq!(sentiment_distribution(&[]), None);
    }

    #[test]
    fn test_aggregate_platforms_falls_back_to_followers() {
        let mut platforms = PlatformMetrics::new();
        platforms.insert(
            Platform::Discord,
            PlatformStats {
                members: Some(800),
                followers: None,
                active: 200,
                messages: Some(5000),
                engagement_rate: 40.0,
                growth: "+4%".to_string(),
                sentiment: SentimentSplit::default(),
                trending_topics: vec![],
            },
        );
        platforms.insert(
            Platform::Twitter,
            PlatformStats {
                members: None,
                followers: Some(1200),
                active: 300,
                messages: None,
                engagement_rate: 20.0,
                growth: "+2%".to_string(),
                sentiment: SentimentSplit::default(),
                trending_topics: vec![],
            },
        );

        let totals = aggregate_platforms(&platforms);
        assert_eq!(totals.platforms, 2);
        assert_eq!(totals.total_audience, 2000);
        assert_eq!(totals.total_active, 500);
        assert_eq!(totals.total_messages, 5000);
        assert_eq!(totals.average_engagement, 30.0);
        assert_eq!(totals.active_percentage, 25.0);
    }

    #[test]
    fn test_aggregate_platforms_saturates_on_huge_counts() {
        let huge = |platform_messages: u64| PlatformStats {
            members: Some(u64::MAX - 10),
            followers: None,
            active: u64::MAX / 2 + 1,
            messages: Some(platform_messages),
            engagement_rate: 10.0,
            growth: "+0%".to_string(),
            sentiment: SentimentSplit::default(),
            trending_topics: vec![],
        };
        let mut platforms = PlatformMetrics::new();
        platforms.insert(Platform::Telegram, huge(u64::MAX));
        platforms.insert(Platform::Discord, huge(7));

        let totals = aggregate_platforms(&platforms);
        assert_eq!(totals.total_audience, u64::MAX);
        assert_eq!(totals.total_active, u64::MAX);
        assert_eq!(totals.total_messages, u64::MAX);
        assert_eq!(totals.active_percentage, 100.0);
    }

    #[test]
    fn test_totals_serialize_with_camel_case_keys() {
        let totals = PlatformTotals {
            platforms: 1,
            total_audience: 400,
            total_active: 100,
            total_messages: 2500,
            average_engagement: 12.5,
            active_percentage: 25.0,
        };
        let value = serde_json::to_value(&totals).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "platforms": 1,
                "totalAudience": 400,
                "totalActive": 100,
                "totalMessages": 2500,
                "averageEngagement": 12.5,
                "activePercentage": 25.0,
            })
        );

        let breakdown = SentimentBreakdown {
            positive: 60,
            neutral: 30,
            negative: 10,
        };
        assert_eq!(
            serde_json::to_string(&breakdown).unwrap(),
            r#"{"positive":60,"neutral":30,"negative":10}"#
        );
    }

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(50.0, 75.0), Some(50.0));
        assert_eq!(percentage_change(80.0, 60.0), Some(-25.0));
        assert_eq!(percentage_change(0.0, 10.0), None);
    }
}
