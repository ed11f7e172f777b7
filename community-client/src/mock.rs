//! In-process stand-in for the community API route handlers.
//!
//! Serves randomized data in the same shapes and with the same parameter
//! validation as the real endpoints, after an optional artificial delay.

use crate::api::{
    METRICS_ENDPOINT, OVERVIEW_ENDPOINT, PLATFORMS_ENDPOINT, SENTIMENT_ENDPOINT,
    TRENDING_ENDPOINT,
};
use crate::transport::{Transport, TransportError, TransportResponse};
use aiden_core::{
    CommunityMetrics, CommunityOverview, HourlyActivityConfig, HourlyActivityData,
    MemberGrowthPoint, Platform, PlatformMetrics, PlatformStats, SentimentData, SentimentMetrics,
    SentimentSplit, TimeRange, Trend, TrendMetric, TrendingTopic, ValidationIssue,
};
use analytics_engine::{detect_growth_anomalies, DEFAULT_ANOMALY_THRESHOLD};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use fastrand::Rng;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const TOPICS: [&str; 8] = [
    "Token airdrop",
    "Staking rewards",
    "Governance proposal",
    "NFT mint",
    "Layer 2 migration",
    "Bridge security",
    "Validator uptime",
    "Liquidity incentives",
];

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    latency: Duration,
    seed: Option<u64>,
    requests: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes every response deterministic for a given request.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn rng(&self) -> Rng {
        match self.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        }
    }

    pub fn handle(&self, path: &str, query: &[(String, String)]) -> TransportResponse {
        let params: HashMap<&str, &str> = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let time_range = match params.get("timeRange").copied() {
            None => TimeRange::default(),
            Some(raw) => match raw.parse::<TimeRange>() {
                Ok(range) => range,
                Err(e) => {
                    return json_response(
                        400,
                        &json!({ "error": "Invalid time range", "details": e.to_string() }),
                    )
                }
            },
        };

        let platform = match params.get("platform").copied() {
            None => Platform::default(),
            Some(raw) => match raw.parse::<Platform>() {
                Ok(platform) => platform,
                Err(e) => {
                    return json_response(
                        400,
                        &json!({ "error": "Invalid platform", "details": e.to_string() }),
                    )
                }
            },
        };

        let mut rng = self.rng();
        match path {
            METRICS_ENDPOINT => json_response(200, &generate_metrics(&mut rng)),
            SENTIMENT_ENDPOINT => json_response(200, &generate_sentiment(&mut rng, time_range)),
            TRENDING_ENDPOINT => json_response(200, &generate_topics(&mut rng)),
            PLATFORMS_ENDPOINT => json_response(200, &generate_platforms(&mut rng)),
            OVERVIEW_ENDPOINT => {
                let activity = match params.get("hourlyActivityConfig").copied() {
                    None => HourlyActivityConfig::default(),
                    Some(raw) => match parse_activity_config(raw) {
                        Ok(config) => config,
                        Err(issues) => {
                            return json_response(
                                400,
                                &json!({
                                    "error": "Invalid hourly activity configuration",
                                    "details": issues,
                                }),
                            )
                        }
                    },
                };
                debug!(
                    "Generating overview for platform={} timeRange={}",
                    platform, time_range
                );
                json_response(200, &generate_overview(&mut rng, time_range, &activity))
            }
            _ => json_response(404, &json!({ "error": "Not Found" })),
        }
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.handle(path, query))
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

fn json_response<T: Serialize>(status: u16, body: &T) -> TransportResponse {
    match serde_json::to_string(body) {
        Ok(body) => TransportResponse::new(status, status_text(status), body),
        Err(e) => TransportResponse::new(
            500,
            status_text(500),
            json!({ "error": e.to_string() }).to_string(),
        ),
    }
}

fn parse_activity_config(raw: &str) -> Result<HourlyActivityConfig, Vec<ValidationIssue>> {
    let config: HourlyActivityConfig = serde_json::from_str(raw)
        .map_err(|e| vec![ValidationIssue::new("hourlyActivityConfig", e.to_string())])?;

    let issues = config.validate();
    if issues.is_empty() {
        Ok(config)
    } else {
        Err(issues)
    }
}

fn trend(rng: &mut Rng) -> Trend {
    match rng.u8(0..3) {
        0 => Trend::Up,
        1 => Trend::Down,
        _ => Trend::Stable,
    }
}

fn split(rng: &mut Rng) -> SentimentSplit {
    let positive = rng.u32(45..=75) as f64;
    let negative = rng.u32(5..=20) as f64;
    SentimentSplit {
        positive,
        neutral: 100.0 - positive - negative,
        negative,
    }
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn generate_metrics(rng: &mut Rng) -> CommunityMetrics {
    let sentiment = split(rng);
    CommunityMetrics {
        sentiment: SentimentMetrics {
            score: sentiment.positive + sentiment.neutral / 2.0,
            positive: sentiment.positive,
            neutral: sentiment.neutral,
            negative: sentiment.negative,
            trend: trend(rng),
        },
        engagement: TrendMetric {
            rate: one_decimal(20.0 + rng.f64() * 60.0),
            trend: trend(rng),
        },
        growth: TrendMetric {
            rate: one_decimal(rng.f64() * 20.0),
            trend: trend(rng),
        },
    }
}

fn generate_sentiment(rng: &mut Rng, time_range: TimeRange) -> Vec<SentimentData> {
    let now = Utc::now();
    let (points, step, format) = match time_range {
        TimeRange::Day => (24, ChronoDuration::hours(1), "%Y-%m-%dT%H:00:00Z"),
        other => (other.days() as i64, ChronoDuration::days(1), "%Y-%m-%d"),
    };

    (0..points)
        .rev()
        .map(|i| {
            let split = split(rng);
            SentimentData {
                date: (now - step * i as i32).format(format).to_string(),
                score: Some(split.positive + split.neutral / 2.0),
                positive: split.positive,
                neutral: split.neutral,
                negative: split.negative,
            }
        })
        .collect()
}

fn generate_topics(rng: &mut Rng) -> Vec<TrendingTopic> {
    let mut names = TOPICS.to_vec();
    rng.shuffle(&mut names);

    let mut topics: Vec<TrendingTopic> = names
        .iter()
        .take(5)
        .map(|name| TrendingTopic {
            topic: name.to_string(),
            mentions: rng.u64(50..2_000),
            sentiment: one_decimal(rng.f64() * 100.0),
            trend: trend(rng),
            related_topics: Some(
                TOPICS
                    .iter()
                    .filter(|other| *other != name)
                    .take(2)
                    .map(|other| other.to_string())
                    .collect(),
            ),
        })
        .collect();

    topics.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    topics
}

fn generate_member_growth(rng: &mut Rng, time_range: TimeRange) -> Vec<MemberGrowthPoint> {
    let today = Utc::now().date_naive();
    let days = time_range.days().max(7) as i64;
    let mut members = rng.u64(5_000..20_000);

    (0..days)
        .rev()
        .map(|i| {
            let new_members = rng.u64(20..200);
            members += new_members;
            MemberGrowthPoint {
                date: (today - ChronoDuration::days(i)).format("%Y-%m-%d").to_string(),
                members,
                new_members,
            }
        })
        .collect()
}

fn generate_hourly_activity(
    rng: &mut Rng,
    config: &HourlyActivityConfig,
) -> Vec<HourlyActivityData> {
    config
        .hours()
        .map(|hour| HourlyActivityData {
            hour: format!("{:02}:00", hour),
            messages: rng.u64(50..500),
            reactions: if config.include_reactions {
                rng.u64(20..300)
            } else {
                0
            },
            threads: if config.include_threads {
                rng.u64(0..40)
            } else {
                0
            },
        })
        .collect()
}

fn generate_platforms(rng: &mut Rng) -> PlatformMetrics {
    Platform::CHANNELS
        .iter()
        .map(|platform| {
            let audience = rng.u64(2_000..50_000);
            let chat = *platform != Platform::Twitter;
            let mut topics: Vec<String> = TOPICS.iter().map(|t| t.to_string()).collect();
            rng.shuffle(&mut topics);
            topics.truncate(3);

            let stats = PlatformStats {
                members: chat.then_some(audience),
                followers: (!chat).then_some(audience),
                active: audience / rng.u64(3..10),
                messages: chat.then(|| rng.u64(1_000..30_000)),
                engagement_rate: one_decimal(10.0 + rng.f64() * 60.0),
                growth: format!("+{:.1}%", rng.f64() * 15.0),
                sentiment: split(rng),
                trending_topics: topics,
            };
            (*platform, stats)
        })
        .collect()
}

fn generate_overview(
    rng: &mut Rng,
    time_range: TimeRange,
    activity: &HourlyActivityConfig,
) -> CommunityOverview {
    let member_growth = generate_member_growth(rng, time_range);
    let growth_anomalies = detect_growth_anomalies(&member_growth, DEFAULT_ANOMALY_THRESHOLD);

    CommunityOverview {
        metrics: generate_metrics(rng),
        sentiment: generate_sentiment(rng, time_range),
        topics: generate_topics(rng),
        member_growth,
        hourly_activity: generate_hourly_activity(rng, activity),
        growth_anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_metrics_sentiment_totals_one_hundred() {
        let backend = MockBackend::new().with_seed(7);
        let response = backend.handle(METRICS_ENDPOINT, &query(&[("timeRange", "7d")]));
        assert_eq!(response.status, 200);

        let metrics: CommunityMetrics = serde_json::from_str(&response.body).unwrap();
        let total =
            metrics.sentiment.positive + metrics.sentiment.neutral + metrics.sentiment.negative;
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_sentiment_series_length_follows_range() {
        let backend = MockBackend::new();
        let day = backend.handle(SENTIMENT_ENDPOINT, &query(&[("timeRange", "24h")]));
        let month = backend.handle(SENTIMENT_ENDPOINT, &query(&[("timeRange", "30d")]));

        let day: Vec<SentimentData> = serde_json::from_str(&day.body).unwrap();
        let month: Vec<SentimentData> = serde_json::from_str(&month.body).unwrap();
        assert_eq!(day.len(), 24);
        assert_eq!(month.len(), 30);
        assert!(month.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_invalid_time_range_is_rejected() {
        let backend = MockBackend::new();
        let response = backend.handle(OVERVIEW_ENDPOINT, &query(&[("timeRange", "1y")]));

        assert_eq!(response.status, 400);
        assert_eq!(response.status_text, "Bad Request");
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"], "Invalid time range");
        assert!(body["details"].is_string());
    }

    #[test]
    fn test_invalid_activity_config_reports_fields() {
        let backend = MockBackend::new();

        let unparsable = backend.handle(
            OVERVIEW_ENDPOINT,
            &query(&[("hourlyActivityConfig", "{oops")]),
        );
        assert_eq!(unparsable.status, 400);

        let invalid = backend.handle(
            OVERVIEW_ENDPOINT,
            &query(&[(
                "hourlyActivityConfig",
                r#"{"startHour":4,"endHour":30,"intervalHours":2}"#,
            )]),
        );
        assert_eq!(invalid.status, 400);
        let body: Value = serde_json::from_str(&invalid.body).unwrap();
        assert_eq!(body["details"][0]["field"], "endHour");
    }

    #[test]
    fn test_overview_honours_activity_config() {
        let backend = MockBackend::new().with_seed(3);
        let response = backend.handle(
            OVERVIEW_ENDPOINT,
            &query(&[
                ("platform", "discord"),
                ("timeRange", "7d"),
                (
                    "hourlyActivityConfig",
                    r#"{"startHour":9,"endHour":17,"intervalHours":4,"includeThreads":false}"#,
                ),
            ]),
        );
        assert_eq!(response.status, 200);

        let overview: CommunityOverview = serde_json::from_str(&response.body).unwrap();
        let hours: Vec<_> = overview.hourly_activity.iter().map(|h| h.hour.as_str()).collect();
        assert_eq!(hours, vec!["09:00", "13:00", "17:00"]);
        assert!(overview.hourly_activity.iter().all(|h| h.threads == 0));
        assert_eq!(overview.growth_anomalies.len(), overview.member_growth.len());
    }

    #[test]
    fn test_twitter_reports_followers() {
        let backend = MockBackend::new();
        let response = backend.handle(PLATFORMS_ENDPOINT, &[]);
        let platforms: PlatformMetrics = serde_json::from_str(&response.body).unwrap();

        let twitter = &platforms[&Platform::Twitter];
        assert!(twitter.members.is_none());
        assert!(twitter.followers.is_some());
        assert!(platforms[&Platform::Discord].members.is_some());
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let response = MockBackend::new().handle("/community/unknown", &[]);
        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
    }

    #[test]
    fn test_transport_counts_requests() {
        let backend = MockBackend::new();
        tokio_test::block_on(backend.get(TRENDING_ENDPOINT, &[])).unwrap();
        tokio_test::block_on(backend.get(TRENDING_ENDPOINT, &[])).unwrap();
        assert_eq!(backend.request_count(), 2);
    }
}
