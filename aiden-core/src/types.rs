use crate::error::CommunityApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "custom")]
    Custom,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::Day,
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::Quarter,
        TimeRange::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::Custom => "custom",
        }
    }

    /// Number of daily points a series covering this range holds.
    /// `Custom` ranges are treated as a month.
    pub fn days(&self) -> u32 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month | TimeRange::Custom => 30,
            TimeRange::Quarter => 90,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = CommunityApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::ALL
            .into_iter()
            .find(|range| range.as_str() == s)
            .ok_or_else(|| CommunityApiError::InvalidParameter {
                name: "timeRange".to_string(),
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    All,
    Telegram,
    Discord,
    Twitter,
}

impl Platform {
    pub const CHANNELS: [Platform; 3] = [Platform::Telegram, Platform::Discord, Platform::Twitter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::All => "all",
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
            Platform::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CommunityApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Platform::All),
            "telegram" => Ok(Platform::Telegram),
            "discord" => Ok(Platform::Discord),
            "twitter" => Ok(Platform::Twitter),
            other => Err(CommunityApiError::InvalidParameter {
                name: "platform".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentMetrics {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub negative: f64,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendMetric {
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommunityMetrics {
    pub sentiment: SentimentMetrics,
    pub engagement: TrendMetric,
    pub growth: TrendMetric,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentSplit {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

// Twitter reports followers instead of members and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    pub active: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<u64>,
    pub engagement_rate: f64,
    pub growth: String,
    pub sentiment: SentimentSplit,
    #[serde(default)]
    pub trending_topics: Vec<String>,
}

impl PlatformStats {
    pub fn audience(&self) -> u64 {
        self.members.or(self.followers).unwrap_or(0)
    }
}

pub type PlatformMetrics = BTreeMap<Platform, PlatformStats>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentData {
    pub date: String,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingTopic {
    pub topic: String,
    pub mentions: u64,
    pub sentiment: f64,
    pub trend: Trend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_topics: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberGrowthPoint {
    pub date: String,
    pub members: u64,
    pub new_members: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyActivityConfig {
    pub start_hour: u8,
    pub end_hour: u8,
    pub interval_hours: u8,
    #[serde(default = "default_true")]
    pub include_reactions: bool,
    #[serde(default = "default_true")]
    pub include_threads: bool,
}

fn default_true() -> bool {
    true
}

impl Default for HourlyActivityConfig {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: 23,
            interval_hours: 1,
            include_reactions: true,
            include_threads: true,
        }
    }
}

impl HourlyActivityConfig {
    /// Checks the schema constraints, returning one issue per violated field.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.start_hour > 23 {
            issues.push(ValidationIssue::new("startHour", "must be between 0 and 23"));
        }
        if self.end_hour > 23 {
            issues.push(ValidationIssue::new("endHour", "must be between 0 and 23"));
        }
        if self.start_hour > self.end_hour {
            issues.push(ValidationIssue::new(
                "startHour",
                "must not be later than endHour",
            ));
        }
        if self.interval_hours == 0 || self.interval_hours > 24 {
            issues.push(ValidationIssue::new(
                "intervalHours",
                "must be between 1 and 24",
            ));
        }

        issues
    }

    pub fn hours(&self) -> impl Iterator<Item = u8> {
        (self.start_hour..=self.end_hour).step_by(self.interval_hours.max(1) as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyActivityData {
    pub hour: String,
    pub messages: u64,
    pub reactions: u64,
    pub threads: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityOverview {
    pub metrics: CommunityMetrics,
    pub sentiment: Vec<SentimentData>,
    pub topics: Vec<TrendingTopic>,
    pub member_growth: Vec<MemberGrowthPoint>,
    pub hourly_activity: Vec<HourlyActivityData>,
    pub growth_anomalies: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheConfig {
    pub duration: Option<Duration>,
    pub force_refresh: bool,
}

impl CacheConfig {
    pub fn forced() -> Self {
        Self {
            duration: None,
            force_refresh: true,
        }
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            force_refresh: false,
        }
    }
}

/// Both timestamps are `None` when the cache is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    pub size: usize,
    pub entries: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}
