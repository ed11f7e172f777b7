use aiden_core::{
    CommunityApiError, CommunityMetrics, HourlyActivityData, MemberGrowthPoint, Platform,
    SentimentData, TimeRange, TrendingTopic,
};
use analytics_engine::calculate_health_score;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookParams {
    pub time_range: TimeRange,
    pub platform: Platform,
}

impl HookParams {
    pub fn new(time_range: TimeRange, platform: Platform) -> Self {
        Self {
            time_range,
            platform,
        }
    }
}

/// One flag per sub-resource so partial results can be shown while the rest
/// are still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFlags {
    pub metrics: bool,
    pub sentiment: bool,
    pub topics: bool,
    pub member_growth: bool,
    pub hourly_activity: bool,
}

impl LoadingFlags {
    pub fn all() -> Self {
        Self {
            metrics: true,
            sentiment: true,
            topics: true,
            member_growth: true,
            hourly_activity: true,
        }
    }

    pub fn any(&self) -> bool {
        self.metrics || self.sentiment || self.topics || self.member_growth || self.hourly_activity
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommunityDataState {
    pub params: HookParams,
    pub metrics: Option<CommunityMetrics>,
    pub sentiment: Vec<SentimentData>,
    pub topics: Vec<TrendingTopic>,
    pub member_growth: Vec<MemberGrowthPoint>,
    pub growth_anomalies: Vec<bool>,
    pub hourly_activity: Vec<HourlyActivityData>,
    pub loading: LoadingFlags,
    pub error: Option<CommunityApiError>,
    /// Incremented whenever a fetch cycle starts.
    pub generation: u64,
}

impl CommunityDataState {
    pub fn is_loading(&self) -> bool {
        self.loading.any()
    }

    /// Only available once every fetch has settled without error.
    pub fn health_score(&self) -> Option<u8> {
        if self.is_loading() || self.error.is_some() {
            return None;
        }
        self.metrics.as_ref().map(calculate_health_score)
    }
}
