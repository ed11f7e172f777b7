use crate::state::{CommunityDataState, HookParams, LoadingFlags};
use aiden_core::{CacheConfig, CommunityApiError, HourlyActivityConfig};
use community_client::CommunityApiClient;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Loading/data/error facade over the community endpoints for one
/// `(time range, platform)` selection.
///
/// Every fetch cycle is tagged with a generation taken from the state. A
/// result is committed only while its generation is still the current one,
/// and the check happens under the same lock as the write, so a slow cycle
/// for superseded parameters can never overwrite a newer one.
#[derive(Debug, Clone)]
pub struct CommunityDataHook {
    api: CommunityApiClient,
    state: Arc<watch::Sender<CommunityDataState>>,
    hourly_activity: Option<HourlyActivityConfig>,
}

impl CommunityDataHook {
    pub fn new(api: CommunityApiClient, params: HookParams) -> Self {
        let (state, _) = watch::channel(CommunityDataState {
            params,
            ..Default::default()
        });
        Self {
            api,
            state: Arc::new(state),
            hourly_activity: None,
        }
    }

    pub fn with_hourly_activity(mut self, config: HourlyActivityConfig) -> Self {
        self.hourly_activity = Some(config);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<CommunityDataState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CommunityDataState {
        self.state.borrow().clone()
    }

    pub fn params(&self) -> HookParams {
        self.state.borrow().params
    }

    pub fn health_score(&self) -> Option<u8> {
        self.state.borrow().health_score()
    }

    /// Switches to new parameters and fetches everything for them.
    pub async fn set_params(&self, params: HookParams) {
        self.run_cycle(params, false).await;
    }

    /// Re-runs every fetch for the current parameters. With `force_refresh`
    /// the cache is bypassed for all of them.
    pub async fn refetch(&self, force_refresh: bool) {
        let params = self.params();
        self.run_cycle(params, force_refresh).await;
    }

    async fn run_cycle(&self, params: HookParams, force_refresh: bool) {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.params = params;
            state.loading = LoadingFlags::all();
            state.error = None;
        });
        info!(
            "Fetching community data (generation {}, platform={}, timeRange={}, force={})",
            generation, params.platform, params.time_range, force_refresh
        );

        let config = if force_refresh {
            CacheConfig::forced()
        } else {
            CacheConfig::default()
        };

        let metrics = async {
            let result = self
                .api
                .fetch_community_metrics(params.platform, params.time_range, config)
                .await;
            self.commit(generation, result, |state, metrics| {
                state.metrics = Some(metrics);
                state.loading.metrics = false;
            });
        };

        let sentiment = async {
            let result = self
                .api
                .fetch_sentiment_data(params.time_range, config)
                .await;
            self.commit(generation, result, |state, sentiment| {
                state.sentiment = sentiment;
                state.loading.sentiment = false;
            });
        };

        let topics = async {
            let result = self
                .api
                .fetch_trending_topics(params.time_range, config)
                .await;
            self.commit(generation, result, |state, topics| {
                state.topics = topics;
                state.loading.topics = false;
            });
        };

        let overview = async {
            let result = self
                .api
                .fetch_community_overview(
                    params.platform,
                    params.time_range,
                    self.hourly_activity.as_ref(),
                    config,
                )
                .await;
            self.commit(generation, result, |state, overview| {
                state.member_growth = overview.member_growth;
                state.growth_anomalies = overview.growth_anomalies;
                state.hourly_activity = overview.hourly_activity;
                state.loading.member_growth = false;
                state.loading.hourly_activity = false;
            });
        };

        tokio::join!(metrics, sentiment, topics, overview);
        debug!("Fetch cycle {} finished", generation);
    }

    /// Applies one fetch result if its cycle is still current. The first error
    /// of a cycle ends it: loading flags are cleared and any later results
    /// from the same cycle are dropped. Returns whether the state changed.
    fn commit<T, F>(&self, generation: u64, result: Result<T, CommunityApiError>, apply: F) -> bool
    where
        F: FnOnce(&mut CommunityDataState, T),
    {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                warn!(
                    "Discarding result from superseded fetch cycle {} (current {})",
                    generation, state.generation
                );
                return false;
            }
            if state.error.is_some() {
                debug!("Fetch cycle {} already failed, dropping result", generation);
                return false;
            }

            match result {
                Ok(value) => apply(state, value),
                Err(e) => {
                    error!("Community data fetch failed: {}", e);
                    state.error = Some(e);
                    state.loading = LoadingFlags::default();
                }
            }
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiden_core::{Platform, TimeRange};
    use community_client::{CacheClient, MemoryStore, MockBackend};

    fn hook() -> CommunityDataHook {
        let api = CommunityApiClient::new(
            Arc::new(MockBackend::new().with_seed(1)),
            CacheClient::new(Arc::new(MemoryStore::new())),
        );
        CommunityDataHook::new(api, HookParams::default())
    }

    #[test]
    fn test_initial_state_is_idle() {
        let hook = hook();
        let state = hook.snapshot();
        assert_eq!(state.generation, 0);
        assert!(!state.is_loading());
        assert!(state.metrics.is_none());
        assert_eq!(hook.health_score(), None);
    }

    #[test]
    fn test_refetch_populates_everything() {
        let hook = hook();
        tokio_test::block_on(hook.refetch(false));

        let state = hook.snapshot();
        assert_eq!(state.generation, 1);
        assert!(!state.is_loading());
        assert!(state.error.is_none());
        assert!(state.metrics.is_some());
        assert_eq!(state.sentiment.len(), 24);
        assert!(!state.topics.is_empty());
        assert_eq!(state.member_growth.len(), 7);
        assert_eq!(state.growth_anomalies.len(), 7);
        assert_eq!(state.hourly_activity.len(), 24);
        assert!(hook.health_score().is_some());
    }

    #[test]
    fn test_commit_checks_generation() {
        let hook = hook();
        hook.state.send_modify(|state| state.generation = 3);

        let stale = hook.commit(2, Ok(()), |state, ()| state.topics.clear());
        assert!(!stale);

        let current = hook.commit(3, Ok(()), |state, ()| state.loading.topics = false);
        assert!(current);
    }

    #[test]
    fn test_set_params_updates_params() {
        let hook = hook();
        let params = HookParams::new(TimeRange::Month, Platform::Telegram);
        tokio_test::block_on(hook.set_params(params));

        let state = hook.snapshot();
        assert_eq!(state.params, params);
        assert_eq!(state.sentiment.len(), 30);
        assert_eq!(state.member_growth.len(), 30);
    }
}
