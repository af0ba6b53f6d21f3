//! Refresh coordinator: fetch, filter, aggregate and publish on a timer.
//!
//! One coordinator owns one feed subscription. Cycles never overlap: a
//! refresh requested while another is running waits for it to finish and
//! then runs its own cycle. Readers get the last published snapshot at any
//! time without waiting for a cycle.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::{PublishedSnapshot, build_snapshot};
use crate::backoff::Backoff;
use crate::config::{CoordinatorSettings, FilterConfig};
use crate::error::FetchError;
use crate::feed::AlertBulletin;
use crate::fetch::{CacheValidators, FeedFetcher, FetchOutcome, HttpClient};
use crate::filter::ActiveFilter;

/// What a successful cycle did with the published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// New data was fetched and published.
    Updated,
    /// The server reported no change and the snapshot was left as is.
    NotModified,
    /// The server reported no change, but the configuration had changed, so
    /// the cached feed was filtered again under the new configuration.
    Refiltered,
}

/// Point-in-time view of coordinator internals for troubleshooting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub url: String,
    pub last_update_success: bool,
    pub cached_etag: Option<String>,
    pub cached_last_modified: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub current_interval_secs: u64,
    pub cycles: u64,
    pub last_error: Option<String>,
    pub config: FilterConfig,
    pub snapshot: PublishedSnapshot,
}

/// Mutable bookkeeping shared between cycles.
#[derive(Debug)]
struct CycleState {
    validators: CacheValidators,
    backoff: Backoff,
    last_update_succeeded: bool,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<FetchError>,
    cycles: u64,
    /// Feed behind the current snapshot, kept to re-filter on 304.
    cached_feed: Option<Arc<Vec<AlertBulletin>>>,
    /// Configuration the current snapshot was built with.
    published_config: Option<FilterConfig>,
}

pub struct Coordinator<C> {
    fetcher: FeedFetcher<C>,
    filter: RwLock<Arc<ActiveFilter>>,
    snapshot: RwLock<Arc<PublishedSnapshot>>,
    state: Mutex<CycleState>,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl<C: HttpClient> Coordinator<C> {
    pub fn new(client: C, settings: CoordinatorSettings, config: FilterConfig) -> Self {
        let snapshot = PublishedSnapshot::empty(&config);
        Self {
            fetcher: FeedFetcher::new(client, settings.url, settings.request_timeout),
            filter: RwLock::new(Arc::new(ActiveFilter::new(config))),
            snapshot: RwLock::new(Arc::new(snapshot)),
            state: Mutex::new(CycleState {
                validators: CacheValidators::default(),
                backoff: Backoff::new(settings.base_interval, settings.max_interval),
                last_update_succeeded: false,
                last_success: None,
                last_error: None,
                cycles: 0,
                cached_feed: None,
                published_config: None,
            }),
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The last published snapshot. Never blocks on an in-flight cycle.
    pub fn current_snapshot(&self) -> Arc<PublishedSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> FilterConfig {
        self.active_filter().config().clone()
    }

    /// Replaces the filter configuration. Takes effect on the next cycle;
    /// a cycle already running keeps the configuration it started with.
    pub fn update_config(&self, config: FilterConfig) {
        info!(unique_id = %config.unique_id(), "Filter configuration updated");
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(ActiveFilter::new(config));
    }

    pub fn last_update_succeeded(&self) -> bool {
        self.lock_state().last_update_succeeded
    }

    /// Delay until the next scheduled cycle.
    pub fn current_interval(&self) -> Duration {
        self.lock_state().backoff.interval()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let snapshot = self.current_snapshot();
        let config = self.config();
        let state = self.lock_state();
        Diagnostics {
            url: self.fetcher.url().to_string(),
            last_update_success: state.last_update_succeeded,
            cached_etag: state.validators.etag.clone(),
            cached_last_modified: state.validators.last_modified.clone(),
            last_success: state.last_success,
            consecutive_failures: state.backoff.failures(),
            current_interval_secs: state.backoff.interval().as_secs(),
            cycles: state.cycles,
            last_error: state.last_error.as_ref().map(ToString::to_string),
            config,
            snapshot: (*snapshot).clone(),
        }
    }

    /// Runs one fetch-filter-aggregate cycle now, waiting for any cycle
    /// already in flight to finish first.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] that aborted this cycle. The previous
    /// snapshot stays published and the refresh interval backs off.
    #[tracing::instrument(skip(self), fields(url = %self.fetcher.url()))]
    pub async fn request_refresh(&self) -> Result<RefreshOutcome, FetchError> {
        let _cycle = self.cycle_lock.lock().await;

        let filter = self.active_filter();
        let validators = {
            let mut state = self.lock_state();
            state.cycles += 1;
            state.validators.clone()
        };

        let result = self.fetcher.fetch(&validators).await;
        match result {
            Ok(FetchOutcome::Payload { feed, validators }) => {
                let feed = Arc::new(feed);
                let now = Utc::now();
                let snapshot = build_snapshot(&feed, &filter, now, &Local);
                let alerts = snapshot.counts.alerts_count;
                self.publish(snapshot);

                let mut state = self.lock_state();
                state.validators = validators;
                state.cached_feed = Some(feed);
                state.published_config = Some(filter.config().clone());
                state.last_success = Some(now);
                Self::record_success(&mut state);
                info!(alerts, "Published fresh snapshot");
                Ok(RefreshOutcome::Updated)
            }
            Ok(FetchOutcome::NotModified) => {
                let mut state = self.lock_state();
                let stale = state.published_config.as_ref() != Some(filter.config());
                let outcome = match state.cached_feed.clone() {
                    Some(feed) if stale => {
                        let previous = self.current_snapshot();
                        let mut snapshot = build_snapshot(&feed, &filter, Utc::now(), &Local);
                        snapshot.last_update = previous.last_update;
                        snapshot.last_update_local = previous.last_update_local.clone();
                        self.publish(snapshot);
                        state.published_config = Some(filter.config().clone());
                        debug!("Feed unchanged, re-filtered cached feed");
                        RefreshOutcome::Refiltered
                    }
                    _ => {
                        debug!("Feed unchanged, snapshot kept");
                        RefreshOutcome::NotModified
                    }
                };
                Self::record_success(&mut state);
                Ok(outcome)
            }
            Err(e) => {
                let mut state = self.lock_state();
                let interval = state.backoff.record_failure();
                state.last_update_succeeded = false;
                state.last_error = Some(e.clone());
                warn!(
                    error = %e,
                    failures = state.backoff.failures(),
                    next_in_secs = interval.as_secs(),
                    "Refresh failed, backing off"
                );
                Err(e)
            }
        }
    }

    /// Refreshes forever, sleeping the current interval between cycles.
    /// Failures are logged and retried after the backed-off interval.
    /// Never returns; callers stop it by dropping the future.
    pub async fn run(&self) {
        loop {
            let interval = self.current_interval();
            debug!(interval_secs = interval.as_secs(), "Waiting for next refresh");
            tokio::time::sleep(interval).await;

            match self.request_refresh().await {
                Ok(outcome) => {
                    let snapshot = self.current_snapshot();
                    info!(
                        ?outcome,
                        state = %snapshot.state,
                        alerts = snapshot.counts.alerts_count,
                        highest = %snapshot.counts.highest_severity,
                        "Scheduled refresh complete"
                    );
                }
                Err(e) => error!(error = %e, "Scheduled refresh failed"),
            }
        }
    }

    fn record_success(state: &mut CycleState) {
        state.backoff.reset();
        state.last_update_succeeded = true;
        state.last_error = None;
    }

    fn publish(&self, snapshot: PublishedSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    fn active_filter(&self) -> Arc<ActiveFilter> {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Language, WARNINGS_URL};
    use crate::fetch::testing::{Reply, ScriptedClient};
    use crate::severity::Severity;

    const DISTRICT_FEED: &str = r#"[
        {
            "id": 1,
            "event": {"code": "WIND", "sv": "Vind", "en": "Wind"},
            "warningAreas": [
                {
                    "approximateStart": "2024-10-01T06:00:00Z",
                    "published": "2024-09-30T18:00:00Z",
                    "warningLevel": {"code": "RED", "sv": "Röd varning", "en": "Red warning"},
                    "affectedAreas": [{"id": 12, "sv": "Skåne län", "en": "Skåne County"}]
                },
                {
                    "approximateStart": "2024-10-01T06:00:00Z",
                    "published": "2024-09-30T18:00:00Z",
                    "warningLevel": {"code": "YELLOW", "sv": "Gul varning", "en": "Yellow warning"},
                    "affectedAreas": [{"id": 14, "sv": "Västra Götalands län"}]
                }
            ]
        }
    ]"#;

    const MESSAGE_FEED: &str = r#"[
        {
            "event": {"code": "FIRE_RISK", "sv": "Brandrisk", "en": "Fire risk"},
            "warningAreas": [{
                "warningLevel": {"code": "MESSAGE"},
                "affectedAreas": [{"id": 1, "sv": "Stockholms län"}]
            }]
        }
    ]"#;

    fn settings() -> CoordinatorSettings {
        CoordinatorSettings {
            url: WARNINGS_URL.to_string(),
            ..Default::default()
        }
    }

    fn district(code: &str) -> FilterConfig {
        FilterConfig {
            district: code.to_string(),
            language: Language::En,
            ..Default::default()
        }
    }

    fn coordinator(replies: Vec<Reply>, config: FilterConfig) -> (Arc<ScriptedClient>, Coordinator<Arc<ScriptedClient>>) {
        let client = Arc::new(ScriptedClient::new(replies));
        let coordinator = Coordinator::new(client.clone(), settings(), config);
        (client, coordinator)
    }

    #[tokio::test]
    async fn test_district_refresh_keeps_only_matching_area() {
        let (_, coordinator) = coordinator(vec![Reply::json(DISTRICT_FEED)], district("12"));

        assert_eq!(coordinator.request_refresh().await, Ok(RefreshOutcome::Updated));

        let snap = coordinator.current_snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].code, Severity::Red);
        assert_eq!(snap.counts.highest_severity, Severity::Red);
        assert_eq!(snap.counts.alerts_count, 1);
        assert_eq!(snap.state, "Alert");
        assert!(coordinator.last_update_succeeded());
    }

    #[tokio::test]
    async fn test_empty_message_selection_suppresses_messages() {
        let config = FilterConfig {
            include_messages: true,
            message_types: Vec::new(),
            ..Default::default()
        };
        let (_, coordinator) = coordinator(vec![Reply::json(MESSAGE_FEED)], config);

        coordinator.request_refresh().await.unwrap();
        let snap = coordinator.current_snapshot();
        assert_eq!(snap.counts.messages_count, 0);
        assert_eq!(snap.counts.alerts_count, 0);
    }

    #[tokio::test]
    async fn test_not_modified_keeps_snapshot_and_timestamp() {
        let (client, coordinator) = coordinator(
            vec![
                Reply::json_with_validators(DISTRICT_FEED, Some("\"v1\""), None),
                Reply::status(304),
            ],
            district("12"),
        );

        coordinator.request_refresh().await.unwrap();
        let first = coordinator.current_snapshot();

        assert_eq!(coordinator.request_refresh().await, Ok(RefreshOutcome::NotModified));
        let second = coordinator.current_snapshot();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.last_update, first.last_update);
        assert_eq!(coordinator.diagnostics().cycles, 2);
        assert_eq!(client.requests()[1].get("if-none-match").unwrap(), "\"v1\"");
    }

    #[tokio::test]
    async fn test_failure_keeps_snapshot_and_backs_off() {
        let (_, coordinator) = coordinator(
            vec![
                Reply::json(DISTRICT_FEED),
                Reply::status(503),
                Reply::TransportError,
                Reply::json("{broken"),
            ],
            district("12"),
        );

        coordinator.request_refresh().await.unwrap();
        let good = coordinator.current_snapshot();

        assert!(matches!(
            coordinator.request_refresh().await,
            Err(FetchError::Communication(_))
        ));
        assert!(!coordinator.last_update_succeeded());
        assert_eq!(coordinator.current_interval(), Duration::from_secs(600));

        assert!(coordinator.request_refresh().await.is_err());
        assert_eq!(coordinator.current_interval(), Duration::from_secs(1200));

        assert!(matches!(
            coordinator.request_refresh().await,
            Err(FetchError::InvalidResponse(_))
        ));
        assert_eq!(coordinator.current_interval(), Duration::from_secs(2400));

        assert!(Arc::ptr_eq(&good, &coordinator.current_snapshot()));
        let diag = coordinator.diagnostics();
        assert_eq!(diag.consecutive_failures, 3);
        assert!(diag.last_error.is_some());
    }

    #[tokio::test]
    async fn test_success_resets_backoff() {
        let (_, coordinator) = coordinator(
            vec![Reply::status(500), Reply::status(500), Reply::status(304)],
            district("12"),
        );
        let _ = coordinator.request_refresh().await;
        let _ = coordinator.request_refresh().await;
        assert_eq!(coordinator.current_interval(), Duration::from_secs(1200));

        coordinator.request_refresh().await.unwrap();
        assert_eq!(coordinator.current_interval(), Duration::from_secs(300));
        assert!(coordinator.last_update_succeeded());
        assert_eq!(coordinator.diagnostics().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_config_update_applies_on_next_cycle() {
        let (_, coordinator) = coordinator(
            vec![Reply::json(DISTRICT_FEED), Reply::json(DISTRICT_FEED)],
            district("12"),
        );
        coordinator.request_refresh().await.unwrap();
        assert_eq!(coordinator.current_snapshot().counts.highest_severity, Severity::Red);

        coordinator.update_config(district("14"));
        assert_eq!(coordinator.current_snapshot().counts.highest_severity, Severity::Red);

        coordinator.request_refresh().await.unwrap();
        let snap = coordinator.current_snapshot();
        assert_eq!(snap.counts.highest_severity, Severity::Yellow);
        assert_eq!(snap.filter.district, "14");
    }

    #[tokio::test]
    async fn test_not_modified_after_config_change_refilters_cache() {
        let (_, coordinator) = coordinator(
            vec![
                Reply::json_with_validators(DISTRICT_FEED, Some("\"v1\""), None),
                Reply::status(304),
            ],
            district("12"),
        );
        coordinator.request_refresh().await.unwrap();
        let stamped = coordinator.current_snapshot().last_update;

        coordinator.update_config(district("14"));
        assert_eq!(coordinator.request_refresh().await, Ok(RefreshOutcome::Refiltered));

        let snap = coordinator.current_snapshot();
        assert_eq!(snap.counts.highest_severity, Severity::Yellow);
        assert_eq!(snap.last_update, stamped);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_never_overlap() {
        let client = Arc::new(ScriptedClient::gated(vec![
            Reply::json(DISTRICT_FEED),
            Reply::json(DISTRICT_FEED),
            Reply::json(DISTRICT_FEED),
        ]));
        let coordinator = Arc::new(Coordinator::new(client.clone(), settings(), district("12")));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.request_refresh().await })
            })
            .collect();

        // Let every task reach the cycle lock before releasing replies.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.request_count(), 1);
        client.release(3);

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(RefreshOutcome::Updated));
        }
        assert_eq!(client.request_count(), 3);
        assert_eq!(client.max_in_flight(), 1);
        assert_eq!(coordinator.diagnostics().cycles, 3);
    }

    #[tokio::test]
    async fn test_snapshot_readable_while_cycle_in_flight() {
        let client = Arc::new(ScriptedClient::gated(vec![Reply::json(DISTRICT_FEED)]));
        let coordinator = Arc::new(Coordinator::new(client.clone(), settings(), district("12")));

        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.request_refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let before = coordinator.current_snapshot();
        assert!(before.messages.is_empty());
        assert_eq!(before.last_update, None);
        assert_eq!(coordinator.diagnostics().cycles, 1);

        client.release(1);
        task.await.unwrap().unwrap();
        assert_eq!(coordinator.current_snapshot().messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_waits_current_interval() {
        let client = Arc::new(ScriptedClient::new(vec![Reply::status(500), Reply::json("[]")]));
        let coordinator = Arc::new(Coordinator::new(client.clone(), settings(), district("12")));

        let runner = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run().await })
        };

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(client.request_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(client.request_count(), 1);
        assert_eq!(coordinator.current_interval(), Duration::from_secs(600));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(client.request_count(), 2);
        assert!(coordinator.last_update_succeeded());

        runner.abort();
    }
}
