//! Health connector: observer lifecycle, anchored fetches, routing, commits.
//!
//! # Responsibility
//! - Own the one change subscription and the anchor it resumes from.
//! - Turn platform callbacks into routed events with transaction tokens.
//! - Acknowledge platform notifications only when a consumer commits.
//!
//! # Invariants
//! - Fetches always start from the last committed anchor, never from a
//!   fetched-but-uncommitted one: duplicates are preferred over loss.
//! - The retained completion handler fires only from [`HealthConnector::commit`],
//!   except for notifications that carry an error, belong to a stopped
//!   subscription, or whose fetch cannot start.
//! - All methods run on the platform's serialized callback context; the
//!   connector holds no locks of its own.

use crate::config::{ConfigError, ConnectorConfig};
use crate::model::summary::ActivitySummary;
use crate::platform::{CompletionHandler, FetchBatch, HealthPlatform, ObserverRequest, RecordType};
use crate::repo::kv_store::KeyValueStore;
use crate::sync::anchor::Anchor;
use crate::sync::anchor_store::AnchorStore;
use crate::sync::error::{HealthError, HealthResult};
use crate::sync::event::{HealthEvent, QueryStatus};
use crate::sync::fetcher::{
    fetch_request, lookback_descriptors, FetchedChanges, OBSERVED_RECORD_TYPES,
};
use crate::sync::observer::ChangeObserver;
use crate::sync::router::{EventListener, EventRouter};
use chrono::{DateTime, Local, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Source of "now" for lookback windows and the daily summary.
pub type Clock = fn() -> DateTime<Utc>;

/// Anchored-sync subsystem over one platform and one persistence store.
pub struct HealthConnector<P: HealthPlatform, S: KeyValueStore> {
    platform: P,
    anchors: AnchorStore<S>,
    router: EventRouter,
    observer: ChangeObserver,
    config: ConnectorConfig,
    committed_anchor: Option<Anchor>,
    latest_anchor: Option<Anchor>,
    clock: Clock,
}

impl<P: HealthPlatform, S: KeyValueStore> HealthConnector<P, S> {
    /// Builds a connector and resumes from the persisted checkpoint, if any.
    ///
    /// # Errors
    /// - `ConfigError` when `config` fails validation.
    pub fn new(platform: P, kv: S, config: ConnectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let anchors = AnchorStore::new(kv, config.history_key.clone());
        let committed_anchor = anchors.restore();
        info!(
            "event=connector_init module=sync status=ok resumed={} lookback_days={}",
            committed_anchor.is_some(),
            config.lookback_days
        );

        Ok(Self {
            platform,
            anchors,
            router: EventRouter::new(),
            observer: ChangeObserver::new(),
            config,
            committed_anchor,
            latest_anchor: None,
            clock: Utc::now,
        })
    }

    /// Replaces the wall clock, mainly for deterministic tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn attach(&mut self, listener: Arc<dyn EventListener>) {
        self.router.attach(listener);
    }

    pub fn detach(&mut self, listener: &Arc<dyn EventListener>) {
        self.router.detach(listener);
    }

    /// Registers the change subscription and enables background delivery.
    ///
    /// No-op (logged) when health data is unavailable or a query is running.
    pub fn start(&mut self) {
        if !self.platform.is_health_data_available() {
            debug!("event=observer_start module=sync status=skip reason=not_available");
            return;
        }
        if self.observer.is_running() {
            error!("event=observer_start module=sync status=error reason=already_running");
            return;
        }

        if let Err(err) = self.platform.request_authorization(&OBSERVED_RECORD_TYPES) {
            warn!("event=authorization module=sync status=error error={err}");
        }

        let generation = self.observer.next_generation();
        let request = ObserverRequest {
            generation,
            descriptors: lookback_descriptors((self.clock)(), self.config.lookback_days),
        };
        if let Err(err) = self.platform.start_observer(request) {
            error!("event=observer_start module=sync status=error generation={generation} error={err}");
            return;
        }
        self.observer.begin(generation);

        if let Err(err) = self
            .platform
            .enable_background_delivery(RecordType::Workout, self.config.background_frequency)
        {
            error!("event=background_delivery module=sync status=error error={err}");
        }

        info!("event=observer_start module=sync status=ok generation={generation}");
        self.router
            .distribute(HealthEvent::QueryStatusChanged(QueryStatus::Running), None);
    }

    /// Cancels the subscription; no-op when already stopped.
    pub fn stop(&mut self) {
        let Some(generation) = self.observer.end() else {
            return;
        };
        self.platform.stop_observer(generation);
        info!("event=observer_stop module=sync status=ok generation={generation}");
        self.router
            .distribute(HealthEvent::QueryStatusChanged(QueryStatus::Stopped), None);
    }

    /// Stops and forgets all history so the next start resyncs the lookback window.
    pub fn reset(&mut self) {
        self.stop();
        self.committed_anchor = None;
        self.latest_anchor = None;
        self.anchors.reset();
        info!("event=history_reset module=sync status=ok");
    }

    /// Handles one platform change notification.
    pub fn on_change_notification(
        &mut self,
        generation: u64,
        completion: CompletionHandler,
        failure: Option<String>,
    ) {
        if let Some(message) = failure {
            let err = HealthError::FetchFailed(message);
            error!("event=observer_notify module=sync status=error generation={generation} error={err}");
            completion.complete();
            return;
        }
        if self.config.strict_cancellation && !self.observer.is_current(generation) {
            debug!("event=observer_notify module=sync status=skip reason=stale_generation generation={generation}");
            completion.complete();
            return;
        }

        let request = fetch_request(
            generation,
            lookback_descriptors((self.clock)(), self.config.lookback_days),
            self.committed_anchor.as_ref(),
        );
        if let Err(err) = self.platform.execute_anchored_fetch(request) {
            error!("event=anchored_fetch module=sync status=error stage=start error={err}");
            completion.complete();
            return;
        }

        debug!(
            "event=anchored_fetch module=sync status=start generation={generation} from_anchor={}",
            self.committed_anchor.is_some()
        );
        self.observer.retain_completion(completion);
    }

    /// Handles an anchored fetch result or live update.
    pub fn on_fetch_result(&mut self, generation: u64, result: Result<FetchBatch, String>) {
        if self.config.strict_cancellation && !self.observer.is_current(generation) {
            debug!("event=anchored_fetch module=sync status=skip reason=stale_generation generation={generation}");
            return;
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(message) => {
                let err = HealthError::FetchFailed(message);
                error!("event=anchored_fetch module=sync status=error generation={generation} error={err}");
                return;
            }
        };

        let changes = FetchedChanges::from_batch(batch);
        info!(
            "event=anchored_fetch module=sync status=ok generation={generation} created={} removed={} skipped={}",
            changes.created.len(),
            changes.removed.len(),
            changes.skipped
        );
        for event in changes.events() {
            self.router.distribute(event, changes.anchor.as_ref());
        }
        if let Some(anchor) = changes.anchor {
            self.latest_anchor = Some(anchor);
        }
    }

    /// Acknowledges a routed transaction.
    ///
    /// A decodable token is checkpointed and becomes the resume point; the
    /// retained completion handler fires either way.
    pub fn commit(&mut self, transaction: Option<&str>) {
        match transaction.map(Anchor::deserialize) {
            Some(Ok(anchor)) => {
                self.anchors.checkpoint(&anchor);
                self.committed_anchor = Some(anchor);
            }
            Some(Err(err)) => {
                warn!("event=commit module=sync status=error stage=decode error={err}");
            }
            None => debug!("event=commit module=sync status=skip reason=no_token"),
        }

        match self.observer.take_completion() {
            Some(completion) => {
                completion.complete();
                debug!("event=commit module=sync status=ok acknowledged=true");
            }
            None => debug!("event=commit module=sync status=ok acknowledged=false"),
        }
    }

    /// Fetches today's activity summary.
    ///
    /// # Errors
    /// - `HealthError::NotAvailable` when the device has no health store.
    /// - Platform query errors are logged and surface as `Ok(None)`.
    pub fn today_summary(&mut self) -> HealthResult<Option<ActivitySummary>> {
        if !self.platform.is_health_data_available() {
            return Err(HealthError::NotAvailable);
        }
        if let Err(err) = self
            .platform
            .request_authorization(&[RecordType::ActivitySummary])
        {
            warn!("event=authorization module=sync status=error error={err}");
        }

        let today = (self.clock)().with_timezone(&Local).date_naive();
        match self.platform.query_activity_summary(today) {
            Ok(summary) => Ok(summary),
            Err(err) => {
                error!("event=activity_summary module=sync status=error error={err}");
                Ok(None)
            }
        }
    }

    pub fn status(&self) -> QueryStatus {
        self.observer.status()
    }

    /// Resume point for the next fetch.
    pub fn committed_anchor(&self) -> Option<&Anchor> {
        self.committed_anchor.as_ref()
    }

    /// Most recent anchor seen in a fetch result, committed or not.
    pub fn latest_anchor(&self) -> Option<&Anchor> {
        self.latest_anchor.as_ref()
    }

    pub fn has_pending_completion(&self) -> bool {
        self.observer.has_pending_completion()
    }

    pub fn anchor_store(&self) -> &AnchorStore<S> {
        &self.anchors
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }
}
