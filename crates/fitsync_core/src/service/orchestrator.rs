//! Sync orchestration: routed events into local state, uploads, commits.
//!
//! # Responsibility
//! - Consume connector deliveries outside the connector's call stack.
//! - Mirror records locally, forward uploads, then commit each transaction.
//!
//! # Invariants
//! - A transaction is committed only after its records are absorbed and
//!   every required upload has succeeded or been classified as 401.
//! - On a hard upload failure the failing delivery and everything after it
//!   stay queued and uncommitted, so no later anchor can be checkpointed
//!   past unuploaded records.
//! - Status events never commit: they carry no token and must not consume
//!   the platform completion handler.

use crate::config::ActivityStateConfig;
use crate::model::record::DomainRecord;
use crate::platform::HealthPlatform;
use crate::repo::kv_store::KeyValueStore;
use crate::service::activity_state::ActivityState;
use crate::service::upload::{
    check_response_status, DatastreamBatch, UploadError, UploadSink, DATASTREAM_SERVICE,
    EMR_SERVICE,
};
use crate::sync::connector::HealthConnector;
use crate::sync::error::HealthError;
use crate::sync::event::{Delivery, HealthEvent};
use crate::sync::router::{EventInbox, EventListener};
use log::{error, info, warn};
use std::sync::Arc;

/// Signed-in user as seen by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub jwt: String,
    /// Clinical-records patient id; observations need one.
    pub patient_id: Option<String>,
}

/// Host session hooks.
pub trait Session {
    fn identity(&self) -> Option<Identity>;
    fn sign_out(&self);
}

/// Outcome of one [`SyncOrchestrator::process_pending`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub processed: usize,
    pub committed: usize,
    pub records_added: usize,
    pub records_removed: usize,
    /// Display labels of workouts seen in this pass, for a user notification.
    pub new_workouts: Vec<String>,
}

/// Consumer side of the health connector.
pub struct SyncOrchestrator<U: UploadSink, A: Session> {
    inbox: Arc<EventInbox>,
    state: ActivityState,
    uploads: U,
    session: A,
}

impl<U: UploadSink, A: Session> SyncOrchestrator<U, A> {
    pub fn new(uploads: U, session: A, config: ActivityStateConfig) -> Self {
        Self {
            inbox: Arc::new(EventInbox::new()),
            state: ActivityState::new(config),
            uploads,
            session,
        }
    }

    /// Loads today's summary and starts receiving connector events.
    pub fn attach<P: HealthPlatform, S: KeyValueStore>(
        &mut self,
        connector: &mut HealthConnector<P, S>,
    ) {
        self.refresh_summary(connector);
        connector.attach(self.listener());
    }

    pub fn detach<P: HealthPlatform, S: KeyValueStore>(
        &self,
        connector: &mut HealthConnector<P, S>,
    ) {
        connector.detach(&self.listener());
    }

    /// Processes every queued delivery in arrival order.
    ///
    /// # Errors
    /// - `UploadError::RequestFailed` for a non-2xx, non-401 upload; the
    ///   failing delivery and the rest stay queued for the next pass.
    pub fn process_pending<P: HealthPlatform, S: KeyValueStore>(
        &mut self,
        connector: &mut HealthConnector<P, S>,
    ) -> Result<SyncReport, UploadError> {
        let mut report = SyncReport::default();
        let mut deliveries = self.inbox.drain().into_iter();

        while let Some(delivery) = deliveries.next() {
            if let Err(err) = self.process(connector, &delivery, &mut report) {
                error!(
                    "event=sync_process module=service status=error kind={} error={err}",
                    delivery.event.name()
                );
                let mut remaining = vec![delivery];
                remaining.extend(deliveries);
                self.inbox.requeue_front(remaining);
                return Err(err);
            }
            report.processed += 1;
        }

        info!(
            "event=sync_process module=service status=ok processed={} committed={} added={} removed={}",
            report.processed, report.committed, report.records_added, report.records_removed
        );
        Ok(report)
    }

    /// Clears local state and restarts the connector from an empty history.
    ///
    /// Records inside the lookback window will be delivered again.
    pub fn reset_history<P: HealthPlatform, S: KeyValueStore>(
        &mut self,
        connector: &mut HealthConnector<P, S>,
    ) {
        self.state.clear();
        connector.reset();
        connector.start();
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn pending_count(&self) -> usize {
        self.inbox.len()
    }

    pub fn uploads(&self) -> &U {
        &self.uploads
    }

    pub fn session(&self) -> &A {
        &self.session
    }

    fn listener(&self) -> Arc<dyn EventListener> {
        self.inbox.clone()
    }

    fn process<P: HealthPlatform, S: KeyValueStore>(
        &mut self,
        connector: &mut HealthConnector<P, S>,
        delivery: &Delivery,
        report: &mut SyncReport,
    ) -> Result<(), UploadError> {
        match &delivery.event {
            HealthEvent::SamplesCreated(records) => {
                self.absorb_created(connector, records, report)?;
            }
            HealthEvent::ObjectsRemoved(ids) => {
                report.records_removed += self.state.remove(ids);
            }
            HealthEvent::QueryStatusChanged(status) => {
                self.state.set_service_status(*status);
                return Ok(());
            }
        }

        connector.commit(delivery.transaction.as_deref());
        report.committed += 1;
        Ok(())
    }

    fn absorb_created<P: HealthPlatform, S: KeyValueStore>(
        &mut self,
        connector: &mut HealthConnector<P, S>,
        records: &[DomainRecord],
        report: &mut SyncReport,
    ) -> Result<(), UploadError> {
        let identity = self.session.identity();
        let mut workouts = Vec::new();
        let mut steps = Vec::new();
        for record in records {
            match record {
                DomainRecord::Workout(workout) => workouts.push(workout.clone()),
                DomainRecord::Steps(sample) => steps.push(sample.clone()),
            }
        }

        if self.uploads.datastream_enabled() && !workouts.is_empty() {
            let batch = DatastreamBatch::from_workouts(&workouts);
            let bearer = identity.as_ref().map(|identity| identity.jwt.as_str());
            let outcome = self.uploads.post_workout_records(bearer, &batch);
            self.apply_upload_policy(check_response_status(DATASTREAM_SERVICE, outcome))?;
        }

        report.new_workouts.extend(
            workouts
                .iter()
                .filter_map(|workout| workout.header.display.clone()),
        );
        report.records_added += self.state.push_workouts(workouts);
        report.records_added += self.state.push_steps(steps);

        let summary = summary_or_none(connector.today_summary());
        if let (Some(identity), Some(summary)) = (identity.as_ref(), summary.as_ref()) {
            if let Some(patient_id) = identity.patient_id.as_deref() {
                let outcome =
                    self.uploads
                        .post_summary_observation(&identity.jwt, patient_id, summary);
                self.apply_upload_policy(check_response_status(EMR_SERVICE, outcome))?;
            }
        }
        self.state.update_summary(summary);
        Ok(())
    }

    fn apply_upload_policy(&self, result: Result<(), UploadError>) -> Result<(), UploadError> {
        match result {
            Err(UploadError::Unauthorized { service }) => {
                warn!("event=upload module=service status=unauthorized service={service}");
                self.session.sign_out();
                Ok(())
            }
            other => other,
        }
    }

    fn refresh_summary<P: HealthPlatform, S: KeyValueStore>(
        &mut self,
        connector: &mut HealthConnector<P, S>,
    ) {
        let summary = summary_or_none(connector.today_summary());
        self.state.update_summary(summary);
    }
}

fn summary_or_none<T>(result: Result<Option<T>, HealthError>) -> Option<T> {
    match result {
        Ok(summary) => summary,
        Err(err) => {
            warn!("event=activity_summary module=service status=skip error={err}");
            None
        }
    }
}
