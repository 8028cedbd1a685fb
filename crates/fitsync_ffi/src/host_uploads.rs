//! Host-performed uploads and the signed-in session.
//!
//! # Responsibility
//! - Turn orchestrator uploads into [`PlatformCommand`]s for the host's HTTP
//!   transport and replay the status the host reports back.
//! - Hold the identity pushed by the host and queue a sign-out on 401.
//!
//! # Invariants
//! - A request body is queued once until the host reports its outcome.
//! - Until then the upload answers [`AWAITING_HOST_STATUS`], so the
//!   orchestrator keeps the delivery queued and uncommitted.
//! - A reported failure is consumed by the pass that reads it; the next pass
//!   queues the request again. Successes are remembered, bounded.

use crate::host_platform::{push_command, Outbox, PlatformCommand};
use fitsync_core::model::summary::ActivitySummary;
use fitsync_core::service::upload::{DatastreamBatch, UploadFailure, UploadSink};
use fitsync_core::{Identity, Session};
use log::{info, warn};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Status reported while the host has not answered a queued upload.
///
/// Hosts report it too for transport errors that never got a response.
pub const AWAITING_HOST_STATUS: u16 = 0;

const REMEMBERED_SUCCESSES: usize = 64;

#[derive(Debug, Default)]
struct UploadLedger {
    in_flight: HashSet<String>,
    failures: HashMap<String, UploadFailure>,
    succeeded: VecDeque<String>,
}

/// [`UploadSink`] whose transport is the host app.
#[derive(Debug)]
pub struct HostUploadSink {
    outbox: Outbox,
    datastream_enabled: AtomicBool,
    ledger: Mutex<UploadLedger>,
}

impl HostUploadSink {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            outbox,
            datastream_enabled: AtomicBool::new(true),
            ledger: Mutex::default(),
        }
    }

    pub fn set_datastream_enabled(&self, enabled: bool) {
        self.datastream_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Records the host's HTTP status for a queued request.
    ///
    /// # Errors
    /// - The key does not name a request awaiting an outcome.
    pub fn record_outcome(
        &self,
        request_key: &str,
        status: u16,
        message: String,
    ) -> Result<(), String> {
        let mut ledger = self.ledger();
        if !ledger.in_flight.remove(request_key) {
            return Err(format!("unknown upload request `{request_key}`"));
        }

        if (200..=299).contains(&status) {
            ledger.succeeded.push_back(request_key.to_string());
            if ledger.succeeded.len() > REMEMBERED_SUCCESSES {
                ledger.succeeded.pop_front();
            }
        } else {
            ledger
                .failures
                .insert(request_key.to_string(), UploadFailure { status, message });
        }
        info!(
            "event=host_upload module=ffi status=reported request_key={request_key} http_status={status}"
        );
        Ok(())
    }

    pub fn in_flight_count(&self) -> usize {
        self.ledger().in_flight.len()
    }

    fn dispatch(
        &self,
        request_key: String,
        command: impl FnOnce(String) -> PlatformCommand,
    ) -> Result<(), UploadFailure> {
        let mut ledger = self.ledger();
        if ledger.succeeded.contains(&request_key) {
            return Ok(());
        }
        if let Some(failure) = ledger.failures.remove(&request_key) {
            return Err(failure);
        }
        if ledger.in_flight.insert(request_key.clone()) {
            push_command(&self.outbox, command(request_key.clone()));
            info!("event=host_upload module=ffi status=queued request_key={request_key}");
        }
        Err(UploadFailure {
            status: AWAITING_HOST_STATUS,
            message: format!("awaiting host upload {request_key}"),
        })
    }

    fn ledger(&self) -> MutexGuard<'_, UploadLedger> {
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl UploadSink for HostUploadSink {
    fn datastream_enabled(&self) -> bool {
        self.datastream_enabled.load(Ordering::SeqCst)
    }

    fn post_workout_records(
        &self,
        bearer: Option<&str>,
        batch: &DatastreamBatch,
    ) -> Result<(), UploadFailure> {
        let body_json = encode(batch)?;
        let request_key = request_key("datastream", &[body_json.as_str()]);
        self.dispatch(request_key, |request_key| {
            PlatformCommand::UploadWorkoutRecords {
                request_key,
                bearer: bearer.map(str::to_string),
                body_json,
            }
        })
    }

    fn post_summary_observation(
        &self,
        bearer: &str,
        patient_id: &str,
        summary: &ActivitySummary,
    ) -> Result<(), UploadFailure> {
        let body_json = encode(summary)?;
        let request_key = request_key("observation", &[patient_id, body_json.as_str()]);
        self.dispatch(request_key, |request_key| {
            PlatformCommand::PostSummaryObservation {
                request_key,
                bearer: bearer.to_string(),
                patient_id: patient_id.to_string(),
                body_json,
            }
        })
    }
}

/// [`Session`] whose identity is pushed by the host.
#[derive(Debug)]
pub struct HostSession {
    outbox: Outbox,
    identity: Mutex<Option<Identity>>,
}

impl HostSession {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            outbox,
            identity: Mutex::new(None),
        }
    }

    pub fn set_identity(&self, identity: Option<Identity>) {
        *self.slot() = identity;
    }

    fn slot(&self) -> MutexGuard<'_, Option<Identity>> {
        match self.identity.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Session for HostSession {
    fn identity(&self) -> Option<Identity> {
        self.slot().clone()
    }

    fn sign_out(&self) {
        if self.slot().take().is_none() {
            return;
        }
        warn!("event=session module=ffi status=signed_out reason=unauthorized");
        push_command(&self.outbox, PlatformCommand::SignOut);
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, UploadFailure> {
    serde_json::to_string(value).map_err(|err| UploadFailure {
        status: AWAITING_HOST_STATUS,
        message: format!("encode failed: {err}"),
    })
}

fn request_key(kind: &str, parts: &[&str]) -> String {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    format!("{kind}-{:016x}", hasher.finish())
}
