//! Outbound upload contracts and response-status policy.
//!
//! # Responsibility
//! - Shape workout records for the time-series datastream endpoint.
//! - Classify upload outcomes: 401 signs the session out, any other
//!   non-2xx status is a hard failure for the caller.
//!
//! The HTTP transport itself lives in the host app behind [`UploadSink`].

use crate::model::record::Workout;
use crate::model::summary::ActivitySummary;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DATASTREAM_SERVICE: &str = "Time Series Data Stream";
pub const EMR_SERVICE: &str = "EMR";

/// One workout as accepted by the datastream `/records` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamRecord {
    pub sid: String,
    pub ts: String,
    pub start: String,
    pub finish: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Whole seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Whole kilocalories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<i64>,
}

impl From<&Workout> for DatastreamRecord {
    fn from(workout: &Workout) -> Self {
        Self {
            sid: workout.header.id.clone(),
            ts: workout.header.start_date.clone(),
            start: workout.header.start_date.clone(),
            finish: workout.header.end_date.clone(),
            code: workout.header.code.clone(),
            duration: rounded(workout.duration),
            energy: rounded(workout.active_energy_burned),
        }
    }
}

/// Request body for the datastream `/records` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamBatch {
    pub records: Vec<DatastreamRecord>,
}

impl DatastreamBatch {
    pub fn from_workouts(workouts: &[Workout]) -> Self {
        Self {
            records: workouts.iter().map(DatastreamRecord::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Non-success response reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub status: u16,
    pub message: String,
}

/// Host-provided upload transport.
pub trait UploadSink {
    /// Whether a datastream endpoint is configured at all.
    fn datastream_enabled(&self) -> bool {
        true
    }

    fn post_workout_records(
        &self,
        bearer: Option<&str>,
        batch: &DatastreamBatch,
    ) -> Result<(), UploadFailure>;

    /// Submits the summary as a clinical observation for `patient_id`.
    fn post_summary_observation(
        &self,
        bearer: &str,
        patient_id: &str,
        summary: &ActivitySummary,
    ) -> Result<(), UploadFailure>;
}

/// Classified upload failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The service rejected the session's credentials.
    Unauthorized { service: &'static str },
    RequestFailed {
        service: &'static str,
        status: u16,
        message: String,
    },
}

impl Display for UploadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized { service } => {
                write!(f, "\"{service}\" service rejected credentials")
            }
            Self::RequestFailed {
                service,
                status,
                message,
            } => write!(
                f,
                "\"{service}\" service request has failed, operation status: {status}, details: {message}"
            ),
        }
    }
}

impl Error for UploadError {}

/// Maps a transport outcome onto the upload policy.
pub fn check_response_status(
    service: &'static str,
    outcome: Result<(), UploadFailure>,
) -> Result<(), UploadError> {
    let Err(failure) = outcome else {
        return Ok(());
    };
    match failure.status {
        200..=299 => Ok(()),
        401 => Err(UploadError::Unauthorized { service }),
        status => Err(UploadError::RequestFailed {
            service,
            status,
            message: failure.message,
        }),
    }
}

fn rounded(value: Option<f64>) -> Option<i64> {
    value.map(|v| v.round() as i64)
}
