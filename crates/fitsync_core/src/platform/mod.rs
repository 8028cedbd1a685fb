//! Health platform boundary.
//!
//! # Responsibility
//! - Describe the calls the sync subsystem issues to the platform store.
//! - Describe the raw shapes the platform hands back.
//!
//! # Invariants
//! - Command methods return immediately; observer notifications and anchored
//!   fetch results re-enter the connector later through its `on_*` methods.
//! - Authorization denial is not an error: the platform just returns nothing.
//! - Every request carries the subscription generation it belongs to and the
//!   platform echoes it back unchanged.

use crate::model::summary::ActivitySummary;
use crate::model::workout_activity::WorkoutActivityType;
use crate::sync::anchor::Anchor;
use crate::sync::error::HealthResult;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::{Debug, Formatter};
use uuid::Uuid;

/// Platform record types the app reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Workout,
    StepCount,
    ActivitySummary,
}

/// Background wake-up frequency requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFrequency {
    Immediate,
    Hourly,
    Daily,
    Weekly,
}

/// One record type plus the sample predicate applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub record_type: RecordType,
    /// Samples starting before this instant are never fetched.
    pub start_after: Option<DateTime<Utc>>,
}

/// Long-lived change subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverRequest {
    pub generation: u64,
    pub descriptors: Vec<QueryDescriptor>,
}

/// Incremental fetch request.
///
/// There is no result limit: the platform batches internally and the
/// fetch stays subscribed for live updates until its observer is stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredFetchRequest {
    pub generation: u64,
    pub descriptors: Vec<QueryDescriptor>,
    pub anchor: Option<Anchor>,
}

/// Quantity sample kind.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityType {
    StepCount,
    Other(String),
}

/// Raw platform sample as delivered by an anchored fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformSample {
    Workout {
        uuid: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        activity_type: WorkoutActivityType,
        duration_secs: f64,
        /// Absent on platform versions without per-workout statistics.
        active_energy_kcal: Option<f64>,
    },
    Quantity {
        uuid: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity_type: QuantityType,
        value: f64,
    },
    Category {
        uuid: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Correlation {
        uuid: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Result payload of one anchored fetch or live update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBatch {
    pub created: Vec<PlatformSample>,
    pub removed: Vec<Uuid>,
    pub anchor: Option<Anchor>,
}

/// Platform-supplied acknowledgement for one change notification.
///
/// Consumed on invocation, so it can fire at most once.
pub struct CompletionHandler(Box<dyn FnOnce() + Send>);

impl CompletionHandler {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(callback))
    }

    /// Tells the platform the notification has been absorbed.
    pub fn complete(self) {
        (self.0)()
    }
}

impl Debug for CompletionHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("CompletionHandler")
    }
}

/// Commands the sync subsystem issues to the health platform.
pub trait HealthPlatform {
    fn is_health_data_available(&self) -> bool;

    /// Requests read access; denial still returns `Ok`.
    fn request_authorization(&mut self, read: &[RecordType]) -> HealthResult<()>;

    /// Registers a change subscription; notifications carry `request.generation`.
    fn start_observer(&mut self, request: ObserverRequest) -> HealthResult<()>;

    /// Cancels the subscription; an in-flight fetch may still report back.
    fn stop_observer(&mut self, generation: u64);

    /// Starts an anchored fetch; the result arrives via `on_fetch_result`.
    fn execute_anchored_fetch(&mut self, request: AnchoredFetchRequest) -> HealthResult<()>;

    fn enable_background_delivery(
        &mut self,
        record_type: RecordType,
        frequency: BackgroundFrequency,
    ) -> HealthResult<()>;

    /// Returns the summary for `day`, or `None` when none is recorded.
    fn query_activity_summary(&mut self, day: NaiveDate) -> HealthResult<Option<ActivitySummary>>;
}
