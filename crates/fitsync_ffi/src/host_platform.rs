//! Command-queue health platform for the native host.
//!
//! # Responsibility
//! - Turn connector calls into [`PlatformCommand`]s the host polls and runs.
//! - Convert host-side sample payloads into core platform samples.
//!
//! # Invariants
//! - Commands are drained in the order they were issued.
//! - Completion callbacks are queued even after the runtime lock is released,
//!   so the outbox is shared with every pending completion handler.
//! - Malformed host samples are skipped, counted and logged, never fatal.
//! - Only the most recent day's summary is cached.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fitsync_core::model::workout_activity::WorkoutActivityType;
use fitsync_core::platform::{
    AnchoredFetchRequest, BackgroundFrequency, CompletionHandler, FetchBatch, HealthPlatform,
    ObserverRequest, PlatformSample, QuantityType, QueryDescriptor, RecordType,
};
use fitsync_core::{ActivitySummary, Anchor, HealthError, HealthResult};
use log::warn;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Host-side work requested by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCommand {
    RequestAuthorization {
        record_types: Vec<String>,
    },
    StartObserver {
        generation: u64,
        record_types: Vec<String>,
        start_after_epoch_ms: Option<i64>,
    },
    StopObserver {
        generation: u64,
    },
    ExecuteAnchoredFetch {
        generation: u64,
        record_types: Vec<String>,
        start_after_epoch_ms: Option<i64>,
        anchor: Option<Vec<u8>>,
    },
    EnableBackgroundDelivery {
        record_type: String,
        frequency: String,
    },
    /// Host should push a fresh summary for `day` (`YYYY-MM-DD`).
    RefreshActivitySummary {
        day: String,
    },
    /// Host must invoke the native completion handler `callback_id`.
    CompleteNotification {
        callback_id: u64,
    },
    /// POST `body_json` to the datastream `/records` endpoint, then report
    /// the status with `health_report_upload`.
    UploadWorkoutRecords {
        request_key: String,
        bearer: Option<String>,
        body_json: String,
    },
    /// POST `body_json` as an activity observation for `patient_id`, then
    /// report the status with `health_report_upload`.
    PostSummaryObservation {
        request_key: String,
        bearer: String,
        patient_id: String,
        body_json: String,
    },
    /// Credentials were rejected; the host should end the user session.
    SignOut,
}

/// Workout as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostWorkoutSample {
    pub uuid: String,
    pub start_epoch_ms: i64,
    pub end_epoch_ms: i64,
    /// Raw platform activity code.
    pub activity_type: u32,
    pub duration_secs: f64,
    pub active_energy_kcal: Option<f64>,
}

/// Quantity sample as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostQuantitySample {
    pub uuid: String,
    pub start_epoch_ms: i64,
    pub end_epoch_ms: i64,
    /// `step_count` or any other platform identifier.
    pub quantity_type: String,
    pub value: f64,
}

/// One anchored fetch result or live update from the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostFetchBatch {
    pub workouts: Vec<HostWorkoutSample>,
    pub quantities: Vec<HostQuantitySample>,
    pub removed: Vec<String>,
    pub anchor: Option<Vec<u8>>,
}

pub type Outbox = Arc<Mutex<Vec<PlatformCommand>>>;

/// Core batch converted from a [`HostFetchBatch`].
#[derive(Debug)]
pub struct ConvertedBatch {
    pub batch: FetchBatch,
    /// Samples and removal ids that could not be parsed.
    pub skipped: usize,
}

/// [`HealthPlatform`] backed by a host-polled command queue.
#[derive(Debug, Default)]
pub struct CommandQueuePlatform {
    available: bool,
    outbox: Outbox,
    summary: Option<(NaiveDate, ActivitySummary)>,
}

impl CommandQueuePlatform {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Caches the host's summary for `day` unless a later day is already held.
    pub fn store_summary(&mut self, day: NaiveDate, summary: ActivitySummary) {
        if matches!(self.summary, Some((held, _)) if held > day) {
            warn!("event=summary_cache module=ffi status=skip reason=older_day day={day}");
            return;
        }
        self.summary = Some((day, summary));
    }

    /// Shares the command queue with other host adapters.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Completion handler that queues a `CompleteNotification` when fired.
    pub fn completion_for(&self, callback_id: u64) -> CompletionHandler {
        let outbox = self.outbox.clone();
        CompletionHandler::new(move || {
            push_command(&outbox, PlatformCommand::CompleteNotification { callback_id });
        })
    }

    /// Removes and returns every queued command.
    pub fn take_commands(&self) -> Vec<PlatformCommand> {
        match self.outbox.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push(&self, command: PlatformCommand) {
        push_command(&self.outbox, command);
    }
}

impl HealthPlatform for CommandQueuePlatform {
    fn is_health_data_available(&self) -> bool {
        self.available
    }

    fn request_authorization(&mut self, read: &[RecordType]) -> HealthResult<()> {
        self.push(PlatformCommand::RequestAuthorization {
            record_types: read.iter().map(|kind| record_type_name(*kind).to_string()).collect(),
        });
        Ok(())
    }

    fn start_observer(&mut self, request: ObserverRequest) -> HealthResult<()> {
        let (record_types, start_after_epoch_ms) = flatten_descriptors(&request.descriptors);
        self.push(PlatformCommand::StartObserver {
            generation: request.generation,
            record_types,
            start_after_epoch_ms,
        });
        Ok(())
    }

    fn stop_observer(&mut self, generation: u64) {
        self.push(PlatformCommand::StopObserver { generation });
    }

    fn execute_anchored_fetch(&mut self, request: AnchoredFetchRequest) -> HealthResult<()> {
        let (record_types, start_after_epoch_ms) = flatten_descriptors(&request.descriptors);
        self.push(PlatformCommand::ExecuteAnchoredFetch {
            generation: request.generation,
            record_types,
            start_after_epoch_ms,
            anchor: request.anchor.map(|anchor| anchor.as_bytes().to_vec()),
        });
        Ok(())
    }

    fn enable_background_delivery(
        &mut self,
        record_type: RecordType,
        frequency: BackgroundFrequency,
    ) -> HealthResult<()> {
        self.push(PlatformCommand::EnableBackgroundDelivery {
            record_type: record_type_name(record_type).to_string(),
            frequency: frequency_name(frequency).to_string(),
        });
        Ok(())
    }

    fn query_activity_summary(&mut self, day: NaiveDate) -> HealthResult<Option<ActivitySummary>> {
        self.push(PlatformCommand::RefreshActivitySummary {
            day: day.format("%Y-%m-%d").to_string(),
        });
        Ok(self
            .summary
            .filter(|(held, _)| *held == day)
            .map(|(_, summary)| summary))
    }
}

/// Converts a host batch; unusable samples are dropped with a warning and counted.
pub fn to_fetch_batch(batch: HostFetchBatch) -> ConvertedBatch {
    let mut skipped = 0;
    let mut created = Vec::with_capacity(batch.workouts.len() + batch.quantities.len());
    for workout in batch.workouts {
        match workout_sample(&workout) {
            Ok(sample) => created.push(sample),
            Err(err) => {
                skipped += 1;
                warn!("event=host_sample module=ffi status=skip kind=workout error={err}");
            }
        }
    }
    for quantity in batch.quantities {
        match quantity_sample(&quantity) {
            Ok(sample) => created.push(sample),
            Err(err) => {
                skipped += 1;
                warn!("event=host_sample module=ffi status=skip kind=quantity error={err}");
            }
        }
    }

    let removed = batch
        .removed
        .iter()
        .filter_map(|raw| match Uuid::parse_str(raw) {
            Ok(uuid) => Some(uuid),
            Err(err) => {
                skipped += 1;
                warn!("event=host_sample module=ffi status=skip kind=removed error={err}");
                None
            }
        })
        .collect();

    ConvertedBatch {
        batch: FetchBatch {
            created,
            removed,
            anchor: batch
                .anchor
                .filter(|bytes| !bytes.is_empty())
                .map(Anchor::from_bytes),
        },
        skipped,
    }
}

pub fn parse_day(raw: &str) -> HealthResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| HealthError::Platform(format!("invalid day `{raw}`: {err}")))
}

fn workout_sample(sample: &HostWorkoutSample) -> HealthResult<PlatformSample> {
    Ok(PlatformSample::Workout {
        uuid: parse_uuid(&sample.uuid)?,
        start: from_epoch_ms(sample.start_epoch_ms)?,
        end: from_epoch_ms(sample.end_epoch_ms)?,
        activity_type: WorkoutActivityType::from_raw(sample.activity_type),
        duration_secs: sample.duration_secs,
        active_energy_kcal: sample.active_energy_kcal,
    })
}

fn quantity_sample(sample: &HostQuantitySample) -> HealthResult<PlatformSample> {
    let quantity_type = match sample.quantity_type.as_str() {
        "step_count" => QuantityType::StepCount,
        other => QuantityType::Other(other.to_string()),
    };
    Ok(PlatformSample::Quantity {
        uuid: parse_uuid(&sample.uuid)?,
        start: from_epoch_ms(sample.start_epoch_ms)?,
        end: from_epoch_ms(sample.end_epoch_ms)?,
        quantity_type,
        value: sample.value,
    })
}

fn parse_uuid(raw: &str) -> HealthResult<Uuid> {
    Uuid::parse_str(raw).map_err(|err| HealthError::Platform(format!("invalid uuid: {err}")))
}

fn from_epoch_ms(value: i64) -> HealthResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| HealthError::Platform(format!("timestamp out of range: {value}")))
}

fn flatten_descriptors(descriptors: &[QueryDescriptor]) -> (Vec<String>, Option<i64>) {
    let record_types = descriptors
        .iter()
        .map(|descriptor| record_type_name(descriptor.record_type).to_string())
        .collect();
    let start_after = descriptors
        .iter()
        .filter_map(|descriptor| descriptor.start_after)
        .min()
        .map(|instant| instant.timestamp_millis());
    (record_types, start_after)
}

fn record_type_name(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::Workout => "workout",
        RecordType::StepCount => "step_count",
        RecordType::ActivitySummary => "activity_summary",
    }
}

fn frequency_name(frequency: BackgroundFrequency) -> &'static str {
    match frequency {
        BackgroundFrequency::Immediate => "immediate",
        BackgroundFrequency::Hourly => "hourly",
        BackgroundFrequency::Daily => "daily",
        BackgroundFrequency::Weekly => "weekly",
    }
}

pub(crate) fn push_command(outbox: &Outbox, command: PlatformCommand) {
    match outbox.lock() {
        Ok(mut queue) => queue.push(command),
        Err(poisoned) => poisoned.into_inner().push(command),
    }
}
