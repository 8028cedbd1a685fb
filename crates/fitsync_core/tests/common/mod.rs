#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fitsync_core::model::workout_activity::WorkoutActivityType;
use fitsync_core::platform::{
    AnchoredFetchRequest, BackgroundFrequency, CompletionHandler, FetchBatch, HealthPlatform,
    ObserverRequest, PlatformSample, QuantityType, RecordType,
};
use fitsync_core::{ActivitySummary, Anchor, Delivery, EventListener, HealthError, HealthResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Health platform double that records every command it receives.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub available: bool,
    pub fail_fetch_start: bool,
    pub fail_summary: bool,
    pub summary: Option<ActivitySummary>,
    pub authorizations: Vec<Vec<RecordType>>,
    pub observers_started: Vec<ObserverRequest>,
    pub observers_stopped: Vec<u64>,
    pub fetches: Vec<AnchoredFetchRequest>,
    pub background: Vec<(RecordType, BackgroundFrequency)>,
    pub summary_days: Vec<NaiveDate>,
}

impl FakePlatform {
    pub fn available() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

impl HealthPlatform for FakePlatform {
    fn is_health_data_available(&self) -> bool {
        self.available
    }

    fn request_authorization(&mut self, read: &[RecordType]) -> HealthResult<()> {
        self.authorizations.push(read.to_vec());
        Ok(())
    }

    fn start_observer(&mut self, request: ObserverRequest) -> HealthResult<()> {
        self.observers_started.push(request);
        Ok(())
    }

    fn stop_observer(&mut self, generation: u64) {
        self.observers_stopped.push(generation);
    }

    fn execute_anchored_fetch(&mut self, request: AnchoredFetchRequest) -> HealthResult<()> {
        if self.fail_fetch_start {
            return Err(HealthError::Platform("query rejected".to_string()));
        }
        self.fetches.push(request);
        Ok(())
    }

    fn enable_background_delivery(
        &mut self,
        record_type: RecordType,
        frequency: BackgroundFrequency,
    ) -> HealthResult<()> {
        self.background.push((record_type, frequency));
        Ok(())
    }

    fn query_activity_summary(&mut self, day: NaiveDate) -> HealthResult<Option<ActivitySummary>> {
        self.summary_days.push(day);
        if self.fail_summary {
            return Err(HealthError::Platform("summary query failed".to_string()));
        }
        Ok(self.summary)
    }
}

/// Listener that keeps a copy of everything it is handed.
#[derive(Debug, Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<Delivery>>,
}

impl RecordingListener {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.seen.lock().unwrap().clone()
    }
}

impl EventListener for RecordingListener {
    fn notify(&self, delivery: &Delivery) {
        self.seen.lock().unwrap().push(delivery.clone());
    }
}

/// Completion handler plus the counter it bumps when fired.
pub fn counted_completion() -> (CompletionHandler, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let handler = CompletionHandler::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (handler, fired)
}

pub fn fired(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
}

pub fn workout_sample(uuid: Uuid, activity_type: WorkoutActivityType) -> PlatformSample {
    PlatformSample::Workout {
        uuid,
        start: at(9, 7, 0),
        end: at(9, 7, 45),
        activity_type,
        duration_secs: 2700.0,
        active_energy_kcal: Some(410.2),
    }
}

pub fn steps_sample(uuid: Uuid, value: f64) -> PlatformSample {
    PlatformSample::Quantity {
        uuid,
        start: at(9, 12, 0),
        end: at(9, 12, 30),
        quantity_type: QuantityType::StepCount,
        value,
    }
}

pub fn batch(created: Vec<PlatformSample>, removed: Vec<Uuid>, anchor: &[u8]) -> FetchBatch {
    FetchBatch {
        created,
        removed,
        anchor: Some(Anchor::from_bytes(anchor.to_vec())),
    }
}
