//! Anchored fetch requests and result normalization.
//!
//! # Invariants
//! - Requests always start from the caller-supplied anchor; the fetcher keeps
//!   no cursor of its own.
//! - A failed fetch produces nothing, so no anchor can advance from it.
//! - Created records precede removals when a batch yields both.

use crate::model::record::{record_id, DomainRecord};
use crate::platform::{AnchoredFetchRequest, FetchBatch, QueryDescriptor, RecordType};
use crate::sync::anchor::Anchor;
use crate::sync::event::HealthEvent;
use chrono::{DateTime, Duration, Utc};

/// Record types covered by the change subscription.
pub const OBSERVED_RECORD_TYPES: [RecordType; 2] = [RecordType::Workout, RecordType::StepCount];

/// Descriptors limiting every observed type to the last `lookback_days`.
pub fn lookback_descriptors(now: DateTime<Utc>, lookback_days: u32) -> Vec<QueryDescriptor> {
    let start_after = now - Duration::days(i64::from(lookback_days));
    OBSERVED_RECORD_TYPES
        .iter()
        .map(|record_type| QueryDescriptor {
            record_type: *record_type,
            start_after: Some(start_after),
        })
        .collect()
}

pub fn fetch_request(
    generation: u64,
    descriptors: Vec<QueryDescriptor>,
    anchor: Option<&Anchor>,
) -> AnchoredFetchRequest {
    AnchoredFetchRequest {
        generation,
        descriptors,
        anchor: anchor.cloned(),
    }
}

/// Normalized contents of one fetch result.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedChanges {
    pub created: Vec<DomainRecord>,
    pub removed: Vec<String>,
    pub anchor: Option<Anchor>,
    /// Samples of kinds the app does not track.
    pub skipped: usize,
}

impl FetchedChanges {
    pub fn from_batch(batch: FetchBatch) -> Self {
        let total = batch.created.len();
        let created = batch
            .created
            .iter()
            .filter_map(DomainRecord::from_sample)
            .collect::<Vec<_>>();
        Self {
            skipped: total - created.len(),
            created,
            removed: batch.removed.into_iter().map(record_id).collect(),
            anchor: batch.anchor,
        }
    }

    /// Events to route for this batch, in emission order.
    pub fn events(&self) -> Vec<HealthEvent> {
        let mut events = Vec::with_capacity(2);
        if !self.created.is_empty() {
            events.push(HealthEvent::SamplesCreated(self.created.clone()));
        }
        if !self.removed.is_empty() {
            events.push(HealthEvent::ObjectsRemoved(self.removed.clone()));
        }
        events
    }
}
