//! Normalized activity records.
//!
//! # Responsibility
//! - Resolve raw platform samples into workout/steps records once, at
//!   ingestion, so downstream code never re-inspects sample subtypes.
//!
//! # Invariants
//! - `id` is the platform UUID in upper-case hyphenated form and is stable
//!   across fetches; de-duplication is the consumer's job.
//! - Timestamps are ISO-8601 UTC strings with second precision.
//! - Samples that are neither workouts nor step counts are not records.

use crate::platform::{PlatformSample, QuantityType};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    Workout,
    Steps,
}

impl RecordCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workout => "workout",
            Self::Steps => "steps",
        }
    }
}

/// Fields shared by every record category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleHeader {
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl SampleHeader {
    fn from_platform(
        uuid: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        code: String,
        display: String,
    ) -> Self {
        Self {
            id: record_id(uuid),
            start_date: iso8601(start),
            end_date: iso8601(end),
            code: Some(code),
            display: Some(display),
        }
    }
}

/// Workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    #[serde(flatten)]
    pub header: SampleHeader,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Kilocalories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_energy_burned: Option<f64>,
}

/// Step count sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Steps {
    #[serde(flatten)]
    pub header: SampleHeader,
    pub count: f64,
}

/// One normalized record, tagged by `category` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum DomainRecord {
    Workout(Workout),
    Steps(Steps),
}

impl DomainRecord {
    /// Resolves a raw sample; returns `None` for kinds the app does not track.
    pub fn from_sample(sample: &PlatformSample) -> Option<Self> {
        match sample {
            PlatformSample::Workout {
                uuid,
                start,
                end,
                activity_type,
                duration_secs,
                active_energy_kcal,
            } => Some(Self::Workout(Workout {
                header: SampleHeader::from_platform(
                    *uuid,
                    *start,
                    *end,
                    activity_type.code(),
                    activity_type.display_name().to_string(),
                ),
                duration: Some(*duration_secs),
                active_energy_burned: *active_energy_kcal,
            })),
            PlatformSample::Quantity {
                uuid,
                start,
                end,
                quantity_type: QuantityType::StepCount,
                value,
            } => Some(Self::Steps(Steps {
                header: SampleHeader::from_platform(
                    *uuid,
                    *start,
                    *end,
                    "steps".to_string(),
                    "Steps".to_string(),
                ),
                count: *value,
            })),
            PlatformSample::Quantity { .. }
            | PlatformSample::Category { .. }
            | PlatformSample::Correlation { .. } => None,
        }
    }

    pub fn header(&self) -> &SampleHeader {
        match self {
            Self::Workout(workout) => &workout.header,
            Self::Steps(steps) => &steps.header,
        }
    }

    pub fn id(&self) -> &str {
        &self.header().id
    }

    pub fn category(&self) -> RecordCategory {
        match self {
            Self::Workout(_) => RecordCategory::Workout,
            Self::Steps(_) => RecordCategory::Steps,
        }
    }

    pub fn display(&self) -> Option<&str> {
        self.header().display.as_deref()
    }
}

/// Platform UUID rendered the way record ids are exposed.
pub fn record_id(uuid: Uuid) -> String {
    uuid.hyphenated().to_string().to_uppercase()
}

fn iso8601(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
