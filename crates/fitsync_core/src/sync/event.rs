//! Routed health events.

use crate::model::record::DomainRecord;
use crate::sync::anchor::TransactionToken;
use serde::{Deserialize, Serialize};

/// Observer lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    #[default]
    Stopped,
    Running,
}

/// Event fanned out by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum HealthEvent {
    SamplesCreated(Vec<DomainRecord>),
    /// Record ids removed from the platform store.
    ObjectsRemoved(Vec<String>),
    QueryStatusChanged(QueryStatus),
}

impl HealthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SamplesCreated(_) => "samples_created",
            Self::ObjectsRemoved(_) => "objects_removed",
            Self::QueryStatusChanged(_) => "query_status_changed",
        }
    }
}

/// One event plus the token needed to commit it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub event: HealthEvent,
    pub transaction: Option<TransactionToken>,
}
