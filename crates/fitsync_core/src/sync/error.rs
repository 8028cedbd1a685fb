//! Error taxonomy for the health sync subsystem.
//!
//! Most of these are logged and swallowed at the connector boundary; only
//! `NotAvailable` reaches callers of the summary query.

use crate::repo::kv_store::KvError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HealthResult<T> = Result<T, HealthError>;

/// Health sync failure.
#[derive(Debug)]
pub enum HealthError {
    /// The device has no health data store.
    NotAvailable,
    /// An anchored fetch or observer notification reported an error.
    FetchFailed(String),
    /// Anchor persistence failed; the in-memory anchor stays authoritative.
    PersistenceFailed(KvError),
    /// Any other platform call failure.
    Platform(String),
}

impl Display for HealthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAvailable => write!(f, "health data is not available on this device"),
            Self::FetchFailed(message) => write!(f, "health query failed: {message}"),
            Self::PersistenceFailed(err) => write!(f, "anchor persistence failed: {err}"),
            Self::Platform(message) => write!(f, "health platform call failed: {message}"),
        }
    }
}

impl Error for HealthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PersistenceFailed(err) => Some(err),
            Self::NotAvailable | Self::FetchFailed(_) | Self::Platform(_) => None,
        }
    }
}

impl From<KvError> for HealthError {
    fn from(value: KvError) -> Self {
        Self::PersistenceFailed(value)
    }
}
