//! Tunables for the connector and the local activity mirror.
//!
//! # Invariants
//! - `validate()` must pass before a config is handed to a connector.
//! - Defaults reproduce the shipped app behavior: 7-day lookback, immediate
//!   background delivery, 30 records of each category kept locally.

use crate::platform::BackgroundFrequency;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_HISTORY_KEY: &str = "hk-history-anchor";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const MAX_LOOKBACK_DAYS: u32 = 365;
pub const DEFAULT_RECORDS_TO_KEEP: usize = 30;

/// Connector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Records that started earlier than this many days ago are never fetched.
    pub lookback_days: u32,
    /// Key under which the committed anchor is persisted.
    pub history_key: String,
    pub background_frequency: BackgroundFrequency,
    /// Drop fetch results that belong to a stopped subscription.
    pub strict_cancellation: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            background_frequency: BackgroundFrequency::Immediate,
            strict_cancellation: true,
        }
    }
}

impl ConnectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_days == 0 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::LookbackOutOfRange(self.lookback_days));
        }
        if self.history_key.trim().is_empty() {
            return Err(ConfigError::EmptyHistoryKey);
        }
        Ok(())
    }
}

/// Bounds for the locally mirrored history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityStateConfig {
    pub workouts_to_keep: usize,
    pub steps_to_keep: usize,
}

impl Default for ActivityStateConfig {
    fn default() -> Self {
        Self {
            workouts_to_keep: DEFAULT_RECORDS_TO_KEEP,
            steps_to_keep: DEFAULT_RECORDS_TO_KEEP,
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    LookbackOutOfRange(u32),
    EmptyHistoryKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LookbackOutOfRange(days) => write!(
                f,
                "lookback_days must be within 1..={MAX_LOOKBACK_DAYS}, got {days}"
            ),
            Self::EmptyHistoryKey => write!(f, "history_key cannot be blank"),
        }
    }
}

impl Error for ConfigError {}
