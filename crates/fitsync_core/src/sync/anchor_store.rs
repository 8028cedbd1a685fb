//! Durable checkpoint of the last committed anchor.
//!
//! # Invariants
//! - Failures never escape: writes are logged, unreadable entries restore as
//!   `None` and trigger a full resync of the lookback window.
//! - Exactly one key is used per store.

use crate::repo::kv_store::KeyValueStore;
use crate::sync::anchor::Anchor;
use crate::sync::error::HealthResult;
use log::{info, warn};

/// Anchor persistence over a [`KeyValueStore`].
pub struct AnchorStore<S: KeyValueStore> {
    kv: S,
    key: String,
}

impl<S: KeyValueStore> AnchorStore<S> {
    pub fn new(kv: S, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persists `anchor`, overwriting the previous checkpoint.
    pub fn checkpoint(&self, anchor: &Anchor) {
        let token = match anchor.serialize() {
            Ok(token) => token,
            Err(err) => {
                warn!("event=anchor_checkpoint module=sync status=error stage=encode error={err}");
                return;
            }
        };

        match self.write_token(&token) {
            Ok(()) => info!(
                "event=anchor_checkpoint module=sync status=ok anchor_bytes={}",
                anchor.as_bytes().len()
            ),
            Err(err) => {
                warn!("event=anchor_checkpoint module=sync status=error stage=write error={err}")
            }
        }
    }

    /// Returns the last checkpoint, or `None` when absent or unreadable.
    pub fn restore(&self) -> Option<Anchor> {
        let token = match self.read_token() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(err) => {
                warn!("event=anchor_restore module=sync status=error stage=read error={err}");
                return None;
            }
        };

        match Anchor::deserialize(&token) {
            Ok(anchor) => Some(anchor),
            Err(err) => {
                warn!("event=anchor_restore module=sync status=error stage=decode error={err}");
                None
            }
        }
    }

    /// Deletes the checkpoint unconditionally.
    pub fn reset(&self) {
        match self.delete_token() {
            Ok(()) => info!("event=anchor_reset module=sync status=ok"),
            Err(err) => warn!("event=anchor_reset module=sync status=error error={err}"),
        }
    }

    fn read_token(&self) -> HealthResult<Option<String>> {
        Ok(self.kv.get(&self.key)?)
    }

    fn write_token(&self, token: &str) -> HealthResult<()> {
        Ok(self.kv.set(&self.key, token)?)
    }

    fn delete_token(&self) -> HealthResult<()> {
        Ok(self.kv.delete(&self.key)?)
    }
}
