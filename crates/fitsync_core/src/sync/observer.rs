//! Change-subscription lifecycle state.
//!
//! # Invariants
//! - `Stopped -> Running` only through [`ChangeObserver::begin`], which mints
//!   a fresh generation; generations never repeat within a process.
//! - At most one platform completion handler is retained at a time.

use crate::platform::CompletionHandler;
use crate::sync::event::QueryStatus;
use log::warn;

/// Observer state machine plus the retained acknowledgement.
#[derive(Debug, Default)]
pub struct ChangeObserver {
    status: QueryStatus,
    generation: u64,
    completion: Option<CompletionHandler>,
}

impl ChangeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == QueryStatus::Running
    }

    /// Mints the generation for a subscription about to be registered.
    pub fn next_generation(&self) -> u64 {
        self.generation + 1
    }

    /// Records that the subscription for `generation` is live.
    pub fn begin(&mut self, generation: u64) {
        self.generation = generation;
        self.status = QueryStatus::Running;
    }

    /// Marks the observer stopped; returns the generation that was running.
    pub fn end(&mut self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        self.status = QueryStatus::Stopped;
        Some(self.generation)
    }

    /// Whether results tagged with `generation` belong to the live subscription.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }

    /// Keeps `handler` until the next commit.
    ///
    /// A handler that was never acknowledged is dropped, and the platform
    /// will redeliver its notification.
    pub fn retain_completion(&mut self, handler: CompletionHandler) {
        if self.completion.replace(handler).is_some() {
            warn!("event=observer_completion module=sync status=replaced reason=uncommitted");
        }
    }

    pub fn take_completion(&mut self) -> Option<CompletionHandler> {
        self.completion.take()
    }

    pub fn has_pending_completion(&self) -> bool {
        self.completion.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeObserver;
    use crate::platform::CompletionHandler;
    use crate::sync::event::QueryStatus;

    #[test]
    fn generations_advance_and_stale_ones_are_not_current() {
        let mut observer = ChangeObserver::new();
        assert_eq!(observer.status(), QueryStatus::Stopped);

        let first = observer.next_generation();
        observer.begin(first);
        assert!(observer.is_current(first));
        assert_eq!(observer.end(), Some(first));
        assert_eq!(observer.end(), None);
        assert!(!observer.is_current(first));

        let second = observer.next_generation();
        observer.begin(second);
        assert!(second > first);
        assert!(!observer.is_current(first));
        assert!(observer.is_current(second));
    }

    #[test]
    fn completion_is_taken_once() {
        let mut observer = ChangeObserver::new();
        observer.retain_completion(CompletionHandler::new(|| {}));
        assert!(observer.has_pending_completion());
        assert!(observer.take_completion().is_some());
        assert!(observer.take_completion().is_none());
    }
}
