//! Event fan-out with catch-up buffering.
//!
//! # Responsibility
//! - Deliver routed events to every attached listener in registration order.
//! - Hold events while nobody listens and replay them to the first listener.
//!
//! # Invariants
//! - Events are buffered only while the listener set is empty.
//! - The buffer is drained by the attach that ends the empty period, so a
//!   buffered event reaches each listener at most once.
//! - Listener identity is pointer identity of the shared handle.

use crate::sync::anchor::Anchor;
use crate::sync::event::{Delivery, HealthEvent};
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Consumer of routed events.
///
/// Called from the connector's callback context; implementations should hand
/// the delivery off rather than call back into the connector.
pub trait EventListener: Send + Sync {
    fn notify(&self, delivery: &Delivery);
}

/// Listener registry plus catch-up buffer.
#[derive(Default)]
pub struct EventRouter {
    listeners: Vec<Arc<dyn EventListener>>,
    pending: VecDeque<Delivery>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` and replays everything buffered so far, oldest first.
    pub fn attach(&mut self, listener: Arc<dyn EventListener>) {
        let replayed = self.pending.len();
        for delivery in self.pending.drain(..) {
            listener.notify(&delivery);
        }
        self.listeners.push(listener);
        debug!(
            "event=listener_attach module=sync status=ok listeners={} replayed={replayed}",
            self.listeners.len()
        );
    }

    /// Removes `listener` by identity; unknown listeners are ignored.
    pub fn detach(&mut self, listener: &Arc<dyn EventListener>) {
        let before = self.listeners.len();
        self.listeners
            .retain(|attached| !std::ptr::addr_eq(Arc::as_ptr(attached), Arc::as_ptr(listener)));
        debug!(
            "event=listener_detach module=sync status=ok removed={} listeners={}",
            before - self.listeners.len(),
            self.listeners.len()
        );
    }

    /// Routes `event`, tagging it with the token for `anchor`.
    ///
    /// An anchor that cannot be encoded yields a `None` token.
    pub fn distribute(&mut self, event: HealthEvent, anchor: Option<&Anchor>) {
        let transaction = anchor.and_then(|anchor| match anchor.serialize() {
            Ok(token) => Some(token),
            Err(err) => {
                warn!(
                    "event=distribute module=sync status=error kind={} error={err}",
                    event.name()
                );
                None
            }
        });
        let delivery = Delivery { event, transaction };

        if self.listeners.is_empty() {
            debug!(
                "event=distribute module=sync status=buffered kind={} buffered={}",
                delivery.event.name(),
                self.pending.len() + 1
            );
            self.pending.push_back(delivery);
            return;
        }

        for listener in &self.listeners {
            listener.notify(&delivery);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn buffered_count(&self) -> usize {
        self.pending.len()
    }
}

/// Listener that queues deliveries for later processing.
///
/// Lets a consumer drain events outside the connector's call stack and then
/// commit through the connector without re-entrancy.
#[derive(Debug, Default)]
pub struct EventInbox {
    queue: Mutex<VecDeque<Delivery>>,
}

impl EventInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued delivery, oldest first.
    pub fn drain(&self) -> Vec<Delivery> {
        match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    /// Puts deliveries back at the front, keeping their order.
    pub fn requeue_front(&self, deliveries: Vec<Delivery>) {
        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };
        for delivery in deliveries.into_iter().rev() {
            queue.push_front(delivery);
        }
    }

    pub fn len(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventListener for EventInbox {
    fn notify(&self, delivery: &Delivery) {
        match self.queue.lock() {
            Ok(mut queue) => queue.push_back(delivery.clone()),
            Err(poisoned) => poisoned.into_inner().push_back(delivery.clone()),
        }
    }
}
