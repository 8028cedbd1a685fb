//! Anchored incremental sync and event distribution.
//!
//! # Responsibility
//! - Track platform change history through a persisted anchor.
//! - Route created/removed records to listeners, buffering while none attach.
//! - Acknowledge platform notifications once consumers commit.
//!
//! # Invariants
//! - The persisted anchor always comes from a committed transaction.

pub mod anchor;
pub mod anchor_store;
pub mod connector;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod observer;
pub mod router;
