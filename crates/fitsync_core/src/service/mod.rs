//! Consumer-side use cases built on the sync subsystem.
//!
//! # Responsibility
//! - Mirror routed records into bounded local state.
//! - Forward uploads and commit transactions once absorbed.
//! - Project state into feed rows for the UI.

pub mod activity_state;
pub mod feed;
pub mod orchestrator;
pub mod upload;
