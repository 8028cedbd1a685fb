//! Activity domain model.
//!
//! # Responsibility
//! - Define normalized workout/steps records and daily summaries.
//! - Keep platform sample subtypes out of downstream code.
//!
//! # Invariants
//! - Every record is identified by a stable platform-derived id.

pub mod record;
pub mod summary;
pub mod workout_activity;
