//! Persistence contracts and their implementations.
//!
//! # Responsibility
//! - Define the string key-value contract the sync subsystem persists through.
//! - Keep SQL details out of the sync layer.
//!
//! # Invariants
//! - Writes overwrite; there is no versioning or transaction surface.

pub mod kv_store;
