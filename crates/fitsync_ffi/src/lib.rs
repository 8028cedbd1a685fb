//! Flutter-facing bridge over the fitness sync core.

pub mod api;
pub mod host_platform;
pub mod host_uploads;
