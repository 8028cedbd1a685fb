//! Core of the fitness sync bridge.
//! Anchored, incremental health-data sync plus the app-side state it feeds.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod platform;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ActivityStateConfig, ConfigError, ConnectorConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{DomainRecord, RecordCategory, SampleHeader, Steps, Workout};
pub use model::summary::ActivitySummary;
pub use platform::{
    AnchoredFetchRequest, BackgroundFrequency, CompletionHandler, FetchBatch, HealthPlatform,
    ObserverRequest, PlatformSample, QueryDescriptor, RecordType,
};
pub use repo::kv_store::{
    KeyValueStore, KvError, KvResult, MemoryKeyValueStore, SqliteKeyValueStore,
};
pub use service::orchestrator::{Identity, Session, SyncOrchestrator, SyncReport};
pub use sync::anchor::{Anchor, AnchorError, TransactionToken};
pub use sync::connector::HealthConnector;
pub use sync::error::{HealthError, HealthResult};
pub use sync::event::{Delivery, HealthEvent, QueryStatus};
pub use sync::router::{EventInbox, EventListener};

/// Liveness probe for the FFI bridge.
pub fn ping() -> &'static str {
    "pong"
}

/// Version of this core crate.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
