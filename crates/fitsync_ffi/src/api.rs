//! FFI use-case API for the mobile shell.
//!
//! # Responsibility
//! - Expose the anchored-sync lifecycle to Dart via FRB.
//! - Own the single process-wide connector and the sync orchestrator that
//!   consumes its events, uploads through the host and commits.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call serializes on one runtime lock, which stands in for the
//!   platform's serialized callback context.
//! - Platform and upload work leaves through `health_take_platform_commands`;
//!   results re-enter through `health_on_*` and `health_report_upload` calls.

use crate::host_platform::{
    parse_day, to_fetch_batch, CommandQueuePlatform, HostFetchBatch, PlatformCommand,
};
use crate::host_uploads::{HostSession, HostUploadSink, AWAITING_HOST_STATUS};
use fitsync_core::db::open_db;
use fitsync_core::model::summary::ActivitySummary;
use fitsync_core::service::feed::{activity_calendar, describe_summary_goals};
use fitsync_core::service::upload::UploadError;
use fitsync_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ActivityStateConfig, ConnectorConfig, HealthConnector, Identity, QueryStatus,
    SqliteKeyValueStore, SyncOrchestrator, SyncReport,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Mutex;

const DB_FILE_NAME: &str = "fitsync.sqlite3";
const DB_PATH_ENV: &str = "FITSYNC_DB_PATH";

static DB_PATH: OnceCell<PathBuf> = OnceCell::new();
static RUNTIME: Mutex<Option<SyncRuntime>> = Mutex::new(None);

struct SyncRuntime {
    connector: HealthConnector<CommandQueuePlatform, SqliteKeyValueStore>,
    orchestrator: SyncOrchestrator<HostUploadSink, HostSession>,
}

/// Liveness probe for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for the rolling log files.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`; reconfiguration is rejected.
/// - Returns an empty string on success, otherwise the error message.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Outcome envelope for lifecycle and callback calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthActionResponse {
    pub ok: bool,
    /// Human-readable diagnostics for the UI.
    pub message: String,
}

impl HealthActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    fn from_result(result: Result<String, String>) -> Self {
        match result {
            Ok(message) => Self::success(message),
            Err(message) => Self::failure(message),
        }
    }
}

/// Outcome of one orchestrator pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPassResponse {
    pub ok: bool,
    /// Uploads are with the host; run another pass after reporting them.
    pub awaiting_uploads: bool,
    pub processed: usize,
    pub committed: usize,
    pub records_added: usize,
    pub records_removed: usize,
    /// Labels of workouts seen in this pass, for a user notification.
    pub new_workouts: Vec<String>,
    /// Events still queued after the pass.
    pub pending: usize,
    pub message: String,
}

impl SyncPassResponse {
    fn from_report(report: SyncReport, pending: usize) -> Self {
        Self {
            ok: true,
            awaiting_uploads: false,
            processed: report.processed,
            committed: report.committed,
            records_added: report.records_added,
            records_removed: report.records_removed,
            new_workouts: report.new_workouts,
            pending,
            message: format!("{} transaction(s) committed.", report.committed),
        }
    }

    fn stalled(awaiting_uploads: bool, pending: usize, message: String) -> Self {
        Self {
            ok: awaiting_uploads,
            awaiting_uploads,
            processed: 0,
            committed: 0,
            records_added: 0,
            records_removed: 0,
            new_workouts: Vec::new(),
            pending,
            message,
        }
    }
}

/// One summary metric keyed like `activeEnergyBurned`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetric {
    pub key: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResponse {
    pub ok: bool,
    /// Empty when no summary is recorded for today.
    pub metrics: Vec<SummaryMetric>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFeedItem {
    pub record_id: String,
    pub display: Option<String>,
    pub start_epoch_ms: i64,
    pub duration: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFeedDay {
    pub title: String,
    pub items: Vec<ActivityFeedItem>,
}

/// Tells the core whether the device has a health store at all.
///
/// Opens the sync runtime on first use.
#[flutter_rust_bridge::frb(sync)]
pub fn health_configure(available: bool) -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime.connector.platform_mut().set_available(available);
        format!("Health data available: {available}.")
    }))
}

/// Starts the change subscription; no-op when already running.
#[flutter_rust_bridge::frb(sync)]
pub fn health_start() -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime.connector.start();
        status_message(runtime.connector.status())
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn health_stop() -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime.connector.stop();
        status_message(runtime.connector.status())
    }))
}

/// Forgets the persisted anchor and local records, then syncs from scratch.
///
/// Records inside the lookback window are delivered again.
#[flutter_rust_bridge::frb(sync)]
pub fn health_reset_history() -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime.orchestrator.reset_history(&mut runtime.connector);
        "History reset.".to_string()
    }))
}

/// Sets or clears the signed-in user used for uploads.
///
/// `patient_id` enables the daily summary observation upload.
#[flutter_rust_bridge::frb(sync)]
pub fn health_set_session(
    jwt: Option<String>,
    patient_id: Option<String>,
) -> HealthActionResponse {
    let identity = jwt
        .filter(|jwt| !jwt.trim().is_empty())
        .map(|jwt| Identity { jwt, patient_id });
    let signed_in = identity.is_some();
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime.orchestrator.session().set_identity(identity);
        format!("Signed in: {signed_in}.")
    }))
}

/// Turns the workout datastream upload on or off.
#[flutter_rust_bridge::frb(sync)]
pub fn health_configure_uploads(datastream_enabled: bool) -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime
            .orchestrator
            .uploads()
            .set_datastream_enabled(datastream_enabled);
        format!("Datastream uploads enabled: {datastream_enabled}.")
    }))
}

/// Native observer callback.
///
/// `callback_id` names the host completion handler; the core answers with a
/// `CompleteNotification` command once the notification is acknowledged.
#[flutter_rust_bridge::frb(sync)]
pub fn health_on_change_notification(
    generation: u64,
    callback_id: u64,
    error: Option<String>,
) -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        let completion = runtime.connector.platform().completion_for(callback_id);
        runtime
            .connector
            .on_change_notification(generation, completion, error);
        "Notification accepted.".to_string()
    }))
}

/// Native anchored-fetch callback; `error` wins over `batch` when present.
#[flutter_rust_bridge::frb(sync)]
pub fn health_on_fetch_result(
    generation: u64,
    batch: HostFetchBatch,
    error: Option<String>,
) -> HealthActionResponse {
    HealthActionResponse::from_result(with_runtime(|runtime| {
        let (result, skipped) = match error {
            Some(message) => (Err(message), 0),
            None => {
                let converted = to_fetch_batch(batch);
                (Ok(converted.batch), converted.skipped)
            }
        };
        runtime.connector.on_fetch_result(generation, result);
        let pending = runtime.orchestrator.pending_count();
        if skipped > 0 {
            format!("{pending} event(s) pending, {skipped} malformed sample(s) skipped.")
        } else {
            format!("{pending} event(s) pending.")
        }
    }))
}

/// Drains platform commands issued since the previous call.
#[flutter_rust_bridge::frb(sync)]
pub fn health_take_platform_commands() -> Vec<PlatformCommand> {
    with_runtime(|runtime| runtime.connector.platform().take_commands()).unwrap_or_else(|err| {
        error!("event=platform_commands module=ffi status=error error={err}");
        Vec::new()
    })
}

/// Mirrors, uploads and commits every queued event.
///
/// # FFI contract
/// - `awaiting_uploads` means upload commands were queued; report them with
///   `health_report_upload` and call again. Nothing after them is committed.
#[flutter_rust_bridge::frb(sync)]
pub fn health_process_pending() -> SyncPassResponse {
    let result = with_runtime(|runtime| {
        let outcome = runtime.orchestrator.process_pending(&mut runtime.connector);
        (outcome, runtime.orchestrator.pending_count())
    });
    match result {
        Ok((Ok(report), pending)) => SyncPassResponse::from_report(report, pending),
        Ok((Err(UploadError::RequestFailed { status, .. }), pending))
            if status == AWAITING_HOST_STATUS =>
        {
            SyncPassResponse::stalled(true, pending, "Waiting for host uploads.".to_string())
        }
        Ok((Err(err), pending)) => SyncPassResponse::stalled(false, pending, err.to_string()),
        Err(message) => SyncPassResponse::stalled(false, 0, message),
    }
}

/// Host answer to an upload command; `status` is the HTTP status code.
///
/// Pass `0` when the request never got a response; it is retried.
#[flutter_rust_bridge::frb(sync)]
pub fn health_report_upload(
    request_key: String,
    status: u16,
    message: String,
) -> HealthActionResponse {
    HealthActionResponse::from_result(
        with_runtime(|runtime| {
            runtime
                .orchestrator
                .uploads()
                .record_outcome(&request_key, status, message)
                .map(|()| "Upload outcome recorded.".to_string())
        })
        .and_then(|result| result),
    )
}

/// Host answer to a `RefreshActivitySummary` command.
#[flutter_rust_bridge::frb(sync)]
pub fn health_push_activity_summary(
    day: String,
    metrics: Vec<SummaryMetric>,
) -> HealthActionResponse {
    let day = match parse_day(&day) {
        Ok(day) => day,
        Err(err) => return HealthActionResponse::failure(err.to_string()),
    };
    let mut summary = ActivitySummary::default();
    for metric in &metrics {
        if !summary.set_metric(&metric.key, metric.value) {
            return HealthActionResponse::failure(format!("unknown summary metric `{}`", metric.key));
        }
    }
    HealthActionResponse::from_result(with_runtime(|runtime| {
        runtime.connector.platform_mut().store_summary(day, summary);
        "Summary stored.".to_string()
    }))
}

/// Today's activity summary as a flat metric list.
#[flutter_rust_bridge::frb(sync)]
pub fn health_today_summary() -> SummaryResponse {
    let result = with_runtime(|runtime| runtime.connector.today_summary());
    match result {
        Ok(Ok(Some(summary))) => SummaryResponse {
            ok: true,
            metrics: to_metrics(&summary),
            message: "Summary loaded.".to_string(),
        },
        Ok(Ok(None)) => SummaryResponse {
            ok: true,
            metrics: Vec::new(),
            message: "No summary recorded today.".to_string(),
        },
        Ok(Err(err)) => SummaryResponse {
            ok: false,
            metrics: Vec::new(),
            message: err.to_string(),
        },
        Err(message) => SummaryResponse {
            ok: false,
            metrics: Vec::new(),
            message,
        },
    }
}

/// Section header describing today's goals.
#[flutter_rust_bridge::frb(sync)]
pub fn health_summary_goals() -> String {
    let summary = match with_runtime(|runtime| runtime.connector.today_summary()) {
        Ok(Ok(summary)) => summary,
        _ => None,
    };
    describe_summary_goals(summary.as_ref())
}

/// Locally mirrored records grouped into day sections, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn health_activity_feed() -> Vec<ActivityFeedDay> {
    let records = match with_runtime(|runtime| runtime.orchestrator.state().records()) {
        Ok(records) => records,
        Err(err) => {
            error!("event=activity_feed module=ffi status=error error={err}");
            return Vec::new();
        }
    };
    activity_calendar(&records)
        .into_iter()
        .map(|day| ActivityFeedDay {
            title: day.title,
            items: day
                .items
                .into_iter()
                .map(|item| ActivityFeedItem {
                    record_id: item.record_id,
                    display: item.display,
                    start_epoch_ms: item.start_epoch_ms,
                    duration: item.duration,
                    count: item.count,
                })
                .collect(),
        })
        .collect()
}

fn with_runtime<T>(f: impl FnOnce(&mut SyncRuntime) -> T) -> Result<T, String> {
    let mut guard = RUNTIME
        .lock()
        .map_err(|_| "sync runtime lock poisoned".to_string())?;
    if guard.is_none() {
        *guard = Some(open_runtime()?);
    }
    match guard.as_mut() {
        Some(runtime) => Ok(f(runtime)),
        None => Err("sync runtime unavailable".to_string()),
    }
}

fn open_runtime() -> Result<SyncRuntime, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("sync DB open failed: {err}"))?;
    let mut connector = HealthConnector::new(
        CommandQueuePlatform::new(false),
        SqliteKeyValueStore::new(conn),
        ConnectorConfig::default(),
    )
    .map_err(|err| format!("sync config invalid: {err}"))?;

    let outbox = connector.platform().outbox();
    let mut orchestrator = SyncOrchestrator::new(
        HostUploadSink::new(outbox.clone()),
        HostSession::new(outbox),
        ActivityStateConfig::default(),
    );
    orchestrator.attach(&mut connector);
    info!("event=runtime_open module=ffi status=ok");
    Ok(SyncRuntime {
        connector,
        orchestrator,
    })
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn status_message(status: QueryStatus) -> String {
    match status {
        QueryStatus::Running => "Sync running.".to_string(),
        QueryStatus::Stopped => "Sync stopped.".to_string(),
    }
}

fn to_metrics(summary: &ActivitySummary) -> Vec<SummaryMetric> {
    summary
        .metrics()
        .into_iter()
        .map(|(key, value)| SummaryMetric {
            key: key.to_string(),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, health_activity_feed, health_configure, health_on_change_notification,
        health_on_fetch_result, health_process_pending, health_push_activity_summary,
        health_report_upload, health_reset_history, health_set_session, health_start,
        health_summary_goals, health_take_platform_commands, health_today_summary, init_logging,
        ping, SummaryMetric,
    };
    use crate::host_platform::{
        HostFetchBatch, HostQuantitySample, HostWorkoutSample, PlatformCommand,
    };
    use chrono::Local;
    use uuid::Uuid;

    #[test]
    fn ping_answers_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/fitsync-logs".to_string()).is_empty());
    }

    #[test]
    fn push_summary_rejects_unknown_metrics_and_days() {
        let bad_key = health_push_activity_summary(
            "2024-06-03".to_string(),
            vec![SummaryMetric {
                key: "heartRate".to_string(),
                value: Some(60.0),
            }],
        );
        assert!(!bad_key.ok);
        let bad_day = health_push_activity_summary("yesterday".to_string(), Vec::new());
        assert!(!bad_day.ok);
    }

    fn upload_key(commands: &[PlatformCommand]) -> String {
        commands
            .iter()
            .find_map(|command| match command {
                PlatformCommand::UploadWorkoutRecords { request_key, .. }
                | PlatformCommand::PostSummaryObservation { request_key, .. } => {
                    Some(request_key.clone())
                }
                _ => None,
            })
            .expect("an upload command was queued")
    }

    // Only this test drives the shared runtime.
    #[test]
    fn full_sync_cycle_through_the_runtime() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::env::set_var(super::DB_PATH_ENV, dir.path().join("ffi.sqlite3"));

        assert!(health_configure(true).ok);
        assert!(health_set_session(Some("jwt-1".to_string()), Some("p-1".to_string())).ok);
        let started = health_start();
        assert!(started.ok, "{}", started.message);
        let commands = health_take_platform_commands();
        assert!(commands
            .iter()
            .any(|command| matches!(command, PlatformCommand::StartObserver { generation: 1, .. })));

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let pushed = health_push_activity_summary(
            today,
            vec![SummaryMetric {
                key: "activeEnergyBurnedGoal".to_string(),
                value: Some(500.0),
            }],
        );
        assert!(pushed.ok, "{}", pushed.message);

        assert!(health_on_change_notification(1, 77, None).ok);
        let workout = Uuid::new_v4();
        let batch = HostFetchBatch {
            workouts: vec![HostWorkoutSample {
                uuid: workout.to_string(),
                start_epoch_ms: 1_717_400_000_000,
                end_epoch_ms: 1_717_401_800_000,
                activity_type: 37,
                duration_secs: 1800.0,
                active_energy_kcal: Some(300.0),
            }],
            quantities: vec![HostQuantitySample {
                uuid: "broken".to_string(),
                start_epoch_ms: 1_717_400_000_000,
                end_epoch_ms: 1_717_400_600_000,
                quantity_type: "step_count".to_string(),
                value: 640.0,
            }],
            anchor: Some(vec![1, 2, 3]),
            ..HostFetchBatch::default()
        };
        let fetched = health_on_fetch_result(1, batch, None);
        assert!(fetched.ok);
        assert_eq!(
            fetched.message,
            "2 event(s) pending, 1 malformed sample(s) skipped."
        );
        health_take_platform_commands();

        let first = health_process_pending();
        assert!(first.ok && first.awaiting_uploads, "{}", first.message);
        assert_eq!(first.pending, 1);
        let commands = health_take_platform_commands();
        let datastream = upload_key(&commands);
        assert!(commands.iter().any(|command| matches!(
            command,
            PlatformCommand::UploadWorkoutRecords { bearer: Some(bearer), .. } if bearer == "jwt-1"
        )));
        assert!(!commands
            .iter()
            .any(|command| matches!(command, PlatformCommand::CompleteNotification { .. })));
        assert!(health_report_upload(datastream.clone(), 200, String::new()).ok);
        assert!(!health_report_upload(datastream, 200, String::new()).ok);

        let second = health_process_pending();
        assert!(second.awaiting_uploads, "{}", second.message);
        let commands = health_take_platform_commands();
        assert!(commands.iter().any(|command| matches!(
            command,
            PlatformCommand::PostSummaryObservation { patient_id, .. } if patient_id == "p-1"
        )));
        assert!(health_report_upload(upload_key(&commands), 201, String::new()).ok);

        let third = health_process_pending();
        assert!(third.ok && !third.awaiting_uploads, "{}", third.message);
        assert_eq!(third.committed, 1);
        assert_eq!(third.pending, 0);
        assert_eq!(third.new_workouts, vec!["Running".to_string()]);
        assert!(health_take_platform_commands()
            .contains(&PlatformCommand::CompleteNotification { callback_id: 77 }));

        let feed = health_activity_feed();
        assert_eq!(feed.len(), 1);
        assert_eq!(
            feed[0].items[0].record_id,
            workout.hyphenated().to_string().to_uppercase()
        );

        let summary = health_today_summary();
        assert!(summary.ok);
        assert!(summary.metrics.contains(&SummaryMetric {
            key: "activeEnergyBurnedGoal".to_string(),
            value: Some(500.0),
        }));
        assert_eq!(
            health_summary_goals(),
            "Daily Goals: Energy - 500, Exercise - N/A"
        );

        assert!(health_reset_history().ok);
        let commands = health_take_platform_commands();
        assert!(commands.contains(&PlatformCommand::StopObserver { generation: 1 }));
        assert!(commands
            .iter()
            .any(|command| matches!(command, PlatformCommand::StartObserver { generation: 2, .. })));
        assert!(health_activity_feed().is_empty());
    }
}
