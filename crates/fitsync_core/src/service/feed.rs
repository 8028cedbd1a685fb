//! Activity feed projections for the UI layer.

use crate::model::record::DomainRecord;
use crate::model::summary::ActivitySummary;
use chrono::{DateTime, Local, TimeZone};

/// One feed row.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityItem {
    pub record_id: String,
    pub display: Option<String>,
    pub start_epoch_ms: i64,
    /// `"1h 5m"`-style length of the record's time range.
    pub duration: String,
    /// Step count, or whole minutes for workouts.
    pub count: f64,
}

/// Records sharing one start day.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDay {
    /// Day label such as `Mon 3 Jun`.
    pub title: String,
    pub items: Vec<ActivityItem>,
}

/// Groups records by local start day, in first-seen order.
pub fn activity_calendar(records: &[DomainRecord]) -> Vec<ActivityDay> {
    activity_calendar_in(records, &Local)
}

/// Same as [`activity_calendar`] for an explicit time zone.
///
/// Records whose timestamps do not parse are left out.
pub fn activity_calendar_in<Tz: TimeZone>(records: &[DomainRecord], tz: &Tz) -> Vec<ActivityDay>
where
    Tz::Offset: std::fmt::Display,
{
    let mut days: Vec<ActivityDay> = Vec::new();
    for record in records {
        let header = record.header();
        let (Ok(start), Ok(end)) = (
            DateTime::parse_from_rfc3339(&header.start_date),
            DateTime::parse_from_rfc3339(&header.end_date),
        ) else {
            continue;
        };
        let local_start = start.with_timezone(tz);
        let elapsed_minutes = (end - start).num_minutes();
        let count = match record {
            DomainRecord::Steps(steps) => steps.count,
            DomainRecord::Workout(_) => elapsed_minutes as f64,
        };

        let item = ActivityItem {
            record_id: header.id.clone(),
            display: header.display.clone(),
            start_epoch_ms: start.timestamp_millis(),
            duration: format_duration(elapsed_minutes),
            count,
        };
        let title = local_start.format("%a %-d %b").to_string();
        match days.iter_mut().find(|day| day.title == title) {
            Some(day) => day.items.push(item),
            None => days.push(ActivityDay {
                title,
                items: vec![item],
            }),
        }
    }
    days
}

/// Header line for the day sections.
pub fn describe_summary_goals(summary: Option<&ActivitySummary>) -> String {
    let energy = summary
        .and_then(|summary| summary.active_energy_burned_goal)
        .map_or_else(|| "N/A".to_string(), |goal| goal.round().to_string());
    let exercise = summary
        .and_then(|summary| summary.exercise_time_goal)
        .map_or_else(|| "N/A".to_string(), |goal| (goal / 60.0).round().to_string());
    format!("Daily Goals: Energy - {energy}, Exercise - {exercise}")
}

fn format_duration(total_minutes: i64) -> String {
    let total_minutes = total_minutes.max(0);
    let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
