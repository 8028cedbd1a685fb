//! Bounded local mirror of recent activity.
//!
//! # Invariants
//! - A record id appears at most once per category.
//! - Each category holds at most its configured number of records; the
//!   oldest insertion is evicted first.

use crate::config::ActivityStateConfig;
use crate::model::record::{DomainRecord, Steps, Workout};
use crate::model::summary::ActivitySummary;
use crate::sync::event::QueryStatus;
use std::collections::VecDeque;

/// Application-side activity state fed by the sync orchestrator.
#[derive(Debug, Default)]
pub struct ActivityState {
    config: ActivityStateConfig,
    workouts: VecDeque<Workout>,
    steps: VecDeque<Steps>,
    summary: Option<ActivitySummary>,
    service_status: QueryStatus,
}

impl ActivityState {
    pub fn new(config: ActivityStateConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Appends unseen workouts; returns how many were added.
    pub fn push_workouts(&mut self, workouts: impl IntoIterator<Item = Workout>) -> usize {
        push_bounded(
            &mut self.workouts,
            workouts,
            self.config.workouts_to_keep,
            |workout| workout.header.id.as_str(),
        )
    }

    /// Appends unseen step samples; returns how many were added.
    pub fn push_steps(&mut self, steps: impl IntoIterator<Item = Steps>) -> usize {
        push_bounded(
            &mut self.steps,
            steps,
            self.config.steps_to_keep,
            |sample| sample.header.id.as_str(),
        )
    }

    /// Drops records whose id is in `ids`; returns how many were removed.
    pub fn remove(&mut self, ids: &[String]) -> usize {
        let before = self.workouts.len() + self.steps.len();
        self.workouts
            .retain(|workout| !ids.contains(&workout.header.id));
        self.steps.retain(|sample| !ids.contains(&sample.header.id));
        before - (self.workouts.len() + self.steps.len())
    }

    pub fn update_summary(&mut self, summary: Option<ActivitySummary>) {
        self.summary = summary;
    }

    pub fn set_service_status(&mut self, status: QueryStatus) {
        self.service_status = status;
    }

    /// Forgets records and summary; service status is kept.
    pub fn clear(&mut self) {
        self.workouts.clear();
        self.steps.clear();
        self.summary = None;
    }

    pub fn workouts(&self) -> impl Iterator<Item = &Workout> {
        self.workouts.iter()
    }

    pub fn steps(&self) -> impl Iterator<Item = &Steps> {
        self.steps.iter()
    }

    /// Workouts followed by steps, each in insertion order.
    pub fn records(&self) -> Vec<DomainRecord> {
        self.workouts
            .iter()
            .cloned()
            .map(DomainRecord::Workout)
            .chain(self.steps.iter().cloned().map(DomainRecord::Steps))
            .collect()
    }

    pub fn summary(&self) -> Option<&ActivitySummary> {
        self.summary.as_ref()
    }

    pub fn service_status(&self) -> QueryStatus {
        self.service_status
    }

    pub fn is_running(&self) -> bool {
        self.service_status == QueryStatus::Running
    }
}

fn push_bounded<T>(
    target: &mut VecDeque<T>,
    incoming: impl IntoIterator<Item = T>,
    capacity: usize,
    id_of: impl Fn(&T) -> &str,
) -> usize {
    let mut added = 0;
    for item in incoming {
        if target.iter().any(|existing| id_of(existing) == id_of(&item)) {
            continue;
        }
        target.push_back(item);
        added += 1;
        if target.len() > capacity {
            target.pop_front();
        }
    }
    added
}
