//! Daily activity summary.
//!
//! Summaries are not change-tracked: "today" is always refetched in full.

use serde::{Deserialize, Serialize};

/// Metric keys in the order they are exposed to callers.
pub const SUMMARY_METRIC_KEYS: [&str; 8] = [
    "activeEnergyBurned",
    "activeEnergyBurnedGoal",
    "moveTime",
    "moveTimeGoal",
    "exerciseTime",
    "exerciseTimeGoal",
    "standHours",
    "standHoursGoal",
];

/// Goal-tracking metrics for one calendar day.
///
/// Energy in kilocalories, times in seconds, stand hours as a count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub active_energy_burned: Option<f64>,
    pub active_energy_burned_goal: Option<f64>,
    pub move_time: Option<f64>,
    pub move_time_goal: Option<f64>,
    pub exercise_time: Option<f64>,
    pub exercise_time_goal: Option<f64>,
    pub stand_hours: Option<f64>,
    pub stand_hours_goal: Option<f64>,
}

impl ActivitySummary {
    /// Flat `key -> value-or-absent` view, keyed by [`SUMMARY_METRIC_KEYS`].
    pub fn metrics(&self) -> Vec<(&'static str, Option<f64>)> {
        let values = [
            self.active_energy_burned,
            self.active_energy_burned_goal,
            self.move_time,
            self.move_time_goal,
            self.exercise_time,
            self.exercise_time_goal,
            self.stand_hours,
            self.stand_hours_goal,
        ];
        SUMMARY_METRIC_KEYS.into_iter().zip(values).collect()
    }

    /// Looks up one metric by its exposed key.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics()
            .into_iter()
            .find(|(name, _)| *name == key)
            .and_then(|(_, value)| value)
    }

    /// Sets one metric by its exposed key; returns `false` for unknown keys.
    pub fn set_metric(&mut self, key: &str, value: Option<f64>) -> bool {
        let slot = match key {
            "activeEnergyBurned" => &mut self.active_energy_burned,
            "activeEnergyBurnedGoal" => &mut self.active_energy_burned_goal,
            "moveTime" => &mut self.move_time,
            "moveTimeGoal" => &mut self.move_time_goal,
            "exerciseTime" => &mut self.exercise_time,
            "exerciseTimeGoal" => &mut self.exercise_time_goal,
            "standHours" => &mut self.stand_hours,
            "standHoursGoal" => &mut self.stand_hours_goal,
            _ => return false,
        };
        *slot = value;
        true
    }
}
