//! Persistent application settings

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::Label;

/// Consecutive completed work sessions, used to decide when a long break is due
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LongBreakData {
    pub streak: u32,
    /// Monotonic time of the last qualifying work completion; 0 if there is none
    pub last_work_end_time: i64,
}

impl LongBreakData {
    pub fn new(streak: u32, last_work_end_time: i64) -> Self {
        Self {
            streak,
            last_work_end_time,
        }
    }

    /// Position of the streak inside the current long-break cycle
    pub fn streak_in_use(&self, sessions_before_long_break: u32) -> u32 {
        self.streak % sessions_before_long_break.max(1)
    }
}

/// Checkpoint of the break time earned by count-up work sessions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakBudgetData {
    pub break_budget_ms: i64,
    /// Monotonic time at which `break_budget_ms` was captured
    pub break_budget_start: i64,
}

impl BreakBudgetData {
    pub fn new(break_budget_ms: i64, break_budget_start: i64) -> Self {
        Self {
            break_budget_ms,
            break_budget_start,
        }
    }

    /// Milliseconds elapsed since the checkpoint, never negative
    pub fn elapsed_since_start(&self, elapsed_realtime: i64) -> i64 {
        (elapsed_realtime - self.break_budget_start).max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    pub label_name: String,
    pub auto_start_work: bool,
    pub auto_start_break: bool,
    pub long_break_data: LongBreakData,
    pub break_budget_data: BreakBudgetData,
    pub first_day_of_week: Weekday,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            label_name: Label::DEFAULT_LABEL_NAME.to_string(),
            auto_start_work: false,
            auto_start_break: false,
            long_break_data: LongBreakData::default(),
            break_budget_data: BreakBudgetData::default(),
            first_day_of_week: Weekday::Mon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_in_use() {
        assert_eq!(LongBreakData::new(0, 0).streak_in_use(4), 0);
        assert_eq!(LongBreakData::new(3, 0).streak_in_use(4), 3);
        assert_eq!(LongBreakData::new(8, 0).streak_in_use(4), 0);
        assert_eq!(LongBreakData::new(5, 0).streak_in_use(0), 0);
    }

    #[test]
    fn test_break_budget_elapsed_is_clamped() {
        let data = BreakBudgetData::new(60_000, 10_000);
        assert_eq!(data.elapsed_since_start(15_000), 5_000);
        assert_eq!(data.elapsed_since_start(5_000), 0);
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"auto_start_break":true}"#).unwrap();
        assert!(settings.auto_start_break);
        assert!(!settings.auto_start_work);
        assert_eq!(settings.label_name, Label::DEFAULT_LABEL_NAME);
        assert_eq!(settings.first_day_of_week, Weekday::Mon);
    }
}
