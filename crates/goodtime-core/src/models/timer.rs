use serde::{Deserialize, Serialize};

use super::{BreakBudgetData, DomainLabel, LongBreakData, TimerProfile};

/// Added to work sessions to make up for tick granularity when rounding to minutes
pub const WIGGLE_ROOM_MILLIS: i64 = 900;

/// Count-up sessions are bounded by this many milliseconds (900 minutes)
pub const COUNT_UP_HARD_LIMIT: i64 = 900 * 60_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Reset,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerType {
    #[default]
    Work,
    Break,
    LongBreak,
}

/// Snapshot of the running timer.
///
/// All times are monotonic milliseconds. `time_at_pause` holds the remaining time
/// (countdown) or the elapsed active time (count-up) and is only set while paused.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainTimerData {
    pub is_ready: bool,
    pub label: DomainLabel,
    pub state: TimerState,
    pub timer_type: TimerType,
    pub start_time: i64,
    pub last_start_time: i64,
    /// Deadline of a countdown session; 0 for count-up
    pub end_time: i64,
    pub last_pause_time: Option<i64>,
    pub time_spent_paused: i64,
    pub time_at_pause: i64,
    pub completed_minutes: i64,
    pub long_break_data: LongBreakData,
    pub break_budget_data: BreakBudgetData,
}

impl DomainTimerData {
    pub fn profile(&self) -> &TimerProfile {
        &self.label.profile
    }

    pub fn label_name(&self) -> &str {
        &self.label.label.name
    }

    pub fn is_current_session_countdown(&self) -> bool {
        self.label.is_countdown()
    }

    /// Deadline for a session of `timer_type` started at `elapsed_realtime`
    pub fn end_time_for(&self, timer_type: TimerType, elapsed_realtime: i64) -> i64 {
        self.profile().end_time(timer_type, elapsed_realtime)
    }

    /// The time shown on the dial: remaining time for countdown, elapsed time for count-up
    pub fn base_time(&self, elapsed_realtime: i64) -> i64 {
        match self.state {
            TimerState::Reset => 0,
            TimerState::Paused => self.time_at_pause,
            TimerState::Running | TimerState::Finished => {
                if self.is_current_session_countdown() {
                    (self.end_time - elapsed_realtime).max(0)
                } else {
                    elapsed_realtime - self.start_time - self.time_spent_paused
                }
            }
        }
    }

    /// Remaining break budget in milliseconds for count-up profiles.
    ///
    /// Work earns budget at `1 / work_break_ratio` of its running time; running breaks
    /// consume it. Idle or paused timers keep it unchanged. Countdown profiles have none.
    pub fn break_budget(&self, elapsed_realtime: i64) -> i64 {
        if self.is_current_session_countdown() {
            return 0;
        }

        let data = self.break_budget_data;
        let since = data.elapsed_since_start(elapsed_realtime);
        match (self.state, self.timer_type) {
            (TimerState::Running, TimerType::Work) => {
                let ratio = i64::from(self.profile().work_break_ratio.max(1));
                data.break_budget_ms + since / ratio
            }
            (TimerState::Running, _) => (data.break_budget_ms - since).max(0),
            _ => data.break_budget_ms,
        }
    }

    /// Back to `Reset`, keeping the label and the cross-session bookkeeping
    pub fn reset(&self) -> Self {
        Self {
            is_ready: self.is_ready,
            label: self.label.clone(),
            long_break_data: self.long_break_data,
            break_budget_data: self.break_budget_data,
            ..Self::default()
        }
    }
}

impl TimerState {
    pub fn is_active(&self) -> bool {
        matches!(self, TimerState::Running | TimerState::Paused)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, TimerState::Reset)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, TimerState::Paused)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TimerState::Finished)
    }
}

impl TimerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerType::Work => "Work",
            TimerType::Break => "Break",
            TimerType::LongBreak => "Long Break",
        }
    }

    pub fn is_work(&self) -> bool {
        matches!(self, TimerType::Work)
    }

    pub fn is_break(&self) -> bool {
        !self.is_work()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_up_data() -> DomainTimerData {
        let mut data = DomainTimerData::default();
        data.label.profile = TimerProfile::count_up(3);
        data.break_budget_data = BreakBudgetData::new(60_000, 1_000);
        data
    }

    #[test]
    fn test_timer_type_strings() {
        assert_eq!(TimerType::Work.as_str(), "Work");
        assert_eq!(TimerType::Break.as_str(), "Break");
        assert_eq!(TimerType::LongBreak.as_str(), "Long Break");

        assert!(TimerType::Work.is_work());
        assert!(TimerType::LongBreak.is_break());
    }

    #[test]
    fn test_base_time_countdown() {
        let mut data = DomainTimerData {
            state: TimerState::Running,
            start_time: 0,
            end_time: 25 * 60_000,
            ..DomainTimerData::default()
        };
        assert_eq!(data.base_time(60_000), 24 * 60_000);
        assert_eq!(data.base_time(30 * 60_000), 0);

        data.state = TimerState::Paused;
        data.time_at_pause = 1_234;
        assert_eq!(data.base_time(99_999), 1_234);
    }

    #[test]
    fn test_base_time_count_up() {
        let mut data = count_up_data();
        data.state = TimerState::Running;
        data.start_time = 1_000;
        data.time_spent_paused = 500;
        assert_eq!(data.base_time(11_000), 9_500);
    }

    #[test]
    fn test_break_budget_grows_during_work() {
        let mut data = count_up_data();
        data.state = TimerState::Running;
        data.timer_type = TimerType::Work;
        assert_eq!(data.break_budget(1_000 + 90_000), 60_000 + 30_000);
    }

    #[test]
    fn test_break_budget_drains_during_break() {
        let mut data = count_up_data();
        data.state = TimerState::Running;
        data.timer_type = TimerType::Break;
        assert_eq!(data.break_budget(1_000 + 20_000), 40_000);
        assert_eq!(data.break_budget(1_000 + 120_000), 0);
    }

    #[test]
    fn test_break_budget_frozen_when_idle() {
        let mut data = count_up_data();
        assert_eq!(data.break_budget(500_000), 60_000);

        data.state = TimerState::Paused;
        data.timer_type = TimerType::Break;
        assert_eq!(data.break_budget(500_000), 60_000);
    }

    #[test]
    fn test_countdown_has_no_break_budget() {
        let mut data = count_up_data();
        data.label.profile = TimerProfile::default();
        assert_eq!(data.break_budget(10_000), 0);
    }

    #[test]
    fn test_reset_keeps_bookkeeping() {
        let data = DomainTimerData {
            is_ready: true,
            state: TimerState::Paused,
            timer_type: TimerType::Break,
            start_time: 10,
            last_start_time: 20,
            end_time: 30,
            last_pause_time: Some(25),
            time_spent_paused: 5,
            time_at_pause: 5,
            completed_minutes: 3,
            long_break_data: LongBreakData::new(2, 100),
            break_budget_data: BreakBudgetData::new(5, 6),
            ..DomainTimerData::default()
        };

        let reset = data.reset();
        assert!(reset.is_ready);
        assert_eq!(reset.state, TimerState::Reset);
        assert_eq!(reset.timer_type, TimerType::Work);
        assert_eq!(reset.start_time, 0);
        assert_eq!(reset.end_time, 0);
        assert_eq!(reset.last_pause_time, None);
        assert_eq!(reset.time_spent_paused, 0);
        assert_eq!(reset.completed_minutes, 0);
        assert_eq!(reset.long_break_data, LongBreakData::new(2, 100));
        assert_eq!(reset.break_budget_data, BreakBudgetData::new(5, 6));
    }
}
