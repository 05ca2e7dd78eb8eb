//! Timer profile data model

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

use super::TimerType;

const MINUTE_MILLIS: i64 = 60_000;

/// Timer configuration of a label. Durations are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerProfile {
    pub name: Option<String>,
    pub is_countdown: bool,
    /// Ignored when `is_countdown` is false
    pub work_duration: u32,
    pub is_break_enabled: bool,
    pub break_duration: u32,
    pub is_long_break_enabled: bool,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
    /// Minutes of work that earn one minute of break; ignored for countdown profiles
    pub work_break_ratio: u32,
}

impl TimerProfile {
    pub const DEFAULT_PROFILE_NAME: &'static str = "25/5";
    pub const DEFAULT_WORK_DURATION: u32 = 25;
    pub const DEFAULT_BREAK_DURATION: u32 = 5;
    pub const DEFAULT_LONG_BREAK_DURATION: u32 = 15;
    pub const DEFAULT_SESSIONS_BEFORE_LONG_BREAK: u32 = 4;
    pub const DEFAULT_WORK_BREAK_RATIO: u32 = 3;

    const MAX_DURATION: u32 = 600;

    /// Create a count-up profile with the given work/break ratio
    pub fn count_up(work_break_ratio: u32) -> Self {
        Self {
            name: None,
            is_countdown: false,
            work_break_ratio,
            ..Self::default()
        }
    }

    /// Duration in minutes of a session of the given type
    pub fn duration(&self, timer_type: TimerType) -> u32 {
        match timer_type {
            TimerType::Work => self.work_duration,
            TimerType::Break => self.break_duration,
            TimerType::LongBreak => self.long_break_duration,
        }
    }

    /// Monotonic deadline of a session of the given type started at `elapsed_realtime`.
    ///
    /// Returns 0 for count-up profiles, which have no deadline.
    pub fn end_time(&self, timer_type: TimerType, elapsed_realtime: i64) -> i64 {
        if self.is_countdown {
            elapsed_realtime + i64::from(self.duration(timer_type)) * MINUTE_MILLIS
        } else {
            0
        }
    }

    /// Validate the profile data
    pub fn validate(&self) -> Result<()> {
        if self.is_countdown {
            if self.work_duration == 0 {
                return Err(Error::Validation(
                    "Work duration must be greater than 0".to_string(),
                ));
            }

            if self.is_break_enabled && self.break_duration == 0 {
                return Err(Error::Validation(
                    "Break duration must be greater than 0".to_string(),
                ));
            }

            if self.is_long_break_enabled && self.long_break_duration == 0 {
                return Err(Error::Validation(
                    "Long break duration must be greater than 0".to_string(),
                ));
            }
        } else if self.work_break_ratio == 0 {
            return Err(Error::Validation(
                "Work/break ratio must be greater than 0".to_string(),
            ));
        }

        if self.sessions_before_long_break == 0 {
            return Err(Error::Validation(
                "Sessions before long break must be greater than 0".to_string(),
            ));
        }

        let longest = self
            .work_duration
            .max(self.break_duration)
            .max(self.long_break_duration);
        if longest > Self::MAX_DURATION {
            return Err(Error::Validation(format!(
                "Duration too long (max {} minutes)",
                Self::MAX_DURATION
            )));
        }

        Ok(())
    }
}

impl Default for TimerProfile {
    fn default() -> Self {
        Self {
            name: Some(Self::DEFAULT_PROFILE_NAME.to_string()),
            is_countdown: true,
            work_duration: Self::DEFAULT_WORK_DURATION,
            is_break_enabled: true,
            break_duration: Self::DEFAULT_BREAK_DURATION,
            is_long_break_enabled: false,
            long_break_duration: Self::DEFAULT_LONG_BREAK_DURATION,
            sessions_before_long_break: Self::DEFAULT_SESSIONS_BEFORE_LONG_BREAK,
            work_break_ratio: Self::DEFAULT_WORK_BREAK_RATIO,
        }
    }
}
