//! Finished session data model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A finished work or break session as kept in the history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    /// Minutes of actual work or break
    pub duration: i64,
    /// Minutes spent paused; always 0 for breaks
    pub interruptions: i64,
    /// Name of the label; may no longer exist
    pub label: Option<String>,
    pub notes: Option<String>,
    pub is_work: bool,
    pub is_archived: bool,
}

impl Session {
    /// Create a session that ended at `timestamp`.
    ///
    /// The start is derived from the duration and interruptions. The id stays 0 until
    /// the session is stored.
    pub fn create(
        timestamp: DateTime<Utc>,
        duration: i64,
        interruptions: i64,
        label: Option<String>,
        is_work: bool,
    ) -> Self {
        Self {
            id: 0,
            start_timestamp: timestamp - Duration::minutes(duration + interruptions),
            end_timestamp: timestamp,
            duration,
            interruptions,
            label,
            notes: None,
            is_work,
            is_archived: false,
        }
    }

    /// Total wall-clock span of the session in minutes
    pub fn span_minutes(&self) -> i64 {
        self.end_timestamp
            .signed_duration_since(self.start_timestamp)
            .num_minutes()
            .max(0)
    }
}
