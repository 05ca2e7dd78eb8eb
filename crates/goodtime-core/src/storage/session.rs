//! Session history storage operations (CSV format)

use crate::{models::Session, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const HEADERS: [&str; 9] = [
    "id",
    "start_timestamp",
    "end_timestamp",
    "duration",
    "interruptions",
    "label",
    "notes",
    "is_work",
    "is_archived",
];

/// CSV-friendly representation of a Session
#[derive(Debug, Serialize, Deserialize)]
struct SessionCsv {
    id: i64,
    start_timestamp: String,
    end_timestamp: String,
    duration: i64,
    interruptions: i64,
    label: String,
    notes: String,
    is_work: bool,
    is_archived: bool,
}

impl From<&Session> for SessionCsv {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            start_timestamp: session.start_timestamp.to_rfc3339(),
            end_timestamp: session.end_timestamp.to_rfc3339(),
            duration: session.duration,
            interruptions: session.interruptions,
            label: session.label.clone().unwrap_or_default(),
            notes: session.notes.clone().unwrap_or_default(),
            is_work: session.is_work,
            is_archived: session.is_archived,
        }
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| crate::Error::InvalidData(format!("Invalid {}: {}", field, e)))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl TryFrom<SessionCsv> for Session {
    type Error = crate::Error;

    fn try_from(csv: SessionCsv) -> Result<Self> {
        Ok(Self {
            id: csv.id,
            start_timestamp: parse_timestamp("start_timestamp", &csv.start_timestamp)?,
            end_timestamp: parse_timestamp("end_timestamp", &csv.end_timestamp)?,
            duration: csv.duration,
            interruptions: csv.interruptions,
            label: non_empty(csv.label),
            notes: non_empty(csv.notes),
            is_work: csv.is_work,
            is_archived: csv.is_archived,
        })
    }
}

pub struct SessionStorage {
    data_dir: PathBuf,
}

impl SessionStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn sessions_path(&self) -> PathBuf {
        self.data_dir.join("sessions.csv")
    }

    pub fn load(&self) -> Result<Vec<Session>> {
        let sessions_path = self.sessions_path();

        if !sessions_path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(sessions_path)?;
        let mut sessions = Vec::new();

        for result in reader.deserialize() {
            let session_csv: SessionCsv = result?;
            sessions.push(Session::try_from(session_csv)?);
        }

        Ok(sessions)
    }

    /// Id to assign to the next stored session
    pub fn next_id(sessions: &[Session]) -> i64 {
        sessions.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    pub fn append(&self, session: &Session) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let sessions_path = self.sessions_path();
        let file_exists = sessions_path.exists();

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&sessions_path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        // Only write header for brand new file
        if !file_exists {
            writer.write_record(HEADERS)?;
        }

        writer.serialize(SessionCsv::from(session))?;
        writer.flush()?;

        Ok(())
    }

    pub fn save_all(&self, sessions: &[Session]) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let mut writer = csv::Writer::from_path(self.sessions_path())?;

        for session in sessions {
            writer.serialize(SessionCsv::from(session))?;
        }

        writer.flush()?;
        Ok(())
    }
}
