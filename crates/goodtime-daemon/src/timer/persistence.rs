//! Background persistence for the timer.
//!
//! Timer commands never wait for storage. Jobs go to a single worker task that runs
//! them in submission order, so an update always follows the insert it refers to.
//! Failures are logged and dropped; the in-memory timer state is never rolled back.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use goodtime_core::models::{BreakBudgetData, LongBreakData, Session};

use crate::repository::{SessionRepository, SettingsRepository};

enum Job {
    LongBreakData(LongBreakData),
    BreakBudgetData(BreakBudgetData),
    ActivateDefaultLabel,
    SaveSession(Session),
    UpdateLastSession(Session),
    UpdateLastSessionNotes(String),
    ForgetLastSession,
    Flush(oneshot::Sender<()>),
}

/// Handle to the persistence worker
#[derive(Clone)]
pub struct Persistence {
    job_tx: mpsc::UnboundedSender<Job>,
}

impl Persistence {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(
        settings: Arc<dyn SettingsRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(settings, sessions, job_rx));
        Self { job_tx }
    }

    pub fn set_long_break_data(&self, data: LongBreakData) {
        self.submit(Job::LongBreakData(data));
    }

    pub fn set_break_budget_data(&self, data: BreakBudgetData) {
        self.submit(Job::BreakBudgetData(data));
    }

    pub fn activate_default_label(&self) {
        self.submit(Job::ActivateDefaultLabel);
    }

    pub fn save_session(&self, session: Session) {
        self.submit(Job::SaveSession(session));
    }

    /// Replace the session inserted for the current cycle, or insert it if there is none
    pub fn update_last_session(&self, session: Session) {
        self.submit(Job::UpdateLastSession(session));
    }

    pub fn update_last_session_notes(&self, notes: String) {
        self.submit(Job::UpdateLastSessionNotes(notes));
    }

    /// Start a new cycle; later updates will not touch previously inserted sessions
    pub fn forget_last_session(&self) {
        self.submit(Job::ForgetLastSession);
    }

    /// Wait until every job submitted so far has been processed
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(Job::Flush(done_tx));
        let _ = done_rx.await;
    }

    fn submit(&self, job: Job) {
        if self.job_tx.send(job).is_err() {
            tracing::warn!("Persistence worker is gone, dropping job");
        }
    }
}

async fn run_worker(
    settings: Arc<dyn SettingsRepository>,
    sessions: Arc<dyn SessionRepository>,
    mut job_rx: mpsc::UnboundedReceiver<Job>,
) {
    // Target of work-time updates; cleared when a new session starts
    let mut last_inserted_id: Option<i64> = None;
    // Target of notes updates
    let mut last_finished_id: Option<i64> = None;

    while let Some(job) = job_rx.recv().await {
        match job {
            Job::LongBreakData(data) => {
                if let Err(e) = settings.set_long_break_data(data).await {
                    tracing::warn!("Failed to persist long break data: {}", e);
                }
            }
            Job::BreakBudgetData(data) => {
                if let Err(e) = settings.set_break_budget_data(data).await {
                    tracing::warn!("Failed to persist break budget: {}", e);
                }
            }
            Job::ActivateDefaultLabel => {
                if let Err(e) = settings.activate_default_label().await {
                    tracing::warn!("Failed to activate the default label: {}", e);
                }
            }
            Job::SaveSession(session) => {
                last_inserted_id = insert(sessions.as_ref(), session).await;
                last_finished_id = last_inserted_id.or(last_finished_id);
            }
            Job::UpdateLastSession(session) => match last_inserted_id {
                Some(id) => {
                    tracing::debug!("Updating session {}", id);
                    if let Err(e) = sessions.update_session(id, session).await {
                        tracing::warn!("Failed to update session {}: {}", id, e);
                    }
                }
                None => {
                    last_inserted_id = insert(sessions.as_ref(), session).await;
                    last_finished_id = last_inserted_id.or(last_finished_id);
                }
            },
            Job::UpdateLastSessionNotes(notes) => match last_finished_id {
                Some(id) => {
                    if let Err(e) = sessions.update_session_notes(id, notes).await {
                        tracing::warn!("Failed to update notes of session {}: {}", id, e);
                    }
                }
                None => tracing::warn!("No finished session to attach notes to"),
            },
            Job::ForgetLastSession => last_inserted_id = None,
            Job::Flush(done_tx) => {
                let _ = done_tx.send(());
            }
        }
    }

    tracing::debug!("Persistence worker stopped");
}

async fn insert(sessions: &dyn SessionRepository, session: Session) -> Option<i64> {
    match sessions.insert_session(session).await {
        Ok(id) => {
            tracing::debug!("Saved session {}", id);
            Some(id)
        }
        Err(e) => {
            tracing::warn!("Failed to save session: {}", e);
            None
        }
    }
}
