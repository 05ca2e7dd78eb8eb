//! Storage contracts consumed by the timer

use futures::future::BoxFuture;
use goodtime_core::{
    models::{AppSettings, BreakBudgetData, Label, LongBreakData, Session},
    Result,
};
use tokio::sync::watch;

/// Cross-restart settings: active label, auto-start flags, streak and break budget
pub trait SettingsRepository: Send + Sync {
    /// Observe the current settings
    fn settings(&self) -> watch::Receiver<AppSettings>;

    fn set_long_break_data(&self, data: LongBreakData) -> BoxFuture<'_, Result<()>>;

    fn set_break_budget_data(&self, data: BreakBudgetData) -> BoxFuture<'_, Result<()>>;

    /// Make the default label the active one
    fn activate_default_label(&self) -> BoxFuture<'_, Result<()>>;
}

pub trait LabelRepository: Send + Sync {
    /// Observe all labels, including the default one
    fn labels(&self) -> watch::Receiver<Vec<Label>>;
}

/// Session history
pub trait SessionRepository: Send + Sync {
    /// Store a new session and return its id
    fn insert_session(&self, session: Session) -> BoxFuture<'_, Result<i64>>;

    fn update_session(&self, id: i64, session: Session) -> BoxFuture<'_, Result<()>>;

    fn update_session_notes(&self, id: i64, notes: String) -> BoxFuture<'_, Result<()>>;
}
