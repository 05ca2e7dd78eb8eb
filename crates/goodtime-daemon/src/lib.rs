//! Goodtime daemon library: the timer state machine and its file-backed stores

pub mod event_manager;
pub mod label;
pub mod repository;
pub mod session;
pub mod settings;
pub mod timer;

pub use event_manager::EventManager;
pub use label::LabelManager;
pub use repository::{LabelRepository, SessionRepository, SettingsRepository};
pub use session::SessionManager;
pub use settings::SettingsManager;
pub use timer::{
    AlarmFired, AlarmScheduler, Event, EventListener, FinishActionType, SystemTimeProvider,
    TimeProvider, TimerDeps, TimerManager,
};
