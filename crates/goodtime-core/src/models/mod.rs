pub mod label;
pub mod profile;
pub mod session;
pub mod settings;
pub mod timer;

pub use label::{DomainLabel, Label};
pub use profile::TimerProfile;
pub use session::Session;
pub use settings::{AppSettings, BreakBudgetData, LongBreakData};
pub use timer::{DomainTimerData, TimerState, TimerType};
