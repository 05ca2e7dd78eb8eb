pub mod alarm;
pub mod clock;
pub mod events;
pub mod manager;
pub mod persistence;


pub use alarm::{AlarmFired, AlarmScheduler};
pub use clock::{SystemTimeProvider, TimeProvider};
pub use events::{Event, EventListener};
pub use manager::{FinishActionType, TimerDeps, TimerManager};
pub use persistence::Persistence;
