//! Timer manager - the single owner of the running timer.
//!
//! Commands run their whole read-modify-write cycle under one lock, publish the new
//! snapshot on a watch channel and then notify the listeners. Invalid commands are
//! logged and leave the snapshot untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use goodtime_core::models::{
    timer::{COUNT_UP_HARD_LIMIT, WIGGLE_ROOM_MILLIS},
    AppSettings, BreakBudgetData, DomainLabel, DomainTimerData, Label, LongBreakData, Session,
    TimerState, TimerType,
};

use super::clock::TimeProvider;
use super::events::{Event, EventListener};
use super::persistence::Persistence;
use crate::repository::{LabelRepository, SessionRepository, SettingsRepository};

const MINUTE_MILLIS: i64 = 60_000;

/// Slack on top of one work and one break before a long-break streak goes stale
const STREAK_GRACE_MILLIS: i64 = 30 * MINUTE_MILLIS;

/// What ended a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishActionType {
    ManualReset,
    /// Counts towards the long-break streak even when shorter than a minute
    ManualSkip,
    ManualNext,
    /// Stop without saving anything
    ManualDoNothing,
    Auto,
}

/// Collaborators of the timer
pub struct TimerDeps {
    pub time: Arc<dyn TimeProvider>,
    pub settings: Arc<dyn SettingsRepository>,
    pub labels: Arc<dyn LabelRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub listeners: Vec<Arc<dyn EventListener>>,
}

struct TimerCell {
    data: DomainTimerData,
    /// The current session was already saved or discarded
    finalized: bool,
}

#[derive(Clone)]
pub struct TimerManager {
    cell: Arc<Mutex<TimerCell>>,
    /// Held from the start of a command until its listeners have been notified
    delivery: Arc<Mutex<()>>,
    timer_tx: Arc<watch::Sender<DomainTimerData>>,
    settings: watch::Receiver<AppSettings>,
    settings_repo: Arc<dyn SettingsRepository>,
    label_repo: Arc<dyn LabelRepository>,
    persistence: Persistence,
    listeners: Arc<[Arc<dyn EventListener>]>,
    time: Arc<dyn TimeProvider>,
    observer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TimerManager {
    /// Create the timer and start following the active label.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(deps: TimerDeps) -> Self {
        let settings = deps.settings.settings();
        let persistence = Persistence::spawn(deps.settings.clone(), deps.sessions);
        let (timer_tx, _) = watch::channel(DomainTimerData::default());

        let manager = Self {
            cell: Arc::new(Mutex::new(TimerCell {
                data: DomainTimerData::default(),
                finalized: false,
            })),
            delivery: Arc::new(Mutex::new(())),
            timer_tx: Arc::new(timer_tx),
            settings,
            settings_repo: deps.settings,
            label_repo: deps.labels,
            persistence,
            listeners: deps.listeners.into(),
            time: deps.time,
            observer: Arc::new(Mutex::new(None)),
        };
        manager.setup();
        manager
    }

    fn setup(&self) {
        self.init_persistent_data();
        let handle = tokio::spawn(self.clone().observe_labels());
        *lock(&self.observer) = Some(handle);
    }

    /// Tear down the label observer and set everything up again
    pub fn restart(&self) {
        tracing::info!("Restarting timer manager");
        self.shutdown();
        self.setup();
    }

    /// Stop following label and settings changes
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.observer).take() {
            handle.abort();
        }
    }

    /// Wait until all persistence queued so far has completed
    pub async fn flush(&self) {
        self.persistence.flush().await;
    }

    /// Observe the timer snapshot
    pub fn subscribe(&self) -> watch::Receiver<DomainTimerData> {
        self.timer_tx.subscribe()
    }

    pub fn timer_data(&self) -> DomainTimerData {
        self.timer_tx.borrow().clone()
    }

    /// Resolves once the active label has been loaded
    pub async fn wait_until_ready(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|data| data.is_ready).await;
    }

    /// Start a session of `timer_type`, or of the current type if `None`
    pub fn start(&self, timer_type: Option<TimerType>, auto_started: bool) {
        self.command(|t| t.start(timer_type, auto_started));
    }

    pub fn toggle(&self) {
        self.command(|t| t.toggle());
    }

    pub fn pause(&self) {
        self.command(|t| t.pause());
    }

    pub fn resume(&self) {
        self.command(|t| t.resume());
    }

    pub fn add_one_minute(&self) {
        self.command(|t| t.add_one_minute());
    }

    /// End the current session early and start the next one
    pub fn skip(&self) {
        self.next(false, FinishActionType::ManualSkip);
    }

    /// Save the current session and start the next one.
    ///
    /// With `update_work_time` set on a finished session, the already saved session is
    /// extended up to now instead.
    pub fn next(&self, update_work_time: bool, finish_action_type: FinishActionType) {
        self.command(|t| t.next(update_work_time, finish_action_type));
    }

    /// Called when the deadline of a countdown session is reached
    pub fn finish(&self) {
        self.command(|t| t.finish());
    }

    /// React to the alarm: finish the running session only if its deadline has passed.
    ///
    /// An alarm can be delivered after the deadline moved or the timer paused; those are ignored.
    pub fn finish_if_due(&self) {
        self.command(|t| {
            let now = t.elapsed_realtime();
            if t.data().state.is_running() && t.effective_end_time(now) <= now {
                t.finish();
            } else {
                tracing::debug!("Ignoring alarm, the session is not due");
            }
        });
    }

    /// Stop the timer.
    ///
    /// With `update_work_time` set on a finished session, the already saved session is
    /// extended up to now, for when the user missed the alarm and kept working.
    pub fn reset(&self, update_work_time: bool, action_type: FinishActionType) {
        self.command(|t| t.reset(update_work_time, action_type));
    }

    /// Drop the long-break streak if the last work session ended too long ago
    pub fn reset_streak_if_needed(&self) {
        let now = self.time.elapsed_realtime();
        self.command(|t| t.reset_streak_if_needed(now));
    }

    pub fn update_notes_for_last_completed_session(&self, notes: &str) {
        let notes = notes.trim();
        if !notes.is_empty() {
            self.persistence.update_last_session_notes(notes.to_string());
        }
    }

    pub fn on_send_to_background(&self) {
        self.command(|t| {
            let now = t.elapsed_realtime();
            let event = Event::SendToBackground {
                is_timer_running: t.data().state.is_running(),
                end_time: t.effective_end_time(now),
            };
            t.emit(event);
        });
    }

    pub fn on_bring_to_foreground(&self) {
        self.command(|t| t.emit(Event::BringToForeground));
    }

    fn init_persistent_data(&self) {
        let (long_break_data, break_budget_data) = {
            let settings = self.settings.borrow();
            (settings.long_break_data, settings.break_budget_data)
        };
        tracing::info!("Long break data: {:?}", long_break_data);
        tracing::info!("Break budget data: {:?}", break_budget_data);

        self.command(|t| {
            t.cell.data.long_break_data = long_break_data;
            t.cell.data.break_budget_data = break_budget_data;
        });
    }

    async fn observe_labels(self) {
        let mut settings = self.settings_repo.settings();
        let mut labels = self.label_repo.labels();
        let mut current: Option<DomainLabel> = None;

        loop {
            let resolved = {
                let label_name = settings.borrow_and_update().label_name.clone();
                let all_labels = labels.borrow_and_update();
                resolve_active_label(&label_name, &all_labels)
            };

            match resolved {
                ActiveLabel::Found(label) => self.on_label_resolved(label, &mut current),
                ActiveLabel::Missing(default_label) => {
                    tracing::info!("Active label not found, activating the default label");
                    self.persistence.activate_default_label();
                    self.on_label_resolved(default_label, &mut current);
                }
                ActiveLabel::NoDefault => tracing::warn!("Default label is not available"),
            }

            tokio::select! {
                changed = settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = labels.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Label observer stopped");
    }

    fn on_label_resolved(&self, label: DomainLabel, current: &mut Option<DomainLabel>) {
        if current.as_ref() == Some(&label) {
            return;
        }
        *current = Some(label.clone());
        self.command(|t| t.apply_label(label));
    }

    fn command<F>(&self, f: F)
    where
        F: FnOnce(&mut Transition<'_>),
    {
        // listeners see events in the same order as the state changes
        let _delivery = lock(&self.delivery);

        let events = {
            let mut cell = lock(&self.cell);
            let mut transition = Transition {
                manager: self,
                cell: &mut *cell,
                events: Vec::new(),
            };
            f(&mut transition);
            let events = transition.events;

            let data = &cell.data;
            self.timer_tx.send_if_modified(|current| {
                if *current == *data {
                    false
                } else {
                    *current = data.clone();
                    true
                }
            });
            events
        };

        for event in &events {
            for listener in self.listeners.iter() {
                listener.on_event(event);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum ActiveLabel {
    Found(DomainLabel),
    /// The active label does not exist (anymore); fall back to the default one
    Missing(DomainLabel),
    NoDefault,
}

fn resolve_active_label(label_name: &str, labels: &[Label]) -> ActiveLabel {
    let Some(default_label) = labels.iter().find(|label| label.is_default()) else {
        return ActiveLabel::NoDefault;
    };

    match labels.iter().find(|label| label.name == label_name) {
        Some(label) => ActiveLabel::Found(DomainLabel::resolve(label.clone(), default_label)),
        None => ActiveLabel::Missing(DomainLabel::resolve(default_label.clone(), default_label)),
    }
}

/// One command in progress, holding the state lock
struct Transition<'a> {
    manager: &'a TimerManager,
    cell: &'a mut TimerCell,
    events: Vec<Event>,
}

impl Transition<'_> {
    fn data(&self) -> &DomainTimerData {
        &self.cell.data
    }

    fn elapsed_realtime(&self) -> i64 {
        self.manager.time.elapsed_realtime()
    }

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Deadline reported to listeners; synthetic for count-up sessions
    fn effective_end_time(&self, now: i64) -> i64 {
        let data = self.data();
        if data.is_current_session_countdown() {
            data.end_time
        } else {
            now + (COUNT_UP_HARD_LIMIT - data.base_time(now))
        }
    }

    fn start(&mut self, timer_type: Option<TimerType>, auto_started: bool) {
        tracing::info!("Starting timer...");
        if !self.data().is_ready {
            tracing::error!("Timer data not ready");
            return;
        }
        if !self.data().state.is_reset() {
            tracing::error!("Trying to start the timer when it is not reset");
            return;
        }

        let timer_type = timer_type.unwrap_or(self.data().timer_type);
        self.update_break_budget_if_needed();

        let now = self.elapsed_realtime();
        let data = &mut self.cell.data;
        data.start_time = now;
        data.last_start_time = now;
        data.end_time = data.end_time_for(timer_type, now);
        data.state = TimerState::Running;
        data.timer_type = timer_type;
        data.time_spent_paused = 0;
        data.time_at_pause = 0;
        data.last_pause_time = None;
        self.cell.finalized = false;

        if timer_type.is_work() {
            // preemptively drop the streak if this session cannot end in time
            let end_time = self.data().end_time;
            self.reset_streak_if_needed(end_time);
        }
        self.manager.persistence.forget_last_session();

        let end_time = self.effective_end_time(now);
        tracing::info!("Started {} session", timer_type.as_str());
        self.emit(Event::Start {
            auto_started,
            end_time,
        });
    }

    fn toggle(&mut self) {
        let state = self.data().state;
        if state.is_running() {
            self.pause();
        } else if state.is_paused() {
            self.resume();
        } else {
            tracing::error!("Trying to toggle the timer when it is not running or paused");
        }
    }

    fn pause(&mut self) {
        if !self.data().state.is_running() {
            tracing::error!("Trying to pause the timer when it is not running");
            return;
        }

        let now = self.elapsed_realtime();
        self.update_break_budget_if_needed();

        let data = &mut self.cell.data;
        data.time_at_pause = if data.is_current_session_countdown() {
            data.end_time - now
        } else {
            now - data.start_time - data.time_spent_paused
        };
        data.last_pause_time = Some(now);
        data.state = TimerState::Paused;

        tracing::info!("Paused: {:?}", self.data());
        self.emit(Event::Pause);
    }

    fn resume(&mut self) {
        if !self.data().state.is_paused() {
            tracing::error!("Trying to resume the timer when it is not paused");
            return;
        }

        let now = self.elapsed_realtime();
        self.update_break_budget_if_needed();
        self.update_paused_time(now);

        let data = &mut self.cell.data;
        data.last_start_time = now;
        if data.is_current_session_countdown() {
            data.end_time = data.time_at_pause + now;
        }
        data.state = TimerState::Running;
        data.time_at_pause = 0;

        tracing::info!("Resumed: {:?}", self.data());
        let end_time = self.effective_end_time(now);
        self.emit(Event::Start {
            auto_started: false,
            end_time,
        });
    }

    fn update_paused_time(&mut self, now: i64) {
        let data = &mut self.cell.data;
        if let Some(last_pause_time) = data.last_pause_time.take() {
            data.time_spent_paused += now - last_pause_time;
            tracing::debug!("Time spent paused: {} ms", data.time_spent_paused);
        }
    }

    fn add_one_minute(&mut self) {
        if !self.data().state.is_active() {
            tracing::error!("Trying to add one minute when the timer is not running");
            return;
        }
        if !self.data().profile().is_countdown {
            tracing::error!("Trying to add a minute to a timer that is not a countdown");
            return;
        }

        let data = &mut self.cell.data;
        data.end_time += MINUTE_MILLIS;
        if data.state.is_paused() {
            data.time_at_pause += MINUTE_MILLIS;
        }
        let new_end_time = data.end_time;

        tracing::info!("Added one minute");
        self.emit(Event::AddOneMinute { new_end_time });
    }

    fn next(&mut self, update_work_time: bool, finish_action_type: FinishActionType) {
        if !self.data().is_ready {
            tracing::error!("Timer data not ready");
            return;
        }
        if self.data().state.is_reset() {
            tracing::error!("Trying to start the next session but the timer is reset");
            return;
        }

        let now = self.elapsed_realtime();
        let is_work = self.data().timer_type.is_work();
        let profile = self.data().profile().clone();

        if is_work
            && !profile.is_countdown
            && profile.is_break_enabled
            && self.data().break_budget(now) < MINUTE_MILLIS
        {
            tracing::error!("Break budget is depleted, cannot start break");
            return;
        }

        self.update_break_budget_if_needed();
        self.finalize_session(update_work_time, finish_action_type);
        self.cell.data = self.cell.data.reset();

        let next_type = if !is_work || !profile.is_break_enabled {
            TimerType::Work
        } else if !profile.is_countdown {
            TimerType::Break
        } else if self.should_consider_streak(self.elapsed_realtime()) {
            TimerType::LongBreak
        } else {
            TimerType::Break
        };
        tracing::info!("Next: {}", next_type.as_str());

        let auto_started = {
            let settings = self.manager.settings.borrow();
            (next_type.is_work() && settings.auto_start_work)
                || (next_type.is_break() && settings.auto_start_break)
        };
        self.start(Some(next_type), auto_started);
    }

    fn finish(&mut self) {
        if !self.data().is_ready {
            tracing::error!("Timer data not ready");
            return;
        }
        let state = self.data().state;
        if state.is_reset() || state.is_finished() {
            tracing::error!("Trying to finish the timer when it is reset or finished");
            return;
        }

        let timer_type = self.data().timer_type;
        let is_break_enabled = self.data().profile().is_break_enabled;

        // settle the budget while the session still counts as running
        self.update_break_budget_if_needed();

        let now = self.elapsed_realtime();
        self.cell.data.state = TimerState::Finished;
        self.cell.data.end_time = now;
        tracing::info!("Finish: {:?}", self.data());

        self.finalize_session(false, FinishActionType::Auto);

        let auto_start = {
            let settings = self.manager.settings.borrow();
            (settings.auto_start_work && (timer_type.is_break() || !is_break_enabled))
                || (settings.auto_start_break && timer_type.is_work() && is_break_enabled)
        };
        tracing::info!("AutoStart: {}", auto_start);

        self.emit(Event::Finished {
            timer_type,
            autostart_next_session: auto_start,
        });
        if auto_start {
            self.next(false, FinishActionType::Auto);
        }
    }

    fn reset(&mut self, update_work_time: bool, action_type: FinishActionType) {
        if self.data().state.is_reset() {
            tracing::warn!("Trying to reset the timer when it is already reset");
            return;
        }

        tracing::info!("Reset: {:?}", self.data());
        self.update_break_budget_if_needed();

        if action_type != FinishActionType::ManualDoNothing {
            self.finalize_session(update_work_time, action_type);
        }

        self.emit(Event::Reset);
        self.cell.data = self.cell.data.reset();
    }

    fn apply_label(&mut self, label: DomainLabel) {
        tracing::info!("New timer profile: {:?}", label);
        let was_active = self.data().state.is_active();
        let was_countdown = self.data().is_current_session_countdown();
        let timer_type = self.data().timer_type;

        self.cell.data.is_ready = true;
        self.cell.data.label = label;

        if was_active && was_countdown != self.data().is_current_session_countdown() {
            tracing::info!("Restarting the timer because the profile type changed");
            self.reset(false, FinishActionType::ManualReset);
            self.start(Some(timer_type), false);
        }
    }

    /// Checkpoint the break budget of count-up profiles and return it
    fn update_break_budget_if_needed(&mut self) -> i64 {
        if self.data().is_current_session_countdown() {
            return 0;
        }

        let now = self.elapsed_realtime();
        let break_budget = self.data().break_budget(now);
        tracing::trace!("Persisting break budget: {} ms", break_budget);

        let checkpoint = BreakBudgetData::new(break_budget, now);
        self.cell.data.break_budget_data = checkpoint;
        self.manager.persistence.set_break_budget_data(checkpoint);
        break_budget
    }

    /// Save the current session once; later requests may only extend a finished one
    fn finalize_session(&mut self, update_work_time: bool, finish_action_type: FinishActionType) {
        if self.cell.finalized {
            if update_work_time && self.data().state.is_finished() {
                if let Some(session) = self.create_finished_session() {
                    self.manager.persistence.update_last_session(session);
                }
            }
            return;
        }
        self.cell.finalized = true;

        if let Some(session) = self.create_finished_session() {
            self.manager.persistence.save_session(session);
        }

        let data = self.data();
        let counts_for_streak = matches!(
            finish_action_type,
            FinishActionType::Auto | FinishActionType::ManualSkip
        );
        if data.timer_type.is_work()
            && data.profile().is_countdown
            && data.profile().is_long_break_enabled
            && counts_for_streak
        {
            self.increment_streak();
        }
    }

    fn create_finished_session(&mut self) -> Option<Session> {
        let now = self.elapsed_realtime();
        self.update_paused_time(now);

        let data = &mut self.cell.data;
        let is_work = data.timer_type.is_work();
        let total_duration = now - data.start_time;
        let interruptions = data.time_spent_paused;

        let duration_to_save = if is_work {
            total_duration - interruptions + WIGGLE_ROOM_MILLIS
        } else {
            total_duration
        };

        let duration_minutes = duration_to_save.div_euclid(MINUTE_MILLIS);
        if duration_minutes < 1 {
            tracing::info!(
                "The session was shorter than 1 minute: {} ms",
                duration_to_save
            );
            return None;
        }

        data.completed_minutes = duration_minutes;

        Some(Session::create(
            self.manager.time.now(),
            duration_minutes,
            if is_work {
                interruptions / MINUTE_MILLIS
            } else {
                0
            },
            Some(data.label_name().to_string()),
            is_work,
        ))
    }

    fn increment_streak(&mut self) {
        let last_work_end_time = self.elapsed_realtime();
        let new_data =
            LongBreakData::new(self.data().long_break_data.streak + 1, last_work_end_time);

        self.cell.data.long_break_data = new_data;
        self.manager.persistence.set_long_break_data(new_data);
        tracing::debug!("Streak incremented: {}", new_data.streak);
    }

    fn reset_streak_if_needed(&mut self, at: i64) {
        if self.did_last_work_session_finish_recently(at) {
            return;
        }
        if self.data().long_break_data != LongBreakData::default() {
            tracing::debug!("Reset long break data");
            self.cell.data.long_break_data = LongBreakData::default();
            self.manager
                .persistence
                .set_long_break_data(LongBreakData::default());
        }
    }

    fn should_consider_streak(&self, work_end_time: i64) -> bool {
        let data = self.data();
        let profile = data.profile();
        if !profile.is_countdown || !profile.is_long_break_enabled {
            return false;
        }

        let streak_reached = data
            .long_break_data
            .streak_in_use(profile.sessions_before_long_break)
            == 0;
        streak_reached && self.did_last_work_session_finish_recently(work_end_time)
    }

    fn did_last_work_session_finish_recently(&self, work_end_time: i64) -> bool {
        let data = self.data();
        let profile = data.profile();
        if !profile.is_countdown {
            return false;
        }

        let max_idle_time = i64::from(profile.work_duration) * MINUTE_MILLIS
            + i64::from(profile.break_duration) * MINUTE_MILLIS
            + STREAK_GRACE_MILLIS;
        let last_work_end_time = data.long_break_data.last_work_end_time;

        // a completion later than `work_end_time` was stamped by a clock that has since
        // gone backwards, so it says nothing about recency
        let idle_time = work_end_time - last_work_end_time;
        last_work_end_time != 0 && (0..max_idle_time).contains(&idle_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<Label> {
        let mut reading = Label::new("reading".to_string()).unwrap();
        reading.id = 2;
        vec![Label::default_label(), reading]
    }

    #[test]
    fn test_resolve_active_label() {
        match resolve_active_label("reading", &labels()) {
            ActiveLabel::Found(label) => assert_eq!(label.label.name, "reading"),
            _ => panic!("Expected the reading label"),
        }
    }

    #[test]
    fn test_resolve_missing_label_falls_back_to_default() {
        match resolve_active_label("gone", &labels()) {
            ActiveLabel::Missing(label) => assert!(label.label.is_default()),
            _ => panic!("Expected a fallback to the default label"),
        }
    }

    #[test]
    fn test_resolve_without_default_label() {
        let labels: Vec<Label> = labels().into_iter().filter(|l| !l.is_default()).collect();
        assert!(matches!(
            resolve_active_label("reading", &labels),
            ActiveLabel::NoDefault
        ));
    }
}
