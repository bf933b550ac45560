//! Session driver: the single owner of the live [`SessionState`].
//!
//! Ticks and control commands are applied from the same thread, each one
//! replacing the state slot wholesale.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::engine::{PhaseClock, SessionState};
use crate::error::{ConfigError, StoreError};
use crate::phase::Phase;
use crate::runtime::{Metronome, TickSource};
use crate::stopwatch::Stopwatch;
use crate::store::{ExerciseRecord, Profile, SessionStore};

/// Operator input understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    TogglePause,
    Skip,
    Stop,
    Reset,
}

/// Notification published when the state slot is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The phase value changed.
    Entered { from: Phase, to: Phase },
    /// A pulse was counted.
    Pulse { count: u32 },
}

/// Notifications for one state replacement.
///
/// A pulse that also changes the phase (into a rest break or `completed`)
/// yields its `Pulse` before the `Entered`.
pub fn phase_events(prev: &SessionState, next: &SessionState) -> impl Iterator<Item = PhaseEvent> {
    let pulse = (next.pulses_completed > prev.pulses_completed).then_some(PhaseEvent::Pulse {
        count: next.pulses_completed,
    });
    let entered = (prev.phase != next.phase).then_some(PhaseEvent::Entered {
        from: prev.phase,
        to: next.phase,
    });
    pulse.into_iter().chain(entered)
}

pub struct SessionDriver<T: TickSource = Metronome> {
    config: Config,
    clock: PhaseClock,
    state: SessionState,
    ticks: T,
    stopwatch: Stopwatch,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    saved: bool,
    subscribers: Vec<Sender<PhaseEvent>>,
}

impl<T: TickSource> SessionDriver<T> {
    pub fn new(config: Config, ticks: T) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = PhaseClock::new(config.timings);
        let state = clock.create(config.target_pulses, config.pulse_interval_secs);
        Ok(Self {
            config,
            clock,
            state,
            ticks,
            stopwatch: Stopwatch::new(),
            started_at: None,
            ended_at: None,
            saved: false,
            subscribers: Vec::new(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &PhaseClock {
        &self.clock
    }

    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    /// Wall-clock time spent in active phases.
    pub fn elapsed(&self) -> Duration {
        self.stopwatch.elapsed()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn subscribe(&mut self) -> Receiver<PhaseEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::TogglePause => {
                if self.state.is_paused {
                    self.resume()
                } else {
                    self.pause()
                }
            }
            Command::Skip => self.skip(),
            Command::Stop => self.stop(),
            Command::Reset => self.reset(),
        }
    }

    /// Begin a session from `idle`. Ignored in any other phase.
    pub fn start(&mut self) {
        if self.state.phase != Phase::Idle {
            debug!(phase = %self.state.phase, "start ignored outside idle");
            return;
        }

        let fresh = self
            .clock
            .create(self.config.target_pulses, self.config.pulse_interval_secs);
        self.stopwatch.reset();
        self.started_at = Some(Local::now());
        self.ended_at = None;
        self.saved = false;
        self.replace(self.clock.start_exercise(&fresh));
        self.ticks.begin();
        info!(
            target_pulses = self.config.target_pulses,
            pulse_interval_secs = self.config.pulse_interval_secs,
            "session started"
        );
    }

    /// Apply one scheduler tick.
    pub fn on_tick(&mut self) {
        self.ticks.acknowledge();
        let next = self.clock.tick(&self.state);
        if next != self.state {
            self.replace(next);
        }
    }

    pub fn pause(&mut self) {
        if self.state.phase.is_terminal() || self.state.is_paused {
            return;
        }
        self.replace(self.clock.set_paused(&self.state, true));
        info!(phase = %self.state.phase, "session paused");
    }

    pub fn resume(&mut self) {
        if !self.state.is_paused {
            return;
        }
        self.replace(self.clock.set_paused(&self.state, false));
        info!(phase = %self.state.phase, "session resumed");
    }

    pub fn skip(&mut self) {
        let from = self.state.phase;
        self.replace(self.clock.skip_phase(&self.state));
        info!(%from, to = %self.state.phase, "phase skipped");
    }

    /// Force the session to `completed`, keeping counters as they stand.
    pub fn stop(&mut self) {
        if self.state.phase == Phase::Completed {
            return;
        }
        self.replace(self.clock.stop(&self.state));
        info!(
            pulses_completed = self.state.pulses_completed,
            "session stopped"
        );
    }

    /// Discard the current session and return to a fresh `idle` state.
    pub fn reset(&mut self) {
        self.ticks.halt();
        self.stopwatch.reset();
        self.started_at = None;
        self.ended_at = None;
        self.saved = false;
        let fresh = self
            .clock
            .create(self.config.target_pulses, self.config.pulse_interval_secs);
        self.replace(fresh);
        info!("session reset");
    }

    fn replace(&mut self, next: SessionState) {
        let prev = std::mem::replace(&mut self.state, next);

        let now = Utc::now();
        if next.is_active() {
            self.stopwatch.resume_at(now);
        } else {
            self.stopwatch.pause_at(now);
        }

        if next.phase == Phase::Completed && prev.phase != Phase::Completed {
            self.ended_at = Some(Local::now());
            self.ticks.halt();
            info!(
                pulses_completed = next.pulses_completed,
                target_pulses = next.target_pulses,
                elapsed_secs = self.stopwatch.elapsed_at(now).as_secs(),
                "session completed"
            );
        }

        for event in phase_events(&prev, &next) {
            match event {
                PhaseEvent::Entered { from, to } => debug!(%from, %to, "phase changed"),
                PhaseEvent::Pulse { count } => trace!(count, "pulse"),
            }
            self.subscribers.retain(|tx| tx.send(event).is_ok());
        }
    }

    /// The immutable record of a finished session, if there is one.
    pub fn completion_record(&self) -> Option<ExerciseRecord> {
        if self.state.phase != Phase::Completed {
            return None;
        }
        Some(ExerciseRecord::new(
            self.state.pulses_completed,
            self.state.target_pulses,
            self.started_at?,
            self.ended_at?,
        ))
    }

    /// Hand the finished session to `store`.
    ///
    /// Returns `Ok(None)` when the result was already saved. A failure leaves
    /// the session state untouched so the caller can retry.
    pub fn persist<S: SessionStore>(&mut self, store: &mut S) -> Result<Option<Profile>, StoreError> {
        if self.saved {
            return Ok(None);
        }
        let record = self.completion_record().ok_or(StoreError::NotCompleted)?;
        match store.record_session(&record) {
            Ok(profile) => {
                self.saved = true;
                info!(
                    pulses_completed = record.pulses_completed,
                    points_earned = record.points_earned,
                    "session saved"
                );
                Ok(Some(profile))
            }
            Err(e) => {
                warn!(error = %e, "failed to save session");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Timings;
    use crate::runtime::ManualTicks;
    use assert_matches::assert_matches;

    fn small_config() -> Config {
        Config {
            target_pulses: 10,
            pulse_interval_secs: 1.0,
            timings: Timings {
                countdown_secs: 1.0,
                warmup_a_hold_secs: 1.0,
                warmup_a_rest_secs: 1.0,
                warmup_a_reps: 2,
                warmup_b_hold_secs: 1.0,
                warmup_b_rest_secs: 1.0,
                warmup_b_reps: 2,
                break_secs: 2.0,
                pulses_per_rest: 5,
                tick_ms: 500,
            },
            ..Config::default()
        }
    }

    fn driver() -> SessionDriver<ManualTicks> {
        SessionDriver::new(small_config(), ManualTicks::default()).unwrap()
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn record_session(&mut self, _record: &ExerciseRecord) -> Result<Profile, StoreError> {
            Err(StoreError::Io(std::io::Error::other("offline")))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: Vec<ExerciseRecord>,
    }

    impl SessionStore for MemoryStore {
        fn record_session(&mut self, record: &ExerciseRecord) -> Result<Profile, StoreError> {
            self.records.push(record.clone());
            Ok(Profile {
                total_pulses: self.records.iter().map(|r| r.pulses_completed as u64).sum(),
                ..Profile::default()
            })
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = Config {
            target_pulses: 0,
            ..small_config()
        };
        assert_matches!(
            SessionDriver::new(cfg, ManualTicks::default()).err(),
            Some(ConfigError::ZeroTargetPulses)
        );
    }

    #[test]
    fn start_enters_countdown_and_begins_ticking() {
        let mut d = driver();
        assert!(!d.ticks().is_running());
        d.start();
        assert_eq!(d.state().phase, Phase::Countdown);
        assert!(d.ticks().is_running());
        assert!(d.started_at().is_some());
    }

    #[test]
    fn start_is_ignored_mid_session() {
        let mut d = driver();
        d.start();
        d.on_tick();
        let before = *d.state();
        d.start();
        assert_eq!(*d.state(), before);
    }

    #[test]
    fn pause_freezes_state_and_elapsed() {
        let mut d = driver();
        d.start();
        d.on_tick();
        d.pause();
        let frozen = *d.state();
        let elapsed = d.elapsed();
        for _ in 0..20 {
            d.on_tick();
        }
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(*d.state(), frozen);
        assert_eq!(d.elapsed(), elapsed);
        assert!(d.ticks().is_running());

        d.handle(Command::TogglePause);
        assert!(!d.state().is_paused);
        d.on_tick();
        assert_ne!(*d.state(), frozen);
    }

    #[test]
    fn stop_completes_with_partial_counters_and_halts_ticks() {
        let mut d = driver();
        d.start();
        for _ in 0..3 {
            d.skip();
        }
        assert_eq!(d.state().phase, Phase::WarmupBHold);
        d.stop();
        assert_eq!(d.state().phase, Phase::Completed);
        assert_eq!(d.state().warmup_a_rep, 2);
        assert_eq!(d.state().pulses_completed, 0);
        assert!(!d.ticks().is_running());

        let record = d.completion_record().unwrap();
        assert!(!record.completed);
        assert_eq!(record.points_earned, 0);
    }

    #[test]
    fn stopping_a_paused_session_completes_unpaused() {
        let mut d = driver();
        d.start();
        d.on_tick();
        d.pause();
        d.stop();
        assert_eq!(d.state().phase, Phase::Completed);
        assert!(!d.state().is_paused);
        assert!(!d.state().is_active());

        d.resume();
        assert_eq!(d.state().phase, Phase::Completed);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut d = driver();
        d.start();
        d.on_tick();
        d.reset();
        assert_eq!(d.state().phase, Phase::Idle);
        assert_eq!(d.elapsed(), Duration::ZERO);
        assert!(!d.ticks().is_running());
        assert!(d.started_at().is_none());
        assert!(d.completion_record().is_none());
    }

    #[test]
    fn subscribers_see_phase_changes_and_pulses() {
        let mut d = driver();
        let events = d.subscribe();
        d.start();
        for _ in 0..5 {
            d.skip();
        }
        assert_eq!(d.state().phase, Phase::PulseTick);
        d.on_tick();
        d.on_tick();

        let seen: Vec<PhaseEvent> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                PhaseEvent::Entered { from: Phase::Idle, to: Phase::Countdown },
                PhaseEvent::Entered { from: Phase::Countdown, to: Phase::WarmupAHold },
                PhaseEvent::Entered { from: Phase::WarmupAHold, to: Phase::BreakA },
                PhaseEvent::Entered { from: Phase::BreakA, to: Phase::WarmupBHold },
                PhaseEvent::Entered { from: Phase::WarmupBHold, to: Phase::BreakB },
                PhaseEvent::Entered { from: Phase::BreakB, to: Phase::PulseTick },
                PhaseEvent::Pulse { count: 1 },
            ]
        );
    }

    #[test]
    fn pulse_that_starts_a_break_is_still_announced() {
        let mut d = driver();
        d.start();
        for _ in 0..5 {
            d.skip();
        }
        let events = d.subscribe();
        while d.state().phase == Phase::PulseTick {
            d.on_tick();
        }
        assert_eq!(d.state().phase, Phase::PulseBreak);

        let seen: Vec<PhaseEvent> = events.try_iter().collect();
        assert_eq!(
            &seen[seen.len() - 2..],
            &[
                PhaseEvent::Pulse { count: 5 },
                PhaseEvent::Entered { from: Phase::PulseTick, to: Phase::PulseBreak },
            ]
        );
    }

    #[test]
    fn final_pulse_precedes_completion() {
        let prev = SessionState {
            phase: Phase::PulseTick,
            pulses_completed: 9,
            ..*driver().state()
        };
        let next = SessionState {
            phase: Phase::Completed,
            pulses_completed: 10,
            ..prev
        };
        let events: Vec<PhaseEvent> = phase_events(&prev, &next).collect();
        assert_eq!(
            events,
            vec![
                PhaseEvent::Pulse { count: 10 },
                PhaseEvent::Entered { from: Phase::PulseTick, to: Phase::Completed },
            ]
        );
        assert_eq!(phase_events(&next, &next).count(), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut d = driver();
        drop(d.subscribe());
        let live = d.subscribe();
        d.start();
        assert_eq!(d.subscribers.len(), 1);
        assert_matches!(live.try_recv(), Ok(PhaseEvent::Entered { .. }));
    }

    #[test]
    fn persist_requires_completion() {
        let mut d = driver();
        d.start();
        let mut store = MemoryStore::default();
        assert_matches!(d.persist(&mut store), Err(StoreError::NotCompleted));
    }

    #[test]
    fn failed_save_keeps_completed_state_and_allows_retry() {
        let mut d = driver();
        d.start();
        d.stop();
        let done = *d.state();

        assert_matches!(d.persist(&mut FailingStore), Err(StoreError::Io(_)));
        assert_eq!(*d.state(), done);
        assert!(!d.is_saved());

        let mut store = MemoryStore::default();
        assert_matches!(d.persist(&mut store), Ok(Some(_)));
        assert_matches!(d.persist(&mut store), Ok(None));
        assert_eq!(store.records.len(), 1);
    }
}
