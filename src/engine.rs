//! Phase clock: pure advancement of a [`SessionState`] by one tick.
//!
//! Every operation takes the current state by reference and returns a new
//! value, so a sequence of states can always be replayed from the start.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Phase durations and block sizes that shape a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub countdown_secs: f64,
    pub warmup_a_hold_secs: f64,
    pub warmup_a_rest_secs: f64,
    pub warmup_a_reps: u32,
    pub warmup_b_hold_secs: f64,
    pub warmup_b_rest_secs: f64,
    pub warmup_b_reps: u32,
    pub break_secs: f64,
    /// A pulse break is inserted after every this many pulses.
    pub pulses_per_rest: u32,
    pub tick_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            countdown_secs: 3.0,
            warmup_a_hold_secs: 2.0,
            warmup_a_rest_secs: 2.0,
            warmup_a_reps: 20,
            warmup_b_hold_secs: 10.0,
            warmup_b_rest_secs: 10.0,
            warmup_b_reps: 5,
            break_secs: 30.0,
            pulses_per_rest: 200,
            tick_ms: 100,
        }
    }
}

impl Timings {
    pub fn tick_secs(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }

    /// Shortest fixed phase duration; the pulse interval is checked separately.
    pub fn shortest_phase_secs(&self) -> f64 {
        [
            self.countdown_secs,
            self.warmup_a_hold_secs,
            self.warmup_a_rest_secs,
            self.warmup_b_hold_secs,
            self.warmup_b_rest_secs,
            self.break_secs,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }
}

/// Snapshot of a running session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    pub time_remaining: f64,
    pub warmup_a_rep: u32,
    pub warmup_b_rep: u32,
    pub pulses_completed: u32,
    pub target_pulses: u32,
    pub pulse_interval_secs: f64,
    pub total_warmup_a_reps: u32,
    pub total_warmup_b_reps: u32,
    pub is_paused: bool,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        !self.is_paused && !self.phase.is_terminal()
    }

    /// Terminal phases are never paused.
    fn enter(&self, phase: Phase, time_remaining: f64) -> Self {
        Self {
            phase,
            time_remaining,
            is_paused: self.is_paused && !phase.is_terminal(),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseClock {
    timings: Timings,
}

impl PhaseClock {
    pub fn new(timings: Timings) -> Self {
        Self { timings }
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// A fresh idle state with zeroed counters.
    pub fn create(&self, target_pulses: u32, pulse_interval_secs: f64) -> SessionState {
        SessionState {
            phase: Phase::Idle,
            time_remaining: 0.0,
            warmup_a_rep: 0,
            warmup_b_rep: 0,
            pulses_completed: 0,
            target_pulses,
            pulse_interval_secs,
            total_warmup_a_reps: self.timings.warmup_a_reps,
            total_warmup_b_reps: self.timings.warmup_b_reps,
            is_paused: false,
        }
    }

    pub fn start_exercise(&self, state: &SessionState) -> SessionState {
        state.enter(Phase::Countdown, self.timings.countdown_secs)
    }

    /// Advance by one tick quantum.
    pub fn tick(&self, state: &SessionState) -> SessionState {
        if state.is_paused || state.phase.is_terminal() {
            return *state;
        }

        let quantum = self.timings.tick_secs();
        let next = state.time_remaining - quantum;

        // half a quantum absorbs the error from repeated subtraction
        if next > quantum / 2.0 {
            return SessionState {
                time_remaining: next,
                ..*state
            };
        }

        self.advance_phase(state)
    }

    fn advance_phase(&self, state: &SessionState) -> SessionState {
        let t = &self.timings;
        match state.phase {
            Phase::Idle | Phase::Completed => *state,
            Phase::Countdown => SessionState {
                warmup_a_rep: 1,
                ..state.enter(Phase::WarmupAHold, t.warmup_a_hold_secs)
            },
            Phase::WarmupAHold => state.enter(Phase::WarmupARest, t.warmup_a_rest_secs),
            Phase::WarmupARest => {
                if state.warmup_a_rep < state.total_warmup_a_reps {
                    SessionState {
                        warmup_a_rep: state.warmup_a_rep + 1,
                        ..state.enter(Phase::WarmupAHold, t.warmup_a_hold_secs)
                    }
                } else {
                    state.enter(Phase::BreakA, t.break_secs)
                }
            }
            Phase::BreakA => SessionState {
                warmup_b_rep: 1,
                ..state.enter(Phase::WarmupBHold, t.warmup_b_hold_secs)
            },
            Phase::WarmupBHold => state.enter(Phase::WarmupBRest, t.warmup_b_rest_secs),
            Phase::WarmupBRest => {
                if state.warmup_b_rep < state.total_warmup_b_reps {
                    SessionState {
                        warmup_b_rep: state.warmup_b_rep + 1,
                        ..state.enter(Phase::WarmupBHold, t.warmup_b_hold_secs)
                    }
                } else {
                    state.enter(Phase::BreakB, t.break_secs)
                }
            }
            Phase::BreakB | Phase::PulseBreak => {
                state.enter(Phase::PulseTick, state.pulse_interval_secs)
            }
            Phase::PulseTick => {
                let pulses_completed = state.pulses_completed + 1;
                let next = if pulses_completed >= state.target_pulses {
                    state.enter(Phase::Completed, 0.0)
                } else if pulses_completed % t.pulses_per_rest == 0 {
                    state.enter(Phase::PulseBreak, t.break_secs)
                } else {
                    state.enter(Phase::PulseTick, state.pulse_interval_secs)
                };
                SessionState {
                    pulses_completed,
                    ..next
                }
            }
        }
    }

    /// Jump to the next block boundary rather than the next sub-step.
    pub fn skip_phase(&self, state: &SessionState) -> SessionState {
        let t = &self.timings;
        match state.phase {
            Phase::Idle | Phase::Completed => *state,
            Phase::Countdown => SessionState {
                warmup_a_rep: 1,
                ..state.enter(Phase::WarmupAHold, t.warmup_a_hold_secs)
            },
            Phase::WarmupAHold | Phase::WarmupARest => SessionState {
                warmup_a_rep: state.total_warmup_a_reps,
                ..state.enter(Phase::BreakA, t.break_secs)
            },
            Phase::BreakA => SessionState {
                warmup_b_rep: 1,
                ..state.enter(Phase::WarmupBHold, t.warmup_b_hold_secs)
            },
            Phase::WarmupBHold | Phase::WarmupBRest => SessionState {
                warmup_b_rep: state.total_warmup_b_reps,
                ..state.enter(Phase::BreakB, t.break_secs)
            },
            Phase::BreakB | Phase::PulseBreak => {
                state.enter(Phase::PulseTick, state.pulse_interval_secs)
            }
            Phase::PulseTick => state.enter(Phase::Completed, 0.0),
        }
    }

    /// Force the session to `completed`, keeping counters as they stand.
    pub fn stop(&self, state: &SessionState) -> SessionState {
        state.enter(Phase::Completed, 0.0)
    }

    pub fn set_paused(&self, state: &SessionState, is_paused: bool) -> SessionState {
        SessionState {
            is_paused,
            ..*state
        }
    }
}
