//! Read-only projections of a [`SessionState`] for presentation.

use serde::{Deserialize, Serialize};

use crate::engine::{SessionState, Timings};
use crate::phase::Phase;

/// Semantic grouping used for colouring a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseCategory {
    Exertion,
    Release,
    Break,
    Neutral,
}

pub fn phase_category(phase: Phase) -> PhaseCategory {
    match phase {
        Phase::WarmupAHold | Phase::WarmupBHold | Phase::PulseTick => PhaseCategory::Exertion,
        Phase::WarmupARest | Phase::WarmupBRest => PhaseCategory::Release,
        Phase::BreakA | Phase::BreakB | Phase::PulseBreak => PhaseCategory::Break,
        Phase::Idle | Phase::Countdown | Phase::Completed => PhaseCategory::Neutral,
    }
}

pub fn is_break_phase(phase: Phase) -> bool {
    phase_category(phase) == PhaseCategory::Break
}

/// Position of a phase within the three exercise blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseOrdinal {
    pub block: u8,
    pub total_blocks: u8,
    pub name: &'static str,
}

pub const TOTAL_BLOCKS: u8 = 3;

pub fn phase_ordinal(phase: Phase) -> PhaseOrdinal {
    let (block, name) = match phase {
        Phase::Countdown => (0, "Get Ready"),
        Phase::WarmupAHold | Phase::WarmupARest | Phase::BreakA => (1, "Short Warmup"),
        Phase::WarmupBHold | Phase::WarmupBRest | Phase::BreakB => (2, "Long Warmup"),
        Phase::PulseTick | Phase::PulseBreak => (3, "Fast Pulses"),
        Phase::Idle | Phase::Completed => (0, ""),
    };
    PhaseOrdinal {
        block,
        total_blocks: TOTAL_BLOCKS,
        name,
    }
}

/// Primary and secondary values for the central readout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleDisplay {
    pub big: String,
    pub sub: &'static str,
}

impl CircleDisplay {
    fn new(big: impl ToString, sub: &'static str) -> Self {
        Self {
            big: big.to_string(),
            sub,
        }
    }
}

pub fn circle_display(state: &SessionState) -> CircleDisplay {
    let seconds_left = state.time_remaining.ceil() as u64;
    match state.phase {
        Phase::Idle => CircleDisplay::new("", "Press Enter to start"),
        Phase::Completed => CircleDisplay::new("✓", "Done!"),
        Phase::Countdown => CircleDisplay::new(seconds_left, "Get Ready"),
        Phase::BreakA | Phase::BreakB | Phase::PulseBreak => {
            CircleDisplay::new(seconds_left, "Break")
        }
        Phase::WarmupAHold => CircleDisplay::new(state.warmup_a_rep, "Squeeze"),
        Phase::WarmupBHold => CircleDisplay::new(state.warmup_b_rep, "Hold"),
        Phase::WarmupARest => CircleDisplay::new(state.warmup_a_rep, "Release"),
        Phase::WarmupBRest => CircleDisplay::new(state.warmup_b_rep, "Release"),
        Phase::PulseTick => CircleDisplay::new(state.pulses_completed, "Pulse"),
    }
}

/// Share of the overall progress bar given to each block, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockWeights {
    pub warmup_a: f64,
    pub warmup_b: f64,
    pub pulses: f64,
}

impl Default for BlockWeights {
    fn default() -> Self {
        Self {
            warmup_a: 15.0,
            warmup_b: 15.0,
            pulses: 70.0,
        }
    }
}

impl BlockWeights {
    pub fn total(&self) -> f64 {
        self.warmup_a + self.warmup_b + self.pulses
    }
}

fn fraction(done: u32, target: u32) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (done as f64 / target as f64).min(1.0)
}

/// Weighted progress across the whole session in `[0, 100]`.
///
/// Only finished repetitions count, so the value never drops while ticking.
pub fn overall_progress(state: &SessionState, weights: &BlockWeights) -> f64 {
    let a_done = |rep: u32| fraction(rep.saturating_sub(1), state.total_warmup_a_reps);
    let b_done = |rep: u32| fraction(rep.saturating_sub(1), state.total_warmup_b_reps);
    let pulses = fraction(state.pulses_completed, state.target_pulses);

    let (a, b, p) = match state.phase {
        Phase::Idle | Phase::Countdown => (0.0, 0.0, 0.0),
        Phase::WarmupAHold | Phase::WarmupARest => (a_done(state.warmup_a_rep), 0.0, 0.0),
        Phase::BreakA => (1.0, 0.0, 0.0),
        Phase::WarmupBHold | Phase::WarmupBRest => (1.0, b_done(state.warmup_b_rep), 0.0),
        Phase::BreakB => (1.0, 1.0, 0.0),
        Phase::PulseTick | Phase::PulseBreak => (1.0, 1.0, pulses),
        Phase::Completed => return 100.0,
    };

    (a * weights.warmup_a + b * weights.warmup_b + p * weights.pulses).clamp(0.0, 100.0)
}

fn elapsed_fraction(duration: f64, remaining: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    ((duration - remaining) / duration).clamp(0.0, 1.0)
}

/// Progress through the current phase (or current block for warm-ups), in percent.
pub fn phase_progress(state: &SessionState, timings: &Timings) -> f64 {
    let rep_progress = |rep: u32, total: u32, within: f64| {
        if total == 0 {
            return 100.0;
        }
        ((rep.saturating_sub(1) as f64 + within) / total as f64 * 100.0).clamp(0.0, 100.0)
    };

    match state.phase {
        Phase::Idle => 0.0,
        Phase::Completed => 100.0,
        Phase::Countdown => {
            elapsed_fraction(timings.countdown_secs, state.time_remaining) * 100.0
        }
        Phase::BreakA | Phase::BreakB | Phase::PulseBreak => {
            elapsed_fraction(timings.break_secs, state.time_remaining) * 100.0
        }
        Phase::WarmupAHold => rep_progress(
            state.warmup_a_rep,
            state.total_warmup_a_reps,
            elapsed_fraction(timings.warmup_a_hold_secs, state.time_remaining) * 0.5,
        ),
        Phase::WarmupARest => rep_progress(
            state.warmup_a_rep,
            state.total_warmup_a_reps,
            0.5 + elapsed_fraction(timings.warmup_a_rest_secs, state.time_remaining) * 0.5,
        ),
        Phase::WarmupBHold => rep_progress(
            state.warmup_b_rep,
            state.total_warmup_b_reps,
            elapsed_fraction(timings.warmup_b_hold_secs, state.time_remaining) * 0.5,
        ),
        Phase::WarmupBRest => rep_progress(
            state.warmup_b_rep,
            state.total_warmup_b_reps,
            0.5 + elapsed_fraction(timings.warmup_b_rest_secs, state.time_remaining) * 0.5,
        ),
        Phase::PulseTick => fraction(state.pulses_completed, state.target_pulses) * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PhaseClock;

    fn state(phase: Phase) -> SessionState {
        SessionState {
            phase,
            ..PhaseClock::new(Timings::default()).create(400, 1.5)
        }
    }

    #[test]
    fn every_phase_has_a_category_and_ordinal() {
        for phase in Phase::ALL {
            let ordinal = phase_ordinal(phase);
            assert!(ordinal.block <= 3);
            assert_eq!(ordinal.total_blocks, 3);
            let _ = phase_category(phase);
        }
        assert_eq!(phase_category(Phase::PulseTick), PhaseCategory::Exertion);
        assert_eq!(phase_category(Phase::WarmupBRest), PhaseCategory::Release);
        assert_eq!(phase_category(Phase::Completed), PhaseCategory::Neutral);
    }

    #[test]
    fn ordinal_groups_breaks_with_their_block() {
        assert_eq!(phase_ordinal(Phase::BreakA).block, 1);
        assert_eq!(phase_ordinal(Phase::BreakB).block, 2);
        assert_eq!(phase_ordinal(Phase::PulseBreak).name, "Fast Pulses");
        assert_eq!(phase_ordinal(Phase::Idle).block, 0);
    }

    #[test]
    fn countdown_and_breaks_show_ceiling_seconds() {
        let s = SessionState {
            time_remaining: 2.1,
            ..state(Phase::Countdown)
        };
        assert_eq!(circle_display(&s), CircleDisplay::new("3", "Get Ready"));

        let s = SessionState {
            time_remaining: 29.4,
            ..state(Phase::PulseBreak)
        };
        assert_eq!(circle_display(&s), CircleDisplay::new("30", "Break"));
    }

    #[test]
    fn warmups_show_rep_index() {
        let s = SessionState {
            warmup_a_rep: 7,
            ..state(Phase::WarmupAHold)
        };
        assert_eq!(circle_display(&s), CircleDisplay::new("7", "Squeeze"));
        let s = SessionState {
            warmup_b_rep: 2,
            ..state(Phase::WarmupBRest)
        };
        assert_eq!(circle_display(&s), CircleDisplay::new("2", "Release"));
    }

    #[test]
    fn idle_and_completed_readouts() {
        assert_eq!(circle_display(&state(Phase::Idle)).big, "");
        assert_eq!(circle_display(&state(Phase::Completed)).sub, "Done!");
    }

    #[test]
    fn overall_progress_bounds() {
        let w = BlockWeights::default();
        assert_eq!(overall_progress(&state(Phase::Idle), &w), 0.0);
        assert_eq!(overall_progress(&state(Phase::Completed), &w), 100.0);
        assert_eq!(overall_progress(&state(Phase::BreakB), &w), 30.0);

        let halfway = SessionState {
            pulses_completed: 200,
            ..state(Phase::PulseBreak)
        };
        assert!((overall_progress(&halfway, &w) - 65.0).abs() < 1e-9);
    }

    #[test]
    fn phase_progress_splits_reps_into_hold_and_rest() {
        let t = Timings::default();
        let s = SessionState {
            warmup_a_rep: 1,
            time_remaining: 2.0,
            ..state(Phase::WarmupARest)
        };
        assert!((phase_progress(&s, &t) - 2.5).abs() < 1e-9);
        let s = SessionState {
            time_remaining: 15.0,
            ..state(Phase::BreakA)
        };
        assert!((phase_progress(&s, &t) - 50.0).abs() < 1e-9);
    }
}
