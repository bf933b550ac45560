use serde::{Deserialize, Serialize};

/// One stage of an exercise session.
///
/// The `Display` form matches the identifiers used in logs and exported data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "countdown")]
    Countdown,
    #[strum(serialize = "warmupA_hold")]
    WarmupAHold,
    #[strum(serialize = "warmupA_rest")]
    WarmupARest,
    #[strum(serialize = "breakA")]
    BreakA,
    #[strum(serialize = "warmupB_hold")]
    WarmupBHold,
    #[strum(serialize = "warmupB_rest")]
    WarmupBRest,
    #[strum(serialize = "breakB")]
    BreakB,
    #[strum(serialize = "pulse_tick")]
    PulseTick,
    #[strum(serialize = "pulse_break")]
    PulseBreak,
    #[strum(serialize = "completed")]
    Completed,
}

impl Phase {
    pub const ALL: [Phase; 11] = [
        Phase::Idle,
        Phase::Countdown,
        Phase::WarmupAHold,
        Phase::WarmupARest,
        Phase::BreakA,
        Phase::WarmupBHold,
        Phase::WarmupBRest,
        Phase::BreakB,
        Phase::PulseTick,
        Phase::PulseBreak,
        Phase::Completed,
    ];

    /// Idle and completed never advance on a tick.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Idle | Phase::Completed)
    }

    pub fn is_break(self) -> bool {
        match self {
            Phase::BreakA | Phase::BreakB | Phase::PulseBreak => true,
            Phase::Idle
            | Phase::Countdown
            | Phase::WarmupAHold
            | Phase::WarmupARest
            | Phase::WarmupBHold
            | Phase::WarmupBRest
            | Phase::PulseTick
            | Phase::Completed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_log_identifiers() {
        assert_eq!(Phase::WarmupAHold.to_string(), "warmupA_hold");
        assert_eq!(Phase::BreakB.to_string(), "breakB");
        assert_eq!(Phase::PulseTick.to_string(), "pulse_tick");
    }

    #[test]
    fn only_idle_and_completed_are_terminal() {
        let terminal: Vec<Phase> = Phase::ALL.into_iter().filter(|p| p.is_terminal()).collect();
        assert_eq!(terminal, vec![Phase::Idle, Phase::Completed]);
    }

    #[test]
    fn three_break_phases() {
        assert_eq!(Phase::ALL.iter().filter(|p| p.is_break()).count(), 3);
    }
}
