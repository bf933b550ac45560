//! Achievement rules evaluated over the profile and session history.

use chrono::{Duration, NaiveDate, Timelike};
use itertools::Itertools;

use crate::store::{ExerciseRecord, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    FirstCompletion,
    TotalPulses(u64),
    StartedBefore(u32),
    StartedFrom(u32),
    Streak(usize),
    ReachedTarget(u32),
    ShieldBearer,
    TotalPoints(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    rule: Rule,
}

pub const BADGES: &[Badge] = &[
    Badge {
        id: "first_steps",
        name: "First Steps",
        description: "Complete your first exercise",
        rule: Rule::FirstCompletion,
    },
    Badge {
        id: "pulse_500",
        name: "500 Club",
        description: "Complete 500 total pulses",
        rule: Rule::TotalPulses(500),
    },
    Badge {
        id: "pulse_1000",
        name: "1K Pulser",
        description: "Complete 1,000 total pulses",
        rule: Rule::TotalPulses(1000),
    },
    Badge {
        id: "pulse_1500",
        name: "Power House",
        description: "Complete 1,500 total pulses",
        rule: Rule::TotalPulses(1500),
    },
    Badge {
        id: "pulse_2000",
        name: "Legendary",
        description: "Complete 2,000 total pulses",
        rule: Rule::TotalPulses(2000),
    },
    Badge {
        id: "early_bird",
        name: "Early Bird",
        description: "Complete an exercise before 7 AM",
        rule: Rule::StartedBefore(7),
    },
    Badge {
        id: "night_owl",
        name: "Night Owl",
        description: "Complete an exercise after 11 PM",
        rule: Rule::StartedFrom(23),
    },
    Badge {
        id: "streak_7",
        name: "Week Warrior",
        description: "Complete 7 consecutive days",
        rule: Rule::Streak(7),
    },
    Badge {
        id: "streak_30",
        name: "Monthly Master",
        description: "Complete 30 consecutive days",
        rule: Rule::Streak(30),
    },
    Badge {
        id: "peak_performance",
        name: "Peak Performance",
        description: "Reach the 2000 pulse target",
        rule: Rule::ReachedTarget(2000),
    },
    Badge {
        id: "shield_buyer",
        name: "Shield Bearer",
        description: "Purchase your first shield",
        rule: Rule::ShieldBearer,
    },
    Badge {
        id: "points_100",
        name: "Century",
        description: "Earn 100 total points",
        rule: Rule::TotalPoints(100),
    },
];

pub fn find(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|b| b.id == id)
}

impl Badge {
    pub fn is_earned(&self, profile: &Profile, history: &[ExerciseRecord]) -> bool {
        let mut completed = history.iter().filter(|e| e.completed);
        match self.rule {
            Rule::FirstCompletion => completed.next().is_some(),
            Rule::TotalPulses(n) => profile.total_pulses >= n,
            Rule::StartedBefore(hour) => completed.any(|e| e.start_time.hour() < hour),
            Rule::StartedFrom(hour) => completed.any(|e| e.start_time.hour() >= hour),
            Rule::Streak(days) => longest_streak(history) >= days,
            Rule::ReachedTarget(n) => profile.current_target >= n,
            Rule::ShieldBearer => profile.shields_owned > 0 || !profile.shields_used.is_empty(),
            Rule::TotalPoints(n) => profile.total_points >= n,
        }
    }
}

/// Longest run of consecutive calendar days with a completed session.
pub fn longest_streak(history: &[ExerciseRecord]) -> usize {
    let dates: Vec<NaiveDate> = history
        .iter()
        .filter(|e| e.completed)
        .map(|e| e.date)
        .sorted()
        .dedup()
        .collect();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for date in dates {
        run = match prev {
            Some(p) if date - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }
    best
}

/// Badges whose condition now holds but that the profile has not unlocked yet.
pub fn newly_unlocked(profile: &Profile, history: &[ExerciseRecord]) -> Vec<&'static Badge> {
    BADGES
        .iter()
        .filter(|b| !profile.unlocked_badges.iter().any(|id| id == b.id))
        .filter(|b| b.is_earned(profile, history))
        .collect()
}
