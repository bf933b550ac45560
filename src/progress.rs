//! Weekly target progression, streak shields and the week calendar.
//!
//! Everything here is a pure decision over the profile and history; the
//! store applies the outcome.

use chrono::{Duration, NaiveDate};

use crate::error::ProgressError;
use crate::store::{ExerciseRecord, Profile};

/// Session target for a brand-new profile.
pub const STARTING_TARGET: u32 = 400;
/// Added to the target each time a week is completed.
pub const TARGET_STEP: u32 = 200;
pub const MAX_TARGET: u32 = 2000;
pub const WEEK_DAYS: i64 = 7;

pub const SHIELD_COST: u64 = 25;
pub const MAX_SHIELDS: u32 = 2;

/// Whole days since the current training week began.
pub fn days_into_week(profile: &Profile, today: NaiveDate) -> i64 {
    (today - profile.week_start_date).num_days()
}

/// A week can be closed once seven days have passed and the target can still grow.
pub fn week_is_complete(profile: &Profile, today: NaiveDate) -> bool {
    days_into_week(profile, today) >= WEEK_DAYS && profile.current_target < MAX_TARGET
}

/// Profile fields after moving on to the next training week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekAdvance {
    pub week: u32,
    pub target: u32,
    pub start: NaiveDate,
}

pub fn next_week(profile: &Profile, today: NaiveDate) -> Result<WeekAdvance, ProgressError> {
    if profile.current_target >= MAX_TARGET {
        return Err(ProgressError::TargetAtMaximum(MAX_TARGET));
    }
    let days = days_into_week(profile, today);
    if days < WEEK_DAYS {
        return Err(ProgressError::WeekNotOver(WEEK_DAYS - days));
    }
    Ok(WeekAdvance {
        week: profile.current_week + 1,
        target: (profile.current_target + TARGET_STEP).min(MAX_TARGET),
        start: today,
    })
}

pub fn check_shield_purchase(profile: &Profile) -> Result<(), ProgressError> {
    if profile.shields_owned >= MAX_SHIELDS {
        return Err(ProgressError::ShieldLimit(MAX_SHIELDS));
    }
    if profile.total_points < SHIELD_COST {
        return Err(ProgressError::NotEnoughPoints {
            have: profile.total_points,
            cost: SHIELD_COST,
        });
    }
    Ok(())
}

/// A shield may cover a past or current day that has no completed session
/// and no shield yet. `day_records` are the sessions recorded for `date`.
pub fn check_shield_use(
    profile: &Profile,
    day_records: &[ExerciseRecord],
    date: NaiveDate,
    today: NaiveDate,
) -> Result<(), ProgressError> {
    if profile.shields_owned == 0 {
        return Err(ProgressError::NoShields);
    }
    if date > today {
        return Err(ProgressError::FutureDay(date));
    }
    if day_records.iter().any(|r| r.completed || r.shield_used) {
        return Err(ProgressError::DayCovered(date));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Done,
    Shielded,
    Today,
    Missed,
    Future,
}

impl DayStatus {
    pub fn symbol(self) -> &'static str {
        match self {
            DayStatus::Done => "✓",
            DayStatus::Shielded => "◆",
            DayStatus::Today => "-",
            DayStatus::Missed => "✗",
            DayStatus::Future => "·",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: DayStatus,
}

/// The seven days of the week starting at `week_start`.
///
/// A completed session wins over a shield; a past day with neither is
/// missed, whether or not a stopped session was recorded on it.
pub fn week_calendar(
    week_start: NaiveDate,
    today: NaiveDate,
    history: &[ExerciseRecord],
) -> Vec<CalendarDay> {
    (0..WEEK_DAYS)
        .map(|offset| {
            let date = week_start + Duration::days(offset);
            let on_day = || history.iter().filter(move |r| r.date == date);
            let status = if on_day().any(|r| r.completed) {
                DayStatus::Done
            } else if on_day().any(|r| r.shield_used) {
                DayStatus::Shielded
            } else if date == today {
                DayStatus::Today
            } else if date < today {
                DayStatus::Missed
            } else {
                DayStatus::Future
            };
            CalendarDay { date, status }
        })
        .collect()
}
