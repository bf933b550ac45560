use std::time::Duration;

use chrono::{DateTime, Utc};

/// Wall-clock time spent in active session phases.
///
/// Readings come from the system clock rather than a monotonic one, so time
/// the host spends suspended mid-session still counts. Elapsed time is
/// recomputed from the moment the current run resumed, never accumulated
/// tick by tick. A clock that steps backwards contributes nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stopwatch {
    banked: Duration,
    resumed_at: Option<DateTime<Utc>>,
}

fn span(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    pub fn resume_at(&mut self, now: DateTime<Utc>) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(now);
        }
    }

    pub fn pause_at(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.resumed_at.take() {
            self.banked += span(since, now);
        }
    }

    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        match self.resumed_at {
            Some(since) => self.banked + span(since, now),
            None => self.banked,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Utc::now())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// `m:ss` rendering of whole elapsed seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
