use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::progress::{self, STARTING_TARGET};

/// Pulses needed to earn one point.
pub const PULSES_PER_POINT: u32 = 100;

pub fn points_for(pulses_completed: u32) -> u32 {
    pulses_completed / PULSES_PER_POINT
}

/// Result of one finished session, or a day covered by a shield
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRecord {
    pub date: NaiveDate,
    pub completed: bool,
    pub pulses_completed: u32,
    pub target_pulses: u32,
    pub points_earned: u32,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub shield_used: bool,
}

impl ExerciseRecord {
    pub fn new(
        pulses_completed: u32,
        target_pulses: u32,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
    ) -> Self {
        Self {
            date: start_time.date_naive(),
            completed: pulses_completed >= target_pulses,
            pulses_completed,
            target_pulses,
            points_earned: points_for(pulses_completed),
            start_time,
            end_time,
            shield_used: false,
        }
    }

    /// Placeholder for a missed `date`, protected by a shield spent at `at`.
    pub fn shielded(date: NaiveDate, at: DateTime<Local>) -> Self {
        Self {
            date,
            completed: false,
            pulses_completed: 0,
            target_pulses: 0,
            points_earned: 0,
            start_time: at,
            end_time: at,
            shield_used: true,
        }
    }
}

/// Cumulative counters and weekly progression state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub total_points: u64,
    pub total_pulses: u64,
    /// Session target for the current week.
    pub current_target: u32,
    pub current_week: u32,
    pub week_start_date: NaiveDate,
    pub shields_owned: u32,
    /// Days that were covered by a shield, oldest first.
    pub shields_used: Vec<NaiveDate>,
    pub unlocked_badges: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            total_points: 0,
            total_pulses: 0,
            current_target: STARTING_TARGET,
            current_week: 1,
            week_start_date: NaiveDate::default(),
            shields_owned: 0,
            shields_used: Vec::new(),
            unlocked_badges: Vec::new(),
        }
    }
}

/// Durable home for finished sessions
pub trait SessionStore {
    /// Record one session and bump the profile counters, returning the updated profile.
    fn record_session(&mut self, record: &ExerciseRecord) -> Result<Profile, StoreError>;
}

/// SQLite-backed session history
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

const EXERCISE_COLUMNS: &str =
    "date, completed, pulses_completed, target_pulses, points_earned, start_time, end_time, shield_used";

fn invalid_text(idx: usize, what: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, what.to_string(), rusqlite::types::Type::Text)
}

fn parse_date(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    raw.parse().map_err(|_| invalid_text(idx, "date"))
}

fn parse_time(idx: usize, raw: String) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Local))
        .map_err(|_| invalid_text(idx, "timestamp"))
}

/// Maps a row selected with [`EXERCISE_COLUMNS`].
fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<ExerciseRecord> {
    Ok(ExerciseRecord {
        date: parse_date(0, row.get(0)?)?,
        completed: row.get(1)?,
        pulses_completed: row.get(2)?,
        target_pulses: row.get(3)?,
        points_earned: row.get(4)?,
        start_time: parse_time(5, row.get(5)?)?,
        end_time: parse_time(6, row.get(6)?)?,
        shield_used: row.get(7)?,
    })
}

fn insert_exercise(conn: &Connection, record: &ExerciseRecord) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO exercises ({EXERCISE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            record.date.to_string(),
            record.completed,
            record.pulses_completed,
            record.target_pulses,
            record.points_earned,
            record.start_time.to_rfc3339(),
            record.end_time.to_rfc3339(),
            record.shield_used,
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Open the store at the default state directory location
    pub fn open_default() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| "pulsr_sessions.db".into());
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                completed BOOLEAN NOT NULL,
                pulses_completed INTEGER NOT NULL,
                target_pulses INTEGER NOT NULL,
                points_earned INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                shield_used BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_exercises_date ON exercises(date);
            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_points INTEGER NOT NULL DEFAULT 0,
                total_pulses INTEGER NOT NULL DEFAULT 0,
                current_target INTEGER NOT NULL,
                current_week INTEGER NOT NULL DEFAULT 1,
                week_start_date TEXT NOT NULL,
                shields_owned INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS badges (
                id TEXT PRIMARY KEY,
                unlocked_at TEXT NOT NULL
            );
            "#,
        )?;
        // the first week starts the day the profile is created
        conn.execute(
            "INSERT OR IGNORE INTO profile (id, current_target, week_start_date) VALUES (1, ?1, ?2)",
            params![STARTING_TARGET, Local::now().date_naive().to_string()],
        )?;
        Ok(Self { conn })
    }

    pub fn profile(&self) -> Result<Profile, StoreError> {
        let mut profile = self.conn.query_row(
            r#"
            SELECT total_points, total_pulses, current_target, current_week, week_start_date, shields_owned
            FROM profile WHERE id = 1
            "#,
            [],
            |row| {
                Ok(Profile {
                    total_points: row.get::<_, i64>(0)?.max(0) as u64,
                    total_pulses: row.get::<_, i64>(1)?.max(0) as u64,
                    current_target: row.get(2)?,
                    current_week: row.get(3)?,
                    week_start_date: parse_date(4, row.get(4)?)?,
                    shields_owned: row.get(5)?,
                    ..Profile::default()
                })
            },
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT date FROM exercises WHERE shield_used = 1 ORDER BY date")?;
        profile.shields_used = stmt
            .query_map([], |row| parse_date(0, row.get(0)?))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT id FROM badges ORDER BY unlocked_at, id")?;
        profile.unlocked_badges = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(profile)
    }

    /// Most recent sessions first
    pub fn recent_exercises(&self, limit: usize) -> Result<Vec<ExerciseRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY start_time DESC, id DESC LIMIT ?1"
        ))?;

        // sqlite treats a negative limit as unbounded
        let limit = i64::try_from(limit).unwrap_or(-1);
        let rows = stmt.query_map([limit], exercise_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Records dated within `from..=to`, oldest first
    pub fn exercises_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExerciseRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE date BETWEEN ?1 AND ?2 ORDER BY date, id"
        ))?;
        let rows = stmt.query_map(
            params![from.to_string(), to.to_string()],
            exercise_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Mark badges as unlocked; already-unlocked ids are left alone
    pub fn unlock_badges(&self, ids: &[&str]) -> Result<(), StoreError> {
        let now = Local::now().to_rfc3339();
        for id in ids {
            self.conn.execute(
                "INSERT OR IGNORE INTO badges (id, unlocked_at) VALUES (?1, ?2)",
                params![id, now],
            )?;
        }
        Ok(())
    }

    /// Spend points on a shield.
    pub fn buy_shield(&mut self) -> Result<Profile, StoreError> {
        progress::check_shield_purchase(&self.profile()?)?;
        self.conn.execute(
            "UPDATE profile SET total_points = total_points - ?1, shields_owned = shields_owned + 1 WHERE id = 1",
            params![progress::SHIELD_COST as i64],
        )?;
        self.profile()
    }

    /// Spend a shield to cover `date`, recording it in the history.
    pub fn use_shield(&mut self, date: NaiveDate, now: DateTime<Local>) -> Result<Profile, StoreError> {
        let profile = self.profile()?;
        let on_day = self.exercises_between(date, date)?;
        progress::check_shield_use(&profile, &on_day, date, now.date_naive())?;

        let tx = self.conn.transaction()?;
        insert_exercise(&tx, &ExerciseRecord::shielded(date, now))?;
        tx.execute(
            "UPDATE profile SET shields_owned = shields_owned - 1 WHERE id = 1",
            [],
        )?;
        tx.commit()?;
        self.profile()
    }

    /// Close the current week and raise the session target.
    pub fn advance_week(&mut self, today: NaiveDate) -> Result<Profile, StoreError> {
        let next = progress::next_week(&self.profile()?, today)?;
        self.conn.execute(
            "UPDATE profile SET current_week = ?1, current_target = ?2, week_start_date = ?3 WHERE id = 1",
            params![next.week, next.target, next.start.to_string()],
        )?;
        self.profile()
    }
}

impl SessionStore for SqliteStore {
    fn record_session(&mut self, record: &ExerciseRecord) -> Result<Profile, StoreError> {
        let tx = self.conn.transaction()?;
        insert_exercise(&tx, record)?;
        tx.execute(
            "UPDATE profile SET total_points = total_points + ?1, total_pulses = total_pulses + ?2 WHERE id = 1",
            params![record.points_earned, record.pulses_completed],
        )?;
        tx.commit()?;

        self.profile()
    }
}

/// Write session history as CSV with a header row
pub fn export_csv<W: Write>(records: &[ExerciseRecord], writer: W) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
