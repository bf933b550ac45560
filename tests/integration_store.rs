use assert_matches::assert_matches;
use chrono::{Duration, Local};
use tempfile::tempdir;

use pulsr::badges;
use pulsr::config::{Config, ConfigStore, FileConfigStore};
use pulsr::engine::Timings;
use pulsr::error::StoreError;
use pulsr::phase::Phase;
use pulsr::progress::{self, DayStatus};
use pulsr::runtime::ManualTicks;
use pulsr::session::SessionDriver;
use pulsr::store::{export_csv, SessionStore, SqliteStore};

/// Session persistence workflows: driver -> store -> badges, across reopen.

fn quick_config(target_pulses: u32) -> Config {
    Config {
        target_pulses,
        pulse_interval_secs: 0.1,
        timings: Timings {
            countdown_secs: 0.1,
            warmup_a_hold_secs: 0.1,
            warmup_a_rest_secs: 0.1,
            warmup_a_reps: 1,
            warmup_b_hold_secs: 0.1,
            warmup_b_rest_secs: 0.1,
            warmup_b_reps: 1,
            break_secs: 0.1,
            pulses_per_rest: 200,
            tick_ms: 100,
        },
        ..Config::default()
    }
}

fn finished_driver(target_pulses: u32) -> SessionDriver<ManualTicks> {
    let mut driver = SessionDriver::new(quick_config(target_pulses), ManualTicks::default()).unwrap();
    driver.start();
    while driver.state().phase != Phase::Completed {
        driver.on_tick();
    }
    driver
}

#[test]
fn completed_session_updates_profile_and_unlocks_badges() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("state").join("sessions.db");
    let mut store = SqliteStore::open(&db).unwrap();

    let mut driver = finished_driver(550);
    let profile = driver.persist(&mut store).unwrap().unwrap();
    assert_eq!(profile.total_pulses, 550);
    assert_eq!(profile.total_points, 5);

    let history = store.recent_exercises(100).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].completed);

    let unlocked: Vec<&str> = badges::newly_unlocked(&profile, &history)
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert!(unlocked.contains(&"first_steps"));
    assert!(unlocked.contains(&"pulse_500"));
    assert!(!unlocked.contains(&"pulse_1000"));
    store.unlock_badges(&unlocked).unwrap();

    drop(store);
    let reopened = SqliteStore::open(&db).unwrap();
    let profile = reopened.profile().unwrap();
    assert_eq!(profile.total_pulses, 550);
    assert!(badges::newly_unlocked(&profile, &reopened.recent_exercises(100).unwrap())
        .iter()
        .all(|b| b.id != "first_steps"));
}

#[test]
fn saving_twice_does_not_double_count() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut driver = finished_driver(120);
    assert!(driver.persist(&mut store).unwrap().is_some());
    assert!(driver.persist(&mut store).unwrap().is_none());
    assert_eq!(store.profile().unwrap().total_pulses, 120);
}

#[test]
fn stopped_session_is_recorded_as_incomplete() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut driver = SessionDriver::new(quick_config(300), ManualTicks::default()).unwrap();
    driver.start();
    while driver.state().pulses_completed < 150 {
        driver.on_tick();
    }
    driver.stop();
    driver.persist(&mut store).unwrap();

    let record = &store.recent_exercises(1).unwrap()[0];
    assert!(!record.completed);
    assert_eq!(record.pulses_completed, 150);
    assert_eq!(record.points_earned, 1);
    assert!(badges::newly_unlocked(&store.profile().unwrap(), &[record.clone()]).is_empty());
}

#[test]
fn persisting_an_unfinished_session_is_an_error() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut driver = SessionDriver::new(quick_config(10), ManualTicks::default()).unwrap();
    assert_matches!(driver.persist(&mut store), Err(StoreError::NotCompleted));
    assert!(store.record_session(&finished_driver(10).completion_record().unwrap()).is_ok());
}

#[test]
fn history_exports_to_csv_file() {
    let dir = tempdir().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    for target in [100, 200] {
        finished_driver(target).persist(&mut store).unwrap();
    }

    let path = dir.path().join("history.csv");
    let records = store.recent_exercises(usize::MAX).unwrap();
    export_csv(&records, std::fs::File::create(&path).unwrap()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("date,completed,pulses_completed"));
}

#[test]
fn saved_config_drives_a_new_session() {
    let dir = tempdir().unwrap();
    let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
    store.save(&quick_config(42)).unwrap();

    let driver = SessionDriver::new(store.load(), ManualTicks::default()).unwrap();
    assert_eq!(driver.state().target_pulses, 42);
    assert_eq!(driver.state().total_warmup_a_reps, 1);
}

#[test]
fn shielded_day_and_finished_session_show_in_the_calendar() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    finished_driver(2500).persist(&mut store).unwrap();
    store.buy_shield().unwrap();

    let today = Local::now().date_naive();
    let yesterday = today - Duration::days(1);
    let profile = store.use_shield(yesterday, Local::now()).unwrap();
    assert_eq!(profile.shields_used, vec![yesterday]);
    assert!(badges::newly_unlocked(&profile, &[])
        .iter()
        .any(|b| b.id == "shield_buyer"));

    let history = store
        .exercises_between(yesterday, yesterday + Duration::days(6))
        .unwrap();
    let statuses: Vec<DayStatus> = progress::week_calendar(yesterday, today, &history)
        .into_iter()
        .map(|d| d.status)
        .collect();
    assert_eq!(&statuses[..3], &[DayStatus::Shielded, DayStatus::Done, DayStatus::Future]);
}

#[test]
fn advanced_week_sets_the_next_session_target() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let start = store.profile().unwrap().week_start_date;
    let profile = store.advance_week(start + Duration::days(9)).unwrap();

    let config = Config {
        target_pulses: profile.current_target,
        ..quick_config(1)
    };
    let driver = SessionDriver::new(config, ManualTicks::default()).unwrap();
    assert_eq!(driver.state().target_pulses, 600);
    assert_eq!(profile.current_week, 2);
}
