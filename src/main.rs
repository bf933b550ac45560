pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    time::Duration,
};
use chrono::{Local, NaiveDate};
use tracing::warn;

use pulsr::{
    app_dirs::AppDirs,
    badges::{self, Badge},
    config::{Config, ConfigStore, FileConfigStore},
    error::{PulsrError, StoreError},
    logging,
    phase::Phase,
    progress::{self, MAX_SHIELDS, SHIELD_COST, WEEK_DAYS},
    runtime::{spawn_key_reader, Metronome, SessionEvent},
    session::{Command, SessionDriver},
    store::{export_csv, Profile, SqliteStore},
};

/// Recent sessions considered when evaluating badges.
const BADGE_HISTORY_LIMIT: usize = 365;

/// guided pulse-training sessions in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a timed exercise session: a countdown, two warm-up blocks of holds and rests, then a long run of fast pulses with periodic breaks. Finished sessions are saved to a local history that drives points and badges."
)]
pub struct Cli {
    /// number of pulses in the main phase (overrides the weekly target)
    #[clap(short = 't', long)]
    target: Option<u32>,

    /// seconds per pulse (overrides the saved config)
    #[clap(short = 'i', long)]
    interval: Option<f64>,

    /// write the effective target and interval back to the config file
    #[clap(long)]
    save: bool,

    /// path to the config file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// path to the session database
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// more log output (-v info, -vv debug, -vvv trace)
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
enum CliCommand {
    /// list recent sessions, newest first
    History {
        #[clap(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// write the full session history as CSV
    Export { path: PathBuf },
    /// show earned and remaining badges
    Badges,
    /// show the training week, its target and the week calendar
    Progress {
        /// start the next week once seven days have passed, raising the target
        #[clap(long)]
        advance: bool,
    },
    /// show, buy or spend streak shields
    Shield {
        /// buy a shield for 25 points
        #[clap(long, conflicts_with = "cover")]
        buy: bool,

        /// spend a shield on a missed day (YYYY-MM-DD)
        #[clap(long, value_name = "DATE")]
        cover: Option<NaiveDate>,
    },
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn open_store(&self) -> Result<SqliteStore, StoreError> {
        match &self.db {
            Some(path) => SqliteStore::open(path),
            None => SqliteStore::open_default(),
        }
    }

    /// Stored config, with the profile's weekly target and then the command line on top.
    fn effective_config(&self, store: &impl ConfigStore, profile: Option<&Profile>) -> Config {
        let mut config = store.load();
        if let Some(profile) = profile {
            config.target_pulses = profile.current_target;
        }
        if let Some(target) = self.target {
            config.target_pulses = target;
        }
        if let Some(interval) = self.interval {
            config.pulse_interval_secs = interval;
        }
        config
    }
}

pub struct App {
    pub driver: SessionDriver,
    pub store: Option<SqliteStore>,
    pub notice: Option<String>,
    save_attempted: bool,
}

enum KeyAction {
    Session(Command),
    RetrySave,
    Quit,
}

fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(KeyAction::Quit);
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(KeyAction::Quit),
        KeyCode::Enter => Some(KeyAction::Session(Command::Start)),
        KeyCode::Char(' ') | KeyCode::Char('p') => Some(KeyAction::Session(Command::TogglePause)),
        KeyCode::Char('s') => Some(KeyAction::Session(Command::Skip)),
        KeyCode::Char('x') => Some(KeyAction::Session(Command::Stop)),
        KeyCode::Char('r') => Some(KeyAction::Session(Command::Reset)),
        KeyCode::Char('w') => Some(KeyAction::RetrySave),
        _ => None,
    }
}

impl App {
    pub fn new(driver: SessionDriver, store: Option<SqliteStore>) -> Self {
        let notice = store
            .is_none()
            .then(|| "Session history is unavailable; results will not be saved.".to_string());
        Self {
            driver,
            store,
            notice,
            save_attempted: false,
        }
    }

    /// Returns false when the user asked to quit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        match key_action(key) {
            Some(KeyAction::Quit) => return false,
            Some(KeyAction::Session(command)) => {
                if command == Command::Reset || command == Command::Start {
                    self.save_attempted = false;
                    if self.store.is_some() {
                        self.notice = None;
                    }
                }
                self.driver.handle(command);
            }
            Some(KeyAction::RetrySave) => {
                if self.driver.state().phase == Phase::Completed && !self.driver.is_saved() {
                    self.save_attempted = false;
                }
            }
            None => {}
        }
        true
    }

    fn after_event(&mut self) {
        if self.driver.state().phase == Phase::Completed && !self.save_attempted {
            self.save_attempted = true;
            self.save_result();
        }
    }

    fn save_result(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };

        let profile = match self.driver.persist(store) {
            Ok(Some(profile)) => profile,
            Ok(None) => return,
            Err(e) => {
                self.notice = Some(format!("Saving failed: {e}. Press w to retry."));
                return;
            }
        };

        let points = self
            .driver
            .completion_record()
            .map(|r| r.points_earned)
            .unwrap_or_default();
        let mut notice = format!("+{points} points · {} total", profile.total_points);

        match unlock_new_badges(store, &profile) {
            Ok(unlocked) if !unlocked.is_empty() => {
                notice.push_str(&format!(" · Unlocked: {}", badge_names(&unlocked)));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to update badges"),
        }
        if progress::week_is_complete(&profile, Local::now().date_naive()) {
            notice.push_str(" · Week complete: run `pulsr progress --advance`");
        }
        self.notice = Some(notice);
    }
}

/// Evaluate badges against `profile` and recent history, storing any new unlocks.
fn unlock_new_badges(
    store: &SqliteStore,
    profile: &Profile,
) -> Result<Vec<&'static Badge>, StoreError> {
    let history = store.recent_exercises(BADGE_HISTORY_LIMIT)?;
    let unlocked = badges::newly_unlocked(profile, &history);
    if !unlocked.is_empty() {
        let ids: Vec<&str> = unlocked.iter().map(|b| b.id).collect();
        store.unlock_badges(&ids)?;
    }
    Ok(unlocked)
}

fn badge_names(unlocked: &[&Badge]) -> String {
    unlocked.iter().map(|b| b.name).collect::<Vec<_>>().join(", ")
}

fn print_unlocked(unlocked: &[&Badge]) {
    if !unlocked.is_empty() {
        println!("unlocked: {}", badge_names(unlocked));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(command) => {
            logging::init_stderr(cli.verbose);
            if let Err(e) = run_command(&cli, command) {
                eprintln!("pulsr: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        None => run_session(&cli),
    }
}

fn run_command(cli: &Cli, command: &CliCommand) -> Result<(), PulsrError> {
    let mut store = cli.open_store()?;
    match command {
        CliCommand::History { limit } => {
            let records = store.recent_exercises(*limit)?;
            if records.is_empty() {
                println!("no sessions yet");
            }
            for r in records {
                println!(
                    "{}  {:>5}/{:<5} pulses  +{} pts  {}",
                    r.start_time.format("%Y-%m-%d %H:%M"),
                    r.pulses_completed,
                    r.target_pulses,
                    r.points_earned,
                    if r.completed {
                        "done"
                    } else if r.shield_used {
                        "shield"
                    } else {
                        "stopped"
                    }
                );
            }
        }
        CliCommand::Export { path } => {
            let records = store.recent_exercises(usize::MAX)?;
            export_csv(&records, File::create(path)?)?;
            println!("exported {} sessions to {}", records.len(), path.display());
        }
        CliCommand::Badges => {
            let profile = store.profile()?;
            println!(
                "{} pulses · {} points",
                profile.total_pulses, profile.total_points
            );
            for badge in badges::BADGES {
                let mark = if profile.unlocked_badges.iter().any(|id| id == badge.id) {
                    "[x]"
                } else {
                    "[ ]"
                };
                println!("{mark} {:<16} {}", badge.name, badge.description);
            }
        }
        CliCommand::Progress { advance } => {
            let today = Local::now().date_naive();
            let mut profile = store.profile()?;
            if *advance {
                profile = store.advance_week(today)?;
                println!(
                    "week {} started · target {} pulses",
                    profile.current_week, profile.current_target
                );
                print_unlocked(&unlock_new_badges(&store, &profile)?);
            }

            println!(
                "week {} · target {} pulses",
                profile.current_week, profile.current_target
            );
            let week_end = profile.week_start_date + chrono::Duration::days(WEEK_DAYS - 1);
            let history = store.exercises_between(profile.week_start_date, week_end)?;
            let calendar = progress::week_calendar(profile.week_start_date, today, &history);
            let labels: Vec<String> = calendar
                .iter()
                .map(|d| format!("{} {}", d.date.format("%a"), d.status.symbol()))
                .collect();
            println!("{}", labels.join("  "));

            if progress::week_is_complete(&profile, today) {
                println!("week complete: `pulsr progress --advance` raises the target");
            } else if profile.current_target >= progress::MAX_TARGET {
                println!("target is at its maximum");
            } else {
                let day = progress::days_into_week(&profile, today).clamp(0, WEEK_DAYS - 1) + 1;
                println!("day {day} of {WEEK_DAYS}");
            }
        }
        CliCommand::Shield { buy, cover } => {
            let mut profile = store.profile()?;
            if *buy {
                profile = store.buy_shield()?;
                println!("bought a shield for {SHIELD_COST} points");
                print_unlocked(&unlock_new_badges(&store, &profile)?);
            } else if let Some(date) = cover {
                profile = store.use_shield(*date, Local::now())?;
                println!("{date} is covered");
            }
            println!(
                "shields {}/{MAX_SHIELDS} · {} points (a shield costs {SHIELD_COST})",
                profile.shields_owned, profile.total_points
            );
        }
    }
    Ok(())
}

fn run_session(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(log_path) = AppDirs::log_path() {
        logging::init_file(cli.verbose, &log_path)?;
    }

    let store = match cli.open_store() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "session history unavailable");
            None
        }
    };
    let profile = store.as_ref().and_then(|s| match s.profile() {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!(error = %e, "profile unavailable, using the configured target");
            None
        }
    });

    let config_store = cli.config_store();
    let config = cli.effective_config(&config_store, profile.as_ref());
    config.validate()?;
    if cli.save {
        config_store.save(&config)?;
    }

    let (tx, rx) = mpsc::channel();
    let metronome = Metronome::new(tx.clone(), Duration::from_millis(config.timings.tick_ms));
    let driver = SessionDriver::new(config, metronome)?;
    spawn_key_reader(tx);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(driver, store);
    let result = start_tui(&mut terminal, &mut app, &rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &Receiver<SessionEvent>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match events.recv()? {
            SessionEvent::Tick => app.driver.on_tick(),
            SessionEvent::Resize => {}
            SessionEvent::Key(key) => {
                if !app.on_key(key) {
                    break;
                }
            }
        }
        app.after_event();
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
