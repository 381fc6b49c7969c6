mod session_view;
mod ui;

use crate::session_view::SessionView;
use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use spotter::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    history::{CompletedSession, HistoryDb},
    logging,
    program::{Program, ProgramDay, STARTER_PROGRAM},
    progress,
    resume::{MountId, ResumeController, ResumeDecision, ScreenRole},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotWriter},
    store::{SessionStore, SetOutcome},
    WorkoutSession,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
};
use time_humanize::{Accuracy, HumanTime, Tense};
use tracing::{debug, info, warn};

/// terminal workout runner with rest timers and resumable sessions
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs one workout session at a time: tracks completed sets, counts down rest between sets, and picks up where you left off after closing the session view or restarting."
)]
pub struct Cli {
    /// program file (json) to use instead of the built-in starter program
    #[clap(short = 'p', long)]
    program: Option<PathBuf>,

    /// start this program day immediately
    #[clap(short = 'd', long)]
    day: Option<u32>,

    /// rest countdown re-sampling interval in milliseconds
    #[clap(long)]
    tick_ms: Option<u64>,

    /// keep the session in memory only; nothing survives a restart
    #[clap(long)]
    no_persist: bool,

    /// print finished sessions and exit
    #[clap(long)]
    history: bool,

    /// delete all finished-session history and exit
    #[clap(long, conflicts_with = "history")]
    clear_history: bool,
}

/// Top-level screens. The full session view is an overlay on top of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    /// Day picker; owns starting a session
    Today,
    /// Exercise list of the selected day
    Day,
    History,
}

impl AppState {
    fn role(self) -> ScreenRole {
        match self {
            AppState::Today => ScreenRole::Selection,
            AppState::Day => ScreenRole::ExerciseList,
            AppState::History => ScreenRole::Other,
        }
    }
}

pub struct App {
    pub program: Program,
    pub store: SessionStore,
    pub resume: ResumeController,
    pub history: Option<HistoryDb>,
    pub config: Config,
    pub state: AppState,
    pub selected_day: usize,
    pub day_mount: Option<MountId>,
    pub session_view: Option<SessionView>,
    pub recent: Vec<CompletedSession>,
    pub notice: Option<String>,
}

impl App {
    pub fn new(
        program: Program,
        store: SessionStore,
        resume: ResumeController,
        history: Option<HistoryDb>,
        config: Config,
    ) -> Self {
        Self {
            program,
            store,
            resume,
            history,
            config,
            state: AppState::Today,
            selected_day: 0,
            day_mount: None,
            session_view: None,
            recent: Vec::new(),
            notice: None,
        }
    }

    pub fn role(&self) -> ScreenRole {
        if self.session_view.is_some() {
            ScreenRole::Session
        } else {
            self.state.role()
        }
    }

    pub fn selected(&self) -> Option<&ProgramDay> {
        self.program.days.get(self.selected_day)
    }

    /// Bring back a persisted session for the day it was started from.
    pub fn rehydrate(&mut self) -> bool {
        let Some(snapshot) = self.resume.persisted() else {
            return false;
        };
        let Some(day) = self.program.day_for_snapshot(&snapshot) else {
            info!("persisted session belongs to another program; leaving it alone");
            return false;
        };
        let exercises = day.exercises.clone();
        let restored = self.resume.rehydrate(&mut self.store, &exercises);
        if let Some(index) = self.program.days.iter().position(|d| d.day_number == day.day_number) {
            if restored {
                self.selected_day = index;
            }
        }
        restored
    }

    pub fn open_session_view(&mut self) {
        if self.store.has_active_session() && self.session_view.is_none() {
            self.session_view = Some(SessionView::mount(&self.store));
        }
    }

    pub fn close_session_view(&mut self) {
        self.session_view = None;
    }

    pub fn start_selected_day(&mut self) {
        let Some(day) = self.selected() else { return };
        let exercises = day.session_exercises();
        let source = self.program.source_for(day);
        if self.store.start_session(exercises, source) {
            self.notice = None;
            self.open_session_view();
        }
    }

    /// Whether the live session was started from the selected day
    pub fn selected_day_is_live(&self) -> bool {
        let (Some(session), Some(day)) = (self.store.session(), self.selected()) else {
            return false;
        };
        session.source.program_id.as_deref() == Some(self.program.id.as_str())
            && session.source.day_number == Some(day.day_number)
    }

    pub fn set_state(&mut self, state: AppState) {
        if let Some(mount) = self.day_mount.take() {
            self.resume.unmount(mount);
        }
        self.state = state;
        debug!(screen = %state, role = %state.role(), "screen changed");
        match state {
            AppState::Day => self.mount_day(),
            AppState::History => self.refresh_history(),
            AppState::Today => {}
        }
    }

    fn mount_day(&mut self) {
        let mount = self.resume.mount();
        self.day_mount = Some(mount);
        let exercises = self.selected().map(|d| d.exercises.clone()).unwrap_or_default();
        if let Some(ResumeDecision::AutoReopen) = self.resume.reconcile(mount, &exercises, &mut self.store) {
            self.open_session_view();
        }
    }

    fn refresh_history(&mut self) {
        if let Some(db) = &self.history {
            match db.recent(20) {
                Ok(entries) => self.recent = entries,
                Err(e) => warn!(error = %e, "failed to read history"),
            }
        }
    }

    /// Acknowledge the end of the session from the full view
    pub fn finish_session(&mut self) {
        let history = &self.history;
        let ended = self
            .store
            .finish_session(|session| record_completion(history, session));
        self.after_end(ended);
    }

    /// Same contract, requested from the compact affordance
    pub fn finish_from_badge(&mut self) {
        let history = &self.history;
        let ended = self
            .resume
            .finish(&mut self.store, |session| record_completion(history, session));
        self.after_end(ended);
    }

    pub fn abandon_session(&mut self) {
        let ended = self.store.end_session();
        self.after_end(ended);
    }

    fn after_end(&mut self, ended: Option<WorkoutSession>) {
        self.close_session_view();
        if let Some(session) = ended {
            self.notice = Some(format!(
                "Session ended: {}/{} sets in {}",
                progress::completed_sets_count(&session),
                progress::total_sets(&session),
                progress::format_elapsed(progress::elapsed_seconds(&session, Utc::now())),
            ));
        }
        if self.state == AppState::History {
            self.refresh_history();
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(view) = self.session_view.as_mut() {
            view.on_tick(&self.store);
        }
    }
}

fn record_completion(history: &Option<HistoryDb>, session: &WorkoutSession) {
    let entry = CompletedSession::from_session(session, Utc::now());
    info!(
        program = ?entry.program_id,
        day = ?entry.day_number,
        week = ?entry.week_id,
        "session complete"
    );
    if let Some(db) = history {
        if let Err(e) = db.record(&entry) {
            warn!(error = %e, "failed to record finished session");
        }
    }
}

fn load_program(cli: &Cli, config: &Config) -> Result<Program, spotter::program::ProgramError> {
    match cli.program.as_ref().or(config.program_file.as_ref()) {
        Some(path) => Program::load(path),
        None => Program::builtin(STARTER_PROGRAM),
    }
}

fn print_history(db: &HistoryDb) -> Result<(), Box<dyn Error>> {
    let entries = db.recent(50)?;
    if entries.is_empty() {
        println!("No finished sessions yet.");
        return Ok(());
    }
    for entry in entries {
        let ago = (Utc::now() - entry.finished_at).to_std().unwrap_or_default();
        let label = [
            entry.program_id.clone(),
            entry.day_number.map(|d| format!("day {d}")),
            entry.week_id.clone(),
        ]
        .into_iter()
        .flatten()
        .join(" / ");
        println!(
            "{:<40} {:>3}/{:<3} sets  {:>8}  {}",
            label,
            entry.completed_sets,
            entry.total_sets,
            progress::format_elapsed(entry.duration_secs()),
            HumanTime::from(ago).to_text_en(Accuracy::Rough, Tense::Past),
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(e) = logging::init_file_logging(&log_path) {
            eprintln!("spotter: logging disabled ({}): {e}", log_path.display());
        }
    }

    let mut config = FileConfigStore::new().load();
    if let Some(ms) = cli.tick_ms {
        config.tick_rate_ms = ms;
    }
    if cli.no_persist {
        config.persist_sessions = false;
    }

    let history = match HistoryDb::new() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(error = %e, "history database unavailable");
            None
        }
    };

    if cli.history || cli.clear_history {
        let Some(db) = &history else {
            return Err("history database unavailable".into());
        };
        if cli.clear_history {
            db.clear_all()?;
            info!("history cleared");
            println!("History cleared.");
            return Ok(());
        }
        return print_history(db);
    }

    let program = match load_program(&cli, &config) {
        Ok(program) => program,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let (store, resume) = if config.persist_sessions {
        let snapshots = FileSnapshotStore::new();
        (
            SessionStore::with_writer(SystemClock, SnapshotWriter::spawn(snapshots.clone())),
            ResumeController::new(snapshots),
        )
    } else {
        let snapshots = MemorySnapshotStore::new();
        (
            SessionStore::with_writer(SystemClock, SnapshotWriter::spawn(snapshots.clone())),
            ResumeController::new(snapshots),
        )
    };

    let mut app = App::new(program, store, resume, history, config);
    app.rehydrate();

    if let Some(day_number) = cli.day {
        match app.program.days.iter().position(|d| d.day_number == day_number) {
            Some(index) => {
                app.selected_day = index;
                if app.selected_day_is_live() {
                    app.open_session_view();
                } else {
                    app.start_selected_day();
                }
            }
            None => {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, format!("no day {day_number} in program"))
                    .exit();
            }
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    app.store.flush();
    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::from_millis(app.config.tick_rate_ms),
    );

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                app.on_tick();
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                app.on_tick();
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}

/// Returns true when the app should quit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if app.session_view.is_some() {
        handle_session_key(app, key);
        return false;
    }

    match app.state {
        AppState::Today => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                app.selected_day = app.selected_day.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if app.selected_day + 1 < app.program.days.len() {
                    app.selected_day += 1;
                }
            }
            KeyCode::Enter => {
                // the inline resume for the day that is already running
                if app.selected_day_is_live() {
                    app.open_session_view();
                } else {
                    app.start_selected_day();
                }
            }
            KeyCode::Char('r') => app.open_session_view(),
            KeyCode::Tab | KeyCode::Char('l') => app.set_state(AppState::Day),
            KeyCode::Char('h') => app.set_state(AppState::History),
            _ => {}
        },
        AppState::Day => match key.code {
            KeyCode::Esc | KeyCode::Char('b') => app.set_state(AppState::Today),
            KeyCode::Char('q') => return true,
            KeyCode::Left => {
                app.selected_day = app.selected_day.saturating_sub(1);
                app.set_state(AppState::Day);
            }
            KeyCode::Right => {
                if app.selected_day + 1 < app.program.days.len() {
                    app.selected_day += 1;
                }
                app.set_state(AppState::Day);
            }
            KeyCode::Char('o') => app.open_session_view(),
            KeyCode::Char('f') => app.finish_from_badge(),
            KeyCode::Char('h') => app.set_state(AppState::History),
            _ => {}
        },
        AppState::History => match key.code {
            KeyCode::Esc | KeyCode::Char('b') => app.set_state(AppState::Today),
            KeyCode::Char('q') => return true,
            KeyCode::Char('o') => app.open_session_view(),
            KeyCode::Char('f') => app.finish_from_badge(),
            _ => {}
        },
    }
    false
}

fn handle_session_key(app: &mut App, key: KeyEvent) {
    let complete = app.store.session().is_some_and(progress::is_complete);
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_session_view(),
        KeyCode::Enter | KeyCode::Char(' ') => {
            if complete {
                app.finish_session();
            } else if let SetOutcome::Advanced { to } = app.store.complete_set() {
                info!(to, "moved to next exercise");
            }
        }
        KeyCode::Char('s') => app.store.skip_rest(),
        KeyCode::Char('+') | KeyCode::Char('e') => {
            let delta = app.config.rest_extend_secs;
            app.store.extend_rest(delta);
        }
        KeyCode::Right | KeyCode::Char('n') => app.store.go_to_next_exercise(),
        KeyCode::Left | KeyCode::Char('p') => app.store.go_to_prev_exercise(),
        KeyCode::Char(c @ '1'..='9') => {
            let index = i64::from(c.to_digit(10).unwrap_or(1)) - 1;
            app.store.go_to_exercise(index);
        }
        KeyCode::Char('v') => {
            let identity = app
                .store
                .session()
                .and_then(WorkoutSession::current_exercise)
                .map(|e| e.identity.clone());
            if let (Some(view), Some(identity)) = (app.session_view.as_mut(), identity) {
                view.video_click(&identity);
            }
        }
        KeyCode::Char('x') => app.abandon_session(),
        _ => {}
    }
}
