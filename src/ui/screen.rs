use ratatui::{layout::Rect, Frame};

use crate::{ui, App, AppState};

/// A UI Screen boundary: responsible for rendering its body and key hints
pub trait Screen {
    fn title(&self) -> &'static str;
    fn render(&self, app: &App, f: &mut Frame, area: Rect);
    fn hints(&self) -> &'static str;
}

/// Day picker. Starting (and the inline resume) happen here.
pub struct TodayScreen;

impl Screen for TodayScreen {
    fn title(&self) -> &'static str {
        "Today"
    }

    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        ui::render_day_picker(app, f, area);
    }

    fn hints(&self) -> &'static str {
        "↑/↓ select · enter start/resume · tab exercises · h history · q quit"
    }
}

/// Exercise list for the selected day
pub struct DayScreen;

impl Screen for DayScreen {
    fn title(&self) -> &'static str {
        "Exercises"
    }

    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        ui::render_day_detail(app, f, area);
    }

    fn hints(&self) -> &'static str {
        "←/→ day · o open session · f finish · h history · esc back"
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn title(&self) -> &'static str {
        "History"
    }

    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        ui::render_history(app, f, area);
    }

    fn hints(&self) -> &'static str {
        "o open session · f finish · esc back · q quit"
    }
}

/// Full session view, drawn over whatever screen is underneath
pub struct SessionScreen;

impl Screen for SessionScreen {
    fn title(&self) -> &'static str {
        "Session"
    }

    fn render(&self, app: &App, f: &mut Frame, area: Rect) {
        ui::render_session(app, f, area);
    }

    fn hints(&self) -> &'static str {
        "enter set done/finish · s skip rest · + extend · ←/→ exercise · v video · x end · esc close"
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(app: &App) -> Box<dyn Screen> {
    if app.session_view.is_some() {
        return Box::new(SessionScreen);
    }
    match app.state {
        AppState::Today => Box::new(TodayScreen),
        AppState::Day => Box::new(DayScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
