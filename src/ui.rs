pub mod screen;

use chrono::Utc;
use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use spotter::{progress, resume::ResumeBadge, util};
use time_humanize::{Accuracy, HumanTime, Tense};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 2;
const BADGE_WIDTH: u16 = 34;
const BADGE_HEIGHT: u16 = 3;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

/// Cut `text` to at most `max` display columns, marking the cut with `…`
fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 2 > max {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

pub fn draw(app: &App, f: &mut Frame) {
    let screen = screen::current_screen(app);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let mut header = vec![
        Span::styled(app.program.name.clone(), bold().fg(Color::Cyan)),
        Span::raw("  ·  "),
        Span::styled(screen.title(), bold()),
    ];
    if let Some(notice) = &app.notice {
        header.push(Span::raw("  ·  "));
        header.push(Span::styled(notice.clone(), Style::default().fg(Color::Green)));
    }
    f.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    screen.render(app, f, chunks[1]);

    f.render_widget(
        Paragraph::new(Span::styled(screen.hints(), dim())).alignment(Alignment::Center),
        chunks[2],
    );

    if let Some(badge) = app.resume.badge(&app.store, app.role()) {
        render_badge(&badge, f, chunks[1]);
    }
}

/// Compact resume affordance, pinned to the bottom-right of `area`
fn render_badge(badge: &ResumeBadge, f: &mut Frame, area: Rect) {
    if area.width < BADGE_WIDTH || area.height < BADGE_HEIGHT {
        return;
    }
    let rect = Rect::new(
        area.x + area.width - BADGE_WIDTH,
        area.y + area.height - BADGE_HEIGHT,
        BADGE_WIDTH,
        BADGE_HEIGHT,
    );

    let (label, color) = if badge.is_complete {
        ("done · f to finish".to_string(), Color::Green)
    } else {
        (
            format!(
                "{} {:.0}% {}",
                truncate(&badge.exercise_identity, 14),
                badge.progress_percent,
                util::format_clock(badge.elapsed_secs)
            ),
            Color::Yellow,
        )
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" o resume "))
        .gauge_style(Style::default().fg(color))
        .ratio(badge.progress_percent / 100.0)
        .label(label);

    f.render_widget(Clear, rect);
    f.render_widget(gauge, rect);
}

pub fn render_day_picker(app: &App, f: &mut Frame, area: Rect) {
    let completed_days = app
        .history
        .as_ref()
        .and_then(|db| db.completed_days(&app.program.id).ok())
        .unwrap_or_default();
    let live_day = app.store.session().and_then(|s| s.source.day_number);

    let items: Vec<ListItem> = app
        .program
        .days
        .iter()
        .map(|day| {
            let mut spans = vec![
                Span::styled(format!("Day {:<3}", day.day_number), bold()),
                Span::raw(format!("{:<20}", day.title)),
                Span::styled(
                    format!("{} exercises", day.session_exercises().len()),
                    dim(),
                ),
            ];
            if completed_days.contains(&day.day_number) {
                spans.push(Span::styled("  ✓", Style::default().fg(Color::Green)));
            }
            if live_day == Some(day.day_number) {
                spans.push(Span::styled(
                    "  ● in progress, enter to resume",
                    Style::default().fg(Color::Yellow),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Days "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("› ");

    let mut state = ListState::default().with_selected(Some(app.selected_day));
    f.render_stateful_widget(list, area, &mut state);
}

pub fn render_day_detail(app: &App, f: &mut Frame, area: Rect) {
    let Some(day) = app.selected() else {
        f.render_widget(Paragraph::new("No days in this program"), area);
        return;
    };

    let items: Vec<ListItem> = day
        .exercises
        .iter()
        .map(|ex| {
            let style = if ex.is_warmup() { dim() } else { Style::default() };
            let mut spans = vec![
                Span::styled(format!("{:<24}", ex.identity), style),
                Span::styled(format!("{:<10}", ex.prescription()), style),
            ];
            if let Some(part) = &ex.body_part {
                spans.push(Span::styled(part.clone(), dim()));
            }
            if ex.is_warmup() {
                spans.push(Span::styled("  warmup", dim().fg(Color::Blue)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!(" Day {} · {} ", day.day_number, day.title);
    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

pub fn render_history(app: &App, f: &mut Frame, area: Rect) {
    if app.recent.is_empty() {
        f.render_widget(
            Paragraph::new("No finished sessions yet")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" History ")),
            area,
        );
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .recent
        .iter()
        .map(|entry| {
            let label = [
                entry.day_number.map(|d| format!("Day {d}")),
                entry.week_id.clone(),
            ]
            .into_iter()
            .flatten()
            .join(" · ");
            let ago = (now - entry.finished_at).to_std().unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(format!("{label:<22}"), bold()),
                Span::raw(format!(
                    "{:>3}/{:<3} sets  {:>8}  ",
                    entry.completed_sets,
                    entry.total_sets,
                    progress::format_elapsed(entry.duration_secs())
                )),
                Span::styled(HumanTime::from(ago).to_text_en(Accuracy::Rough, Tense::Past), dim()),
            ]))
        })
        .collect();

    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(" History ")),
        area,
    );
}

pub fn render_session(app: &App, f: &mut Frame, area: Rect) {
    let (Some(session), Some(view)) = (app.store.session(), app.session_view.as_ref()) else {
        return;
    };
    let Some(exercise) = session.current_exercise() else {
        return;
    };
    let index = session.current_exercise_index;
    let complete = progress::is_complete(session);

    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(format!(
        " Exercise {}/{} ",
        index + 1,
        session.exercises.len()
    ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(inner);

    // name + prescription
    let mut title = vec![
        Span::styled(exercise.identity.clone(), bold().fg(Color::Cyan)),
        Span::raw("   "),
        Span::raw(exercise.prescription()),
    ];
    if let Some(part) = &exercise.body_part {
        title.push(Span::styled(format!("   {part}"), dim()));
    }
    f.render_widget(Paragraph::new(Line::from(title)), chunks[0]);

    // set circles
    let total = exercise.total_sets();
    let done = session.completed_for(index);
    let set_number = progress::current_set_number(session, index);
    let mut circles: Vec<Span> = (1..=total)
        .map(|n| {
            if n <= done {
                Span::styled("● ", Style::default().fg(Color::Green))
            } else if n == set_number {
                Span::styled("◉ ", bold().fg(Color::Yellow))
            } else {
                Span::styled("○ ", dim())
            }
        })
        .collect();
    circles.push(Span::raw(if done >= total {
        "  all sets done".to_string()
    } else {
        format!("  set {set_number} of {total}")
    }));
    f.render_widget(Paragraph::new(Line::from(circles)), chunks[1]);

    // rest countdown or call to action
    match view.countdown().filter(|_| view.is_resting()) {
        Some(countdown) => {
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title(" Rest "))
                .gauge_style(Style::default().fg(Color::Magenta))
                .ratio(countdown.fraction_remaining())
                .label(util::format_rest(countdown.last_sample()));
            f.render_widget(gauge, chunks[2]);
        }
        None => {
            let (text, color) = if complete {
                ("Workout complete · enter to finish", Color::Green)
            } else {
                ("Ready · enter when the set is done", Color::White)
            };
            f.render_widget(
                Paragraph::new(Span::styled(text, bold().fg(color)))
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL)),
                chunks[2],
            );
        }
    }

    let next = match session.next_exercise() {
        Some(next) => format!("Next: {} ({})", next.identity, next.prescription()),
        None => "Last exercise".to_string(),
    };
    f.render_widget(
        Paragraph::new(Span::styled(next, dim())).wrap(Wrap { trim: true }),
        chunks[3],
    );

    let elapsed = progress::elapsed_seconds(session, app.store.now());
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(progress::progress_percent(session) / 100.0)
        .label(format!(
            "{}/{} sets · {:.0}% · {}",
            progress::completed_sets_count(session),
            progress::total_sets(session),
            progress::progress_percent(session),
            progress::format_elapsed(elapsed)
        ));
    f.render_widget(gauge, chunks[5]);
}
