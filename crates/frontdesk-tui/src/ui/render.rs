use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, LoginFocus};

use super::styles;

const APP_TITLE: &str = "  Front Desk";

pub fn render(frame: &mut Frame, app: &App) {
    if matches!(app.state, AppState::Loading) {
        render_loading(frame);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    if app.is_authenticated() {
        render_dashboard(frame, app, chunks[1]);
    }
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }

    // The warning covers whatever else is open
    if let Some(seconds) = app.warning_seconds {
        render_warning_overlay(frame, seconds);
    }
}

/// Gate shown until the stored session has been checked
fn render_loading(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 5, frame.area());
    let lines = vec![
        Line::from(Span::styled(APP_TITLE, styles::title_style())),
        Line::from(""),
        Line::from(Span::styled("  Verifying session…", styles::muted_style())),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let who = match app.identity {
        Some(ref identity) => format!("{} ({})", identity.username, identity.role),
        None => String::new(),
    };
    let help_hint = "[?] Help";
    let used = APP_TITLE.len() + who.len() + help_hint.len() + 6;

    let title_line = Line::from(vec![
        Span::styled(APP_TITLE, styles::title_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::styled(who, styles::highlight_style()),
        Span::raw("   "),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_queue(frame, app, chunks[0]);
    render_patient_detail(frame, app, chunks[1]);
}

fn render_queue(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Today's Queue ({}) ", app.queue.len());
    let block = Block::default()
        .title(Span::styled(title, styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if app.queue.is_empty() {
        let text = if app.refreshing {
            "  Loading..."
        } else {
            "  Nobody is waiting"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(text, styles::muted_style())))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let lines: Vec<Line> = app
        .queue
        .iter()
        .enumerate()
        .map(|(i, patient)| {
            let style = if i == app.queue_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let marker = if patient.has_alerts() { "! " } else { "  " };
            let mut spans = vec![
                Span::styled(marker, styles::error_style()),
                Span::styled(format!("{:<24}", patient.name), style),
                Span::styled(format!(" {}", patient.queue_reason), styles::muted_style()),
            ];
            if patient.is_new {
                spans.push(Span::styled(" NEW", styles::success_style()));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_patient_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Patient ", styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(patient) = app.selected_patient() else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(patient.name.clone(), styles::title_style())),
        Line::from(Span::styled(patient.patient_id.clone(), styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Reason: ", styles::muted_style()),
            Span::raw(patient.queue_reason.clone()),
        ]),
    ];
    if patient.is_new {
        lines.push(Line::from(Span::styled("First visit", styles::success_style())));
    }
    if patient.has_alerts() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Alerts", styles::error_style())));
        lines.push(Line::from(patient.alerts.clone()));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = if app.is_authenticated() {
        "[r]efresh | [L]ogout | [q]uit"
    } else {
        "[Esc] quit"
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None if app.is_authenticated() => format!(" {} patients on file ", app.patient_count),
        None => String::new(),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 18, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled(APP_TITLE, styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Queue", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  ↑/↓ j/k   ", styles::help_key_style()),
            Span::styled("Select patient", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  r         ", styles::help_key_style()),
            Span::styled("Refresh queue", styles::help_desc_style()),
        ]),
        Line::from(""),
        Line::from(Span::styled(" Session", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  L         ", styles::help_key_style()),
            Span::styled("Log out", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  q         ", styles::help_key_style()),
            Span::styled("Quit (stay logged in)", styles::help_desc_style()),
        ]),
        Line::from(Span::styled(
            "  Idle for 5 minutes logs you out.",
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(APP_TITLE, styles::title_style())),
        Line::from(""),
    ];

    let username_focused = app.login_focus == LoginFocus::Username;
    let username_style = if username_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let username_display = format!("{:<16}", app.login_username);
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(format!("{}{}", username_display, cursor), username_style),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let password_masked: String = "*".repeat(app.login_password.chars().count().min(16));
    let password_display = format!("{:<16}", password_masked);
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{}{}", password_display, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    let button_focused = app.login_focus == LoginFocus::Button;
    let (label, button_style) = if button_focused {
        (" ▶ Login ◀ ", styles::selected_style())
    } else {
        ("   Login   ", styles::list_item_style())
    };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_warning_overlay(frame: &mut Frame, seconds: u64) {
    let area = centered_rect_fixed(46, 9, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled("  Session Expiring", styles::countdown_style())),
        Line::from(""),
        Line::from(Span::styled(
            "  You will be logged out for inactivity in",
            styles::help_desc_style(),
        )),
        Line::from(Span::styled(
            format!("  {} second{}", seconds, if seconds == 1 { "" } else { "s" }),
            styles::countdown_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" to stay logged in", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::warning_border_style())
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
