//! Keyboard and mouse input handling for the TUI.
//!
//! This module translates terminal events into application state changes
//! and into the activity events that keep a session alive.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseEventKind};

use frontdesk_core::monitor::ActivityKind;

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus};

/// Map a mouse event to the activity it represents, if any.
///
/// Button presses qualify; movement and scrolling are reported but never
/// extend a session.
pub fn mouse_activity(kind: MouseEventKind) -> Option<ActivityKind> {
    match kind {
        MouseEventKind::Down(_) => Some(ActivityKind::PointerPress),
        MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(ActivityKind::PointerMove),
        MouseEventKind::ScrollUp
        | MouseEventKind::ScrollDown
        | MouseEventKind::ScrollLeft
        | MouseEventKind::ScrollRight => Some(ActivityKind::Scroll),
        MouseEventKind::Up(_) => None,
    }
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::Loading => return Ok(false),
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::Quitting => return Ok(true),
        _ => {}
    }

    // The warning overlay sits above everything else. The key press itself
    // already counted as activity; Enter and 's' are the explicit answer.
    if app.warning_seconds.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Char('s')) {
            app.stay_logged_in();
        }
        return Ok(false);
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('L') => app.logout().await,
        KeyCode::Char('r') => app.refresh_dashboard(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        _ => {}
    }
    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                // Failures land in login_error; success arrives as a session event
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.len(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.len(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}
