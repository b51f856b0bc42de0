//! Front Desk - a terminal front desk for the clinic.
//!
//! Staff log in, see today's queue, and are logged out automatically after
//! five minutes without interaction.

mod app;
mod models;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use frontdesk_core::monitor::{ActivityKind, ChannelActivitySource, Clock, SessionMonitor, SystemClock};
use frontdesk_core::{ApiClient, AuthBootstrap, Config};

use app::{App, AppState};
use ui::input::{handle_input, mouse_activity};
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "frontdesk.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a daily file in the cache directory so they never draw over the
/// terminal UI. Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        let mut config = Config::default();
        config.apply_env();
        config
    });

    let _log_guard = init_tracing(&config);
    info!(api_url = %config.api_url, "Front desk starting");

    let store = config
        .open_store()
        .context("Failed to open session storage")?;
    let api = ApiClient::new(config.api_url.clone()).context("Failed to build HTTP client")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let source = ChannelActivitySource::new();
    let feed = source.feed();
    let (monitor, handle, session_events) =
        SessionMonitor::new(api, Arc::clone(&store), Arc::clone(&clock), Box::new(source));
    let monitor_task = tokio::spawn(monitor.run());

    let bootstrap = AuthBootstrap::new(handle.api().clone(), store, clock);
    let mut app = App::new(config, handle, feed, session_events);
    app.start_bootstrap(bootstrap);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Quitting keeps the stored session; only logout or expiry clears it
    app.shutdown();
    if let Err(e) = monitor_task.await {
        warn!(error = %e, "Session monitor task failed");
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Front desk shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }

                    app.record_activity(ActivityKind::KeyPress);

                    if handle_input(app, key).await? {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(kind) = mouse_activity(mouse.kind) {
                        app.record_activity(kind);
                    }
                }
                _ => {}
            }
        }

        // Check for session events and completed background tasks
        app.check_background_tasks().await;

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
