//! Main event loop for the terminal UI.
//!
//! Sets up the terminal in raw mode with an alternate screen, runs the
//! draw-and-poll loop, and restores the terminal on exit.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use orchestrator_client::OrchestrationService;
use orchestrator_console::ConsoleSession;

use crate::app::{AppAction, TuiApp};
use crate::error::Result;
use crate::ui;

/// How long to wait for a key before checking for service responses.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the terminal UI event loop.
///
/// This function takes ownership of the terminal for the duration of the
/// session.  It enables raw mode and switches to an alternate screen buffer
/// so the user's existing terminal content is preserved.
///
/// # Arguments
///
/// * `service` -- The Orchestration Service requests are sent to.
/// * `session` -- Initial session state (automation level, response policy).
/// * `endpoint` -- Label for the service shown in the header.
///
/// # Errors
///
/// Returns a [`TuiError`](crate::error::TuiError) if terminal setup, drawing,
/// or event handling fails.
pub async fn run_tui(
    service: Arc<dyn OrchestrationService>,
    session: ConsoleSession,
    endpoint: String,
) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TuiApp::new(service, session, endpoint);

    tracing::info!("TUI event loop started");

    let result = event_loop(&mut terminal, &mut app).await;

    // Restore the terminal regardless of whether the loop succeeded.
    crossterm::terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("TUI event loop ended");

    result
}

/// The inner event loop, separated so terminal cleanup always runs.
async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && app.handle_key(key) == AppAction::Quit
        {
            break;
        }

        app.check_service_responses();

        // event::poll blocks this task; give spawned requests a turn.
        tokio::task::yield_now().await;
    }

    Ok(())
}
