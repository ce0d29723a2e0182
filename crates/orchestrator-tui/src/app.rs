//! Main TUI application state and input handling.
//!
//! [`TuiApp`] wraps a [`ConsoleSession`] with the bits of state that only a
//! terminal needs (cursor, focus, scroll).  Service calls are spawned onto
//! tokio tasks that report back through a [`tokio::sync::mpsc`] channel.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use orchestrator_client::{ClientError, OrchestrationService, Workflow};
use orchestrator_console::{ConsoleSession, Disposition, PendingExecute, PendingGenerate, RequestToken};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Results sent from background service tasks to the UI loop.
#[derive(Debug)]
pub enum ServiceEvent {
    /// A generate call finished.
    Generated {
        token: RequestToken,
        result: Result<Workflow, ClientError>,
    },
    /// An execute call finished.
    Executed {
        token: RequestToken,
        result: Result<String, ClientError>,
    },
}

/// Actions the UI loop should take after processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// Continue the main loop.
    Continue,
    /// Exit the application.
    Quit,
}

/// Which control receives editing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The request text input.
    Request,
    /// The automation level slider.
    Automation,
}

// ---------------------------------------------------------------------------
// TuiApp
// ---------------------------------------------------------------------------

/// The main TUI application state.
pub struct TuiApp {
    /// Session state shared with the one-shot commands.
    session: ConsoleSession,
    /// Cursor position within the request text, in characters.
    cursor_pos: usize,
    /// Control that receives editing keys.
    focus: Focus,
    /// Lines scrolled past at the top of the workflow preview.
    preview_scroll: u16,
    /// Where requests go, shown in the header.
    endpoint: String,
    /// The Orchestration Service.
    service: Arc<dyn OrchestrationService>,
    /// Receiver for results of background service calls.
    event_rx: mpsc::UnboundedReceiver<ServiceEvent>,
    /// Sender cloned into spawned service tasks.
    event_tx: mpsc::UnboundedSender<ServiceEvent>,
}

impl TuiApp {
    /// Create a new TUI application around an existing session.
    pub fn new(
        service: Arc<dyn OrchestrationService>,
        session: ConsoleSession,
        endpoint: impl Into<String>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cursor_pos = session.request().chars().count();

        Self {
            session,
            cursor_pos,
            focus: Focus::Request,
            preview_scroll: 0,
            endpoint: endpoint.into(),
            service,
            event_rx,
            event_tx,
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// Return the console session.
    pub fn session(&self) -> &ConsoleSession {
        &self.session
    }

    /// Return the cursor position within the request text, in characters.
    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    /// Return the focused control.
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Return the workflow preview scroll offset.
    pub fn preview_scroll(&self) -> u16 {
        self.preview_scroll
    }

    /// Return the service endpoint label.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // -- Key handling -------------------------------------------------------

    /// Handle a key event and return the action the UI should take.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }

        // A notice blocks everything else until acknowledged.
        if self.session.notice().is_some() {
            self.session.dismiss_notice();
            return AppAction::Continue;
        }

        match key.code {
            KeyCode::Esc => return AppAction::Quit,
            KeyCode::Enter => self.generate(),
            KeyCode::Char('g') if ctrl => self.generate(),
            KeyCode::Char('e') if ctrl => self.execute(),
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            _ => match self.focus {
                Focus::Request => self.handle_request_key(key.code, ctrl),
                Focus::Automation => self.handle_automation_key(key.code),
            },
        }

        AppAction::Continue
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Request => Focus::Automation,
            Focus::Automation => Focus::Request,
        };
    }

    /// Editing keys for the request input; vertical keys scroll the preview.
    fn handle_request_key(&mut self, code: KeyCode, ctrl: bool) {
        let len = self.session.request().chars().count();
        match code {
            KeyCode::Char(c) if !ctrl => {
                let at = self.byte_offset(self.cursor_pos);
                self.session.request_mut().insert(at, c);
                self.cursor_pos += 1;
            }
            KeyCode::Backspace => {
                if self.cursor_pos > 0 {
                    self.cursor_pos -= 1;
                    let at = self.byte_offset(self.cursor_pos);
                    self.session.request_mut().remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor_pos < len {
                    let at = self.byte_offset(self.cursor_pos);
                    self.session.request_mut().remove(at);
                }
            }
            KeyCode::Left => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            KeyCode::Right => self.cursor_pos = (self.cursor_pos + 1).min(len),
            KeyCode::Home => self.cursor_pos = 0,
            KeyCode::End => self.cursor_pos = len,
            KeyCode::Up => self.preview_scroll = self.preview_scroll.saturating_sub(1),
            KeyCode::Down => self.preview_scroll = self.preview_scroll.saturating_add(1),
            KeyCode::PageUp => self.preview_scroll = self.preview_scroll.saturating_sub(10),
            KeyCode::PageDown => self.preview_scroll = self.preview_scroll.saturating_add(10),
            _ => {}
        }
    }

    /// Slider keys for the automation level.
    fn handle_automation_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left | KeyCode::Down => self.session.nudge_automation(-1),
            KeyCode::Right | KeyCode::Up => self.session.nudge_automation(1),
            KeyCode::PageDown => self.session.nudge_automation(-10),
            KeyCode::PageUp => self.session.nudge_automation(10),
            KeyCode::Home => self.session.set_automation(0),
            KeyCode::End => self.session.set_automation(100),
            _ => {}
        }
    }

    /// Byte offset of the given character position in the request text.
    fn byte_offset(&self, char_pos: usize) -> usize {
        let request = self.session.request();
        request
            .char_indices()
            .nth(char_pos)
            .map_or(request.len(), |(i, _)| i)
    }

    // -- Service calls ------------------------------------------------------

    /// Start a generate call unless the session refuses it.
    fn generate(&mut self) {
        // A refusal leaves a notice on the session; nothing else to do.
        let Ok(PendingGenerate { token, request }) = self.session.begin_generate() else {
            return;
        };

        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = service.generate_workflow(&request).await;
            let _ = tx.send(ServiceEvent::Generated { token, result });
        });
    }

    /// Start an execute call unless the session refuses it.
    fn execute(&mut self) {
        let Ok(PendingExecute { token, workflow }) = self.session.begin_execute() else {
            return;
        };

        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = service.execute_workflow(&workflow).await;
            let _ = tx.send(ServiceEvent::Executed { token, result });
        });
    }

    // -- Service event polling ----------------------------------------------

    /// Drain finished service calls and fold them into the session.
    ///
    /// Should be called on every iteration of the main UI loop.
    pub fn check_service_responses(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                ServiceEvent::Generated { token, result } => {
                    let succeeded = result.is_ok();
                    if self.session.apply_generate(token, result) == Disposition::Applied
                        && succeeded
                    {
                        self.preview_scroll = 0;
                    }
                }
                ServiceEvent::Executed { token, result } => {
                    self.session.apply_execute(token, result);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
    use orchestrator_client::GenerateRequest;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct FakeService {
        generate_calls: AtomicUsize,
        execute_calls: AtomicUsize,
        unreachable: bool,
    }

    #[async_trait]
    impl OrchestrationService for FakeService {
        async fn generate_workflow(
            &self,
            _request: &GenerateRequest,
        ) -> orchestrator_client::Result<Workflow> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(ClientError::Request {
                    reason: "connection refused".into(),
                });
            }
            Ok(Workflow::new(json!({ "steps": ["load", "aggregate"] })))
        }

        async fn execute_workflow(&self, _workflow: &Workflow) -> orchestrator_client::Result<String> {
            self.execute_calls.fetch_add(1, Ordering::SeqCst);
            Ok("completed".into())
        }
    }

    fn make_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    fn make_key_with_mods(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    fn make_app_with(service: Arc<FakeService>) -> TuiApp {
        TuiApp::new(service, ConsoleSession::new(), "http://localhost:5000/")
    }

    fn make_app() -> TuiApp {
        make_app_with(Arc::new(FakeService::default()))
    }

    fn type_text(app: &mut TuiApp, text: &str) {
        for c in text.chars() {
            app.handle_key(make_key(KeyCode::Char(c)));
        }
    }

    /// Poll until every spawned service call has reported back.
    async fn settle(app: &mut TuiApp) {
        for _ in 0..200 {
            app.check_service_responses();
            if !app.session().is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("service calls did not settle");
    }

    #[test]
    fn typing_characters_appends_to_request() {
        let mut app = make_app();
        type_text(&mut app, "hi");
        assert_eq!(app.session().request(), "hi");
        assert_eq!(app.cursor_pos(), 2);
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut app = make_app();
        type_text(&mut app, "héllo");
        app.handle_key(make_key(KeyCode::Home));
        app.handle_key(make_key(KeyCode::Right));
        app.handle_key(make_key(KeyCode::Delete));
        assert_eq!(app.session().request(), "hllo");

        app.handle_key(make_key(KeyCode::End));
        app.handle_key(make_key(KeyCode::Backspace));
        assert_eq!(app.session().request(), "hll");
        assert_eq!(app.cursor_pos(), 3);
    }

    #[test]
    fn backspace_at_start_does_nothing() {
        let mut app = make_app();
        type_text(&mut app, "ab");
        app.handle_key(make_key(KeyCode::Home));
        app.handle_key(make_key(KeyCode::Backspace));
        assert_eq!(app.session().request(), "ab");
        assert_eq!(app.cursor_pos(), 0);
    }

    #[test]
    fn escape_returns_quit() {
        let mut app = make_app();
        assert_eq!(app.handle_key(make_key(KeyCode::Esc)), AppAction::Quit);
    }

    #[test]
    fn ctrl_c_returns_quit() {
        let mut app = make_app();
        let action = app.handle_key(make_key_with_mods(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        ));
        assert_eq!(action, AppAction::Quit);
    }

    #[test]
    fn empty_enter_raises_notice_without_calling_service() {
        let service = Arc::new(FakeService::default());
        let mut app = make_app_with(Arc::clone(&service));

        type_text(&mut app, "   ");
        assert_eq!(app.handle_key(make_key(KeyCode::Enter)), AppAction::Continue);

        let notice = app.session().notice().expect("notice raised");
        assert_eq!(notice.message(), "Please enter a request for the AI Orchestrator.");
        assert!(app.session().workflow().is_none());
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn notice_swallows_the_next_key() {
        let mut app = make_app();
        app.handle_key(make_key_with_mods(KeyCode::Char('e'), KeyModifiers::CONTROL));
        assert_eq!(
            app.session().notice().map(|n| n.message()),
            Some("Please generate a workflow first.")
        );

        // Escape acknowledges the notice instead of quitting.
        assert_eq!(app.handle_key(make_key(KeyCode::Esc)), AppAction::Continue);
        assert!(app.session().notice().is_none());
        assert_eq!(app.handle_key(make_key(KeyCode::Esc)), AppAction::Quit);
    }

    #[test]
    fn tab_moves_focus_to_slider() {
        let mut app = make_app();
        assert_eq!(app.focus(), Focus::Request);
        app.handle_key(make_key(KeyCode::Tab));
        assert_eq!(app.focus(), Focus::Automation);

        app.handle_key(make_key(KeyCode::Right));
        assert_eq!(app.session().automation().value(), 51);
        app.handle_key(make_key(KeyCode::PageDown));
        assert_eq!(app.session().automation().value(), 41);
        app.handle_key(make_key(KeyCode::End));
        assert_eq!(app.session().automation().value(), 100);
        app.handle_key(make_key(KeyCode::Up));
        assert_eq!(app.session().automation().value(), 100);
        app.handle_key(make_key(KeyCode::Home));
        app.handle_key(make_key(KeyCode::Left));
        assert_eq!(app.session().automation().value(), 0);

        // Typing while the slider has focus does not edit the request.
        app.handle_key(make_key(KeyCode::Char('x')));
        assert_eq!(app.session().request(), "");

        app.handle_key(make_key(KeyCode::BackTab));
        assert_eq!(app.focus(), Focus::Request);
    }

    #[test]
    fn vertical_keys_scroll_preview() {
        let mut app = make_app();
        app.handle_key(make_key(KeyCode::PageDown));
        assert_eq!(app.preview_scroll(), 10);
        app.handle_key(make_key(KeyCode::Up));
        assert_eq!(app.preview_scroll(), 9);
        app.handle_key(make_key(KeyCode::PageUp));
        assert_eq!(app.preview_scroll(), 0);
    }

    #[tokio::test]
    async fn generate_then_execute_updates_session() {
        let service = Arc::new(FakeService::default());
        let mut app = make_app_with(Arc::clone(&service));

        type_text(&mut app, "Summarize sales data");
        app.handle_key(make_key(KeyCode::Enter));
        assert!(app.session().is_busy());
        settle(&mut app).await;

        assert_eq!(
            app.session().workflow(),
            Some(&Workflow::new(json!({ "steps": ["load", "aggregate"] })))
        );
        assert!(app.session().can_execute());

        app.handle_key(make_key_with_mods(KeyCode::Char('e'), KeyModifiers::CONTROL));
        settle(&mut app).await;

        assert_eq!(app.session().run_status(), Some("completed"));
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.execute_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_service_is_silent() {
        let service = Arc::new(FakeService {
            unreachable: true,
            ..FakeService::default()
        });
        let mut app = make_app_with(service);

        type_text(&mut app, "Summarize sales data");
        app.handle_key(make_key_with_mods(KeyCode::Char('g'), KeyModifiers::CONTROL));
        settle(&mut app).await;

        assert!(app.session().workflow().is_none());
        assert!(app.session().notice().is_none());
        assert!(app.session().generate_state().failure().is_some());
    }

    #[tokio::test]
    async fn repeated_generate_issues_independent_requests() {
        let service = Arc::new(FakeService::default());
        let mut app = make_app_with(Arc::clone(&service));

        type_text(&mut app, "sales");
        app.handle_key(make_key(KeyCode::Enter));
        app.handle_key(make_key(KeyCode::Enter));
        settle(&mut app).await;

        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 2);
        assert!(app.session().workflow().is_some());
    }
}
