//! The console session: state plus the generate and execute operations.

use tracing::{debug, error, info};

use orchestrator_client::{ClientError, GenerateRequest, OrchestrationService, Workflow};

use crate::automation::AutomationLevel;
use crate::error::{ConsoleError, Result};
use crate::operation::{Disposition, Operation, OperationState, RequestToken, ResponsePolicy};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A message the user has to acknowledge, raised when an action is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    message: String,
}

impl Notice {
    /// The text to show.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&ConsoleError> for Notice {
    fn from(err: &ConsoleError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// A generate call that passed its precondition and should be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGenerate {
    pub token: RequestToken,
    pub request: GenerateRequest,
}

/// An execute call that passed its precondition and should be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExecute {
    pub token: RequestToken,
    pub workflow: Workflow,
}

// ---------------------------------------------------------------------------
// ConsoleSession
// ---------------------------------------------------------------------------

/// State of one console session.
///
/// `workflow` is only ever replaced by a successful generate response and
/// `run_status` only by a successful execute response.  Failures leave both
/// untouched and are visible through [`generate_state`](Self::generate_state)
/// and [`execute_state`](Self::execute_state).
///
/// Under [`ResponsePolicy::LatestRequest`] an execute response is also
/// dropped when the workflow it ran has since been replaced.  Under
/// [`ResponsePolicy::LastArrival`] it is applied anyway, so a late status can
/// sit next to a newer workflow until the next run.
#[derive(Debug)]
pub struct ConsoleSession {
    request: String,
    automation: AutomationLevel,
    workflow: Option<Workflow>,
    /// Bumped every time `workflow` is replaced.
    workflow_epoch: u64,
    /// `workflow_epoch` at the time the latest execute was issued.
    execute_epoch: u64,
    run_status: Option<String>,
    notice: Option<Notice>,
    policy: ResponsePolicy,
    next_token: RequestToken,
    generate: Operation<Workflow>,
    execute: Operation<String>,
}

impl Default for ConsoleSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSession {
    /// Create an empty session with the default automation level.
    pub fn new() -> Self {
        Self {
            request: String::new(),
            automation: AutomationLevel::DEFAULT,
            workflow: None,
            workflow_epoch: 0,
            execute_epoch: 0,
            run_status: None,
            notice: None,
            policy: ResponsePolicy::default(),
            next_token: RequestToken::FIRST,
            generate: Operation::default(),
            execute: Operation::default(),
        }
    }

    /// Set how overlapping responses are applied.
    pub fn with_policy(mut self, policy: ResponsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the starting automation level.
    pub fn with_automation(mut self, automation: AutomationLevel) -> Self {
        self.automation = automation;
        self
    }

    // -- Accessors ----------------------------------------------------------

    /// The request text as typed.
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Mutable access to the request text for in-place editing.
    pub fn request_mut(&mut self) -> &mut String {
        &mut self.request
    }

    /// Replace the request text.
    pub fn set_request(&mut self, request: impl Into<String>) {
        self.request = request.into();
    }

    pub fn automation(&self) -> AutomationLevel {
        self.automation
    }

    /// Set the automation level, clamping into `0..=100`.
    pub fn set_automation(&mut self, value: i64) {
        self.automation = AutomationLevel::new(value);
    }

    /// Move the automation level by a signed step, clamping at the ends.
    pub fn nudge_automation(&mut self, delta: i64) {
        self.automation = self.automation.nudged(delta);
    }

    /// The most recently generated workflow.
    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    /// The generated workflow rendered for display.
    pub fn workflow_preview(&self) -> Option<String> {
        self.workflow.as_ref().map(Workflow::to_pretty)
    }

    /// Whether there is a workflow that can be executed.
    pub fn can_execute(&self) -> bool {
        self.workflow.is_some()
    }

    /// The status reported by the most recent execution.
    pub fn run_status(&self) -> Option<&str> {
        self.run_status.as_deref()
    }

    /// The notice awaiting acknowledgement, if any.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Acknowledge the current notice.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    pub fn generate_state(&self) -> &OperationState<Workflow> {
        self.generate.state()
    }

    pub fn execute_state(&self) -> &OperationState<String> {
        self.execute.state()
    }

    /// Whether any request is still awaiting a response.
    pub fn is_busy(&self) -> bool {
        self.generate.in_flight() > 0 || self.execute.in_flight() > 0
    }

    // -- Generate -----------------------------------------------------------

    /// Check the generate precondition and issue a request token.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::EmptyRequest`] when the request text is empty
    /// or whitespace; a notice is raised and nothing should be sent.
    pub fn begin_generate(&mut self) -> Result<PendingGenerate> {
        if self.request.trim().is_empty() {
            return Err(self.refuse(ConsoleError::EmptyRequest));
        }

        let token = self.issue_token();
        self.generate.issue(token);
        info!(%token, automation = self.automation.value(), "generating workflow");

        Ok(PendingGenerate {
            token,
            request: GenerateRequest::new(self.request.clone(), self.automation.value()),
        })
    }

    /// Fold a generate response back into the session.
    ///
    /// A success replaces the workflow verbatim and clears the previous run
    /// status.  A failure is logged and leaves the workflow as it was.
    pub fn apply_generate(
        &mut self,
        token: RequestToken,
        result: std::result::Result<Workflow, ClientError>,
    ) -> Disposition {
        if self.generate.settle(token, self.policy) == Disposition::Stale {
            debug!(%token, "discarding stale generate response");
            return Disposition::Stale;
        }

        match result {
            Ok(workflow) => {
                info!(%token, "workflow generated");
                self.replace_workflow(workflow.clone());
                self.run_status = None;
                self.generate.succeed(workflow);
            }
            Err(e) => {
                error!(%token, error = %e, "error generating workflow");
                self.generate.fail(e.to_string());
            }
        }
        Disposition::Applied
    }

    /// Run a full generate call against `service`.
    pub async fn generate<S>(&mut self, service: &S) -> Result<Disposition>
    where
        S: OrchestrationService + ?Sized,
    {
        let pending = self.begin_generate()?;
        let result = service.generate_workflow(&pending.request).await;
        Ok(self.apply_generate(pending.token, result))
    }

    // -- Execute ------------------------------------------------------------

    /// Check the execute precondition and issue a request token.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::NoWorkflow`] when nothing has been generated
    /// yet; a notice is raised and nothing should be sent.
    pub fn begin_execute(&mut self) -> Result<PendingExecute> {
        let Some(workflow) = self.workflow.clone() else {
            return Err(self.refuse(ConsoleError::NoWorkflow));
        };

        let token = self.issue_token();
        self.execute.issue(token);
        self.execute_epoch = self.workflow_epoch;
        info!(%token, "executing workflow");

        Ok(PendingExecute { token, workflow })
    }

    /// Fold an execute response back into the session.
    pub fn apply_execute(
        &mut self,
        token: RequestToken,
        result: std::result::Result<String, ClientError>,
    ) -> Disposition {
        if self.execute.settle(token, self.policy) == Disposition::Stale {
            debug!(%token, "discarding stale execute response");
            return Disposition::Stale;
        }
        if self.policy == ResponsePolicy::LatestRequest
            && self.execute_epoch != self.workflow_epoch
        {
            debug!(%token, "discarding execute response for a replaced workflow");
            return Disposition::Stale;
        }

        match result {
            Ok(status) => {
                info!(%token, status = %status, "workflow executed");
                self.run_status = Some(status.clone());
                self.execute.succeed(status);
            }
            Err(e) => {
                error!(%token, error = %e, "error executing workflow");
                self.execute.fail(e.to_string());
            }
        }
        Disposition::Applied
    }

    /// Run a full execute call against `service`.
    pub async fn execute<S>(&mut self, service: &S) -> Result<Disposition>
    where
        S: OrchestrationService + ?Sized,
    {
        let pending = self.begin_execute()?;
        let result = service.execute_workflow(&pending.workflow).await;
        Ok(self.apply_execute(pending.token, result))
    }

    /// Install a workflow obtained outside the generate call, e.g. loaded
    /// from a file for a one-shot execute.
    pub fn load_workflow(&mut self, workflow: Workflow) {
        self.replace_workflow(workflow);
    }

    // -- Helpers ------------------------------------------------------------

    fn replace_workflow(&mut self, workflow: Workflow) {
        self.workflow = Some(workflow);
        self.workflow_epoch += 1;
    }

    fn issue_token(&mut self) -> RequestToken {
        let token = self.next_token;
        self.next_token = token.next();
        token
    }

    fn refuse(&mut self, err: ConsoleError) -> ConsoleError {
        debug!(reason = %err, "action refused");
        self.notice = Some(Notice::from(&err));
        err
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Scripted service that records every call it receives.
    #[derive(Default)]
    struct FakeService {
        generate_calls: AtomicUsize,
        execute_calls: AtomicUsize,
        last_generate: Mutex<Option<GenerateRequest>>,
        fail: bool,
    }

    impl FakeService {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl OrchestrationService for FakeService {
        async fn generate_workflow(
            &self,
            request: &GenerateRequest,
        ) -> orchestrator_client::Result<Workflow> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_generate.lock().unwrap() = Some(request.clone());
            if self.fail {
                return Err(ClientError::Request {
                    reason: "connection refused".into(),
                });
            }
            Ok(Workflow::new(json!({ "steps": ["load", "aggregate"] })))
        }

        async fn execute_workflow(&self, _workflow: &Workflow) -> orchestrator_client::Result<String> {
            self.execute_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClientError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok("completed".into())
        }
    }

    fn workflow(n: u64) -> Workflow {
        Workflow::new(json!({ "id": n }))
    }

    /// Log sink shared between a scoped subscriber and the test body.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn new_session_defaults() {
        let session = ConsoleSession::new();
        assert_eq!(session.request(), "");
        assert_eq!(session.automation().value(), 50);
        assert!(session.workflow().is_none());
        assert!(session.run_status().is_none());
        assert!(session.notice().is_none());
        assert!(!session.can_execute());
        assert!(!session.is_busy());
        assert_eq!(session.generate_state(), &OperationState::Idle);
        assert_eq!(session.policy(), ResponsePolicy::LastArrival);
    }

    #[tokio::test]
    async fn blank_requests_never_reach_the_service() {
        let service = FakeService::default();
        for text in ["", " ", "\t\n", "   \r\n  "] {
            let mut session = ConsoleSession::new();
            session.set_request(text);

            let err = session.generate(&service).await.unwrap_err();
            assert_eq!(err, ConsoleError::EmptyRequest);
            assert!(session.workflow().is_none());
            assert_eq!(
                session.notice().map(Notice::message),
                Some("Please enter a request for the AI Orchestrator.")
            );
            assert_eq!(session.generate_state(), &OperationState::Idle);
        }
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn execute_without_workflow_never_reaches_the_service() {
        let service = FakeService::default();
        let mut session = ConsoleSession::new();

        let err = session.execute(&service).await.unwrap_err();
        assert_eq!(err, ConsoleError::NoWorkflow);
        assert!(session.run_status().is_none());
        assert_eq!(
            session.notice().map(Notice::message),
            Some("Please generate a workflow first.")
        );
        assert_eq!(service.execute_calls.load(Ordering::SeqCst), 0);

        session.dismiss_notice();
        assert!(session.notice().is_none());
    }

    #[tokio::test]
    async fn generate_sends_text_and_automation_verbatim() {
        let service = FakeService::default();
        let mut session = ConsoleSession::new().with_automation(AutomationLevel::new(80));
        session.set_request("  Summarize sales data ");

        session.generate(&service).await.unwrap();

        let sent = service.last_generate.lock().unwrap().clone().unwrap();
        assert_eq!(sent, GenerateRequest::new("  Summarize sales data ", 80));
        assert_eq!(
            session.workflow(),
            Some(&Workflow::new(json!({ "steps": ["load", "aggregate"] })))
        );
        assert!(session.can_execute());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn failed_generate_leaves_workflow_and_raises_no_notice() {
        let service = FakeService::failing();
        let mut session = ConsoleSession::new();
        session.set_request("Run RNA-seq analysis");

        let disposition = session.generate(&service).await.unwrap();
        assert_eq!(disposition, Disposition::Applied);
        assert!(session.workflow().is_none());
        assert!(session.notice().is_none());
        assert!(
            session
                .generate_state()
                .failure()
                .is_some_and(|r| r.contains("connection refused"))
        );
    }

    #[test]
    fn failures_are_logged_as_errors() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut session = ConsoleSession::new();
            session.set_request("Run RNA-seq analysis");
            let generate = session.begin_generate().unwrap();
            session.apply_generate(
                generate.token,
                Err(ClientError::Request {
                    reason: "connection refused".into(),
                }),
            );

            session.load_workflow(workflow(1));
            let execute = session.begin_execute().unwrap();
            session.apply_execute(
                execute.token,
                Err(ClientError::Status {
                    status: 500,
                    message: "boom".into(),
                }),
            );
        });

        let output = log.contents();
        assert!(output.contains("ERROR"), "log was {output}");
        assert!(output.contains("error generating workflow"), "log was {output}");
        assert!(output.contains("connection refused"), "log was {output}");
        assert!(output.contains("error executing workflow"), "log was {output}");
        assert!(output.contains("boom"), "log was {output}");
    }

    #[tokio::test]
    async fn execute_records_status() {
        let service = FakeService::default();
        let mut session = ConsoleSession::new();
        session.set_request("Summarize sales data");
        session.generate(&service).await.unwrap();

        session.execute(&service).await.unwrap();
        assert_eq!(session.run_status(), Some("completed"));
        assert_eq!(
            session.execute_state(),
            &OperationState::Succeeded("completed".to_owned())
        );
    }

    #[test]
    fn failed_execute_keeps_previous_status() {
        let mut session = ConsoleSession::new();
        session.load_workflow(workflow(1));

        let first = session.begin_execute().unwrap();
        session.apply_execute(first.token, Ok("Run 1 completed".into()));

        let second = session.begin_execute().unwrap();
        session.apply_execute(
            second.token,
            Err(ClientError::Request {
                reason: "timed out".into(),
            }),
        );

        assert_eq!(session.run_status(), Some("Run 1 completed"));
        assert!(session.execute_state().failure().is_some());
    }

    #[test]
    fn successful_generate_clears_previous_run_status() {
        let mut session = ConsoleSession::new();
        session.set_request("first");
        let generate = session.begin_generate().unwrap();
        session.apply_generate(generate.token, Ok(workflow(1)));
        let execute = session.begin_execute().unwrap();
        session.apply_execute(execute.token, Ok("completed".into()));

        // Starting a new generate keeps the status until it succeeds.
        let generate = session.begin_generate().unwrap();
        assert_eq!(session.run_status(), Some("completed"));

        session.apply_generate(generate.token, Ok(workflow(2)));
        assert_eq!(session.run_status(), None);
        assert_eq!(session.workflow(), Some(&workflow(2)));
    }

    #[test]
    fn latest_request_drops_status_of_a_replaced_workflow() {
        let mut session = ConsoleSession::new().with_policy(ResponsePolicy::LatestRequest);
        session.load_workflow(workflow(1));
        let execute = session.begin_execute().unwrap();

        session.set_request("again");
        let generate = session.begin_generate().unwrap();
        session.apply_generate(generate.token, Ok(workflow(2)));

        let disposition =
            session.apply_execute(execute.token, Ok("Run for workflow 1 completed".into()));
        assert_eq!(disposition, Disposition::Stale);
        assert_eq!(session.workflow(), Some(&workflow(2)));
        assert_eq!(session.run_status(), None);
        assert!(!session.is_busy());

        // A run of the current workflow is applied as usual.
        let execute = session.begin_execute().unwrap();
        assert_eq!(
            session.apply_execute(execute.token, Ok("Run for workflow 2 completed".into())),
            Disposition::Applied
        );
        assert_eq!(session.run_status(), Some("Run for workflow 2 completed"));
    }

    #[test]
    fn last_arrival_applies_status_of_a_replaced_workflow() {
        let mut session = ConsoleSession::new();
        session.load_workflow(workflow(1));
        let execute = session.begin_execute().unwrap();

        session.set_request("again");
        let generate = session.begin_generate().unwrap();
        session.apply_generate(generate.token, Ok(workflow(2)));

        assert_eq!(
            session.apply_execute(execute.token, Ok("Run for workflow 1 completed".into())),
            Disposition::Applied
        );
        assert_eq!(session.run_status(), Some("Run for workflow 1 completed"));
    }

    #[test]
    fn failed_generate_keeps_previous_run_status() {
        let mut session = ConsoleSession::new();
        session.load_workflow(workflow(1));
        let execute = session.begin_execute().unwrap();
        session.apply_execute(execute.token, Ok("completed".into()));

        session.set_request("again");
        let generate = session.begin_generate().unwrap();
        session.apply_generate(
            generate.token,
            Err(ClientError::MissingField { field: "workflow" }),
        );

        assert_eq!(session.run_status(), Some("completed"));
        assert_eq!(session.workflow(), Some(&workflow(1)));
    }

    #[test]
    fn last_arrival_lets_the_late_response_win() {
        let mut session = ConsoleSession::new();
        session.set_request("sales");
        let first = session.begin_generate().unwrap();
        let second = session.begin_generate().unwrap();
        assert!(second.token > first.token);
        assert!(session.is_busy());

        assert_eq!(session.apply_generate(second.token, Ok(workflow(2))), Disposition::Applied);
        assert_eq!(session.apply_generate(first.token, Ok(workflow(1))), Disposition::Applied);

        assert_eq!(session.workflow(), Some(&workflow(1)));
        assert!(!session.is_busy());
    }

    #[test]
    fn latest_request_discards_stale_responses() {
        let mut session = ConsoleSession::new().with_policy(ResponsePolicy::LatestRequest);
        session.set_request("sales");
        let first = session.begin_generate().unwrap();
        let second = session.begin_generate().unwrap();

        assert_eq!(session.apply_generate(second.token, Ok(workflow(2))), Disposition::Applied);
        assert_eq!(session.apply_generate(first.token, Ok(workflow(1))), Disposition::Stale);

        assert_eq!(session.workflow(), Some(&workflow(2)));
        assert!(!session.is_busy());
    }

    #[test]
    fn execute_sends_the_workflow_current_at_begin() {
        let mut session = ConsoleSession::new();
        session.load_workflow(workflow(1));
        let pending = session.begin_execute().unwrap();
        session.load_workflow(workflow(2));
        assert_eq!(pending.workflow, workflow(1));
    }

    #[test]
    fn automation_edits_clamp() {
        let mut session = ConsoleSession::new();
        session.set_automation(140);
        assert_eq!(session.automation().value(), 100);
        session.nudge_automation(-250);
        assert_eq!(session.automation().value(), 0);
        session.nudge_automation(7);
        assert_eq!(session.automation().value(), 7);
    }

    #[test]
    fn preview_is_pretty_json() {
        let mut session = ConsoleSession::new();
        assert!(session.workflow_preview().is_none());
        session.load_workflow(Workflow::new(json!({ "steps": ["load", "aggregate"] })));
        assert_eq!(
            session.workflow_preview().unwrap(),
            "{\n  \"steps\": [\n    \"load\",\n    \"aggregate\"\n  ]\n}"
        );
    }
}
