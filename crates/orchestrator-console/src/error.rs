//! Console error types.

/// Precondition failures raised before any request is sent.
///
/// The `Display` text is the notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// Generate was requested with no request text.
    #[error("Please enter a request for the AI Orchestrator.")]
    EmptyRequest,

    /// Execute was requested before any workflow was generated.
    #[error("Please generate a workflow first.")]
    NoWorkflow,
}

/// Convenience alias used throughout the console crate.
pub type Result<T> = std::result::Result<T, ConsoleError>;
