//! Wire types for the Orchestration Service endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A workflow produced by the service.
///
/// The structure is owned entirely by the service.  It is stored and sent
/// back verbatim; the only local operation is rendering it as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow(Value);

impl Workflow {
    /// Wrap a JSON value as a workflow.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the workflow and return the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Render the workflow as indented JSON (two spaces per level).
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /generate-workflow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The user's free-text request.
    pub request: String,
    /// Automation level in percent (0-100).
    pub automation: u8,
}

impl GenerateRequest {
    /// Create a generate request.
    pub fn new(request: impl Into<String>, automation: u8) -> Self {
        Self {
            request: request.into(),
            automation,
        }
    }
}

/// Body of `POST /execute-workflow`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub workflow: &'a Workflow,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Success body of `POST /generate-workflow`.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub workflow: Option<Workflow>,
}

/// Success body of `POST /execute-workflow`.
#[derive(Debug, Deserialize)]
pub(crate) struct ExecuteResponse {
    #[serde(default)]
    pub status: Option<String>,
}

/// Body the service sends alongside a non-success status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
