//! The [`OrchestrationService`] seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};
use crate::types::{
    ErrorBody, ExecuteRequest, ExecuteResponse, GenerateRequest, GenerateResponse, Workflow,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Base address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://your-backend-api.com";

/// Path of the workflow generation endpoint, relative to the base URL.
const GENERATE_PATH: &str = "generate-workflow";

/// Path of the workflow execution endpoint, relative to the base URL.
const EXECUTE_PATH: &str = "execute-workflow";

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// The two calls the console makes against the Orchestration Service.
#[async_trait]
pub trait OrchestrationService: Send + Sync {
    /// Ask the service to turn a request into a workflow.
    async fn generate_workflow(&self, request: &GenerateRequest) -> Result<Workflow>;

    /// Ask the service to run a workflow and report its status.
    async fn execute_workflow(&self, workflow: &Workflow) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    /// Base URL the endpoint paths are joined onto.  Always ends in `/`.
    pub base_url: Url,
    /// Per-request timeout.  `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ServiceClientConfig {
    /// Build a configuration from a base URL string.
    ///
    /// A trailing `/` is appended when missing so that a base with a path
    /// prefix (e.g. `http://host/api`) keeps that prefix when endpoints are
    /// joined onto it.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: None,
        })
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            timeout: None,
        }
    }
}

/// Parse and normalise a base URL.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl {
            url: raw.to_owned(),
            reason: "url cannot be used as a base".into(),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Orchestration Service.
///
/// Sends plain JSON with no authentication and no retries.  A failed call is
/// reported once and left to the caller.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    config: ServiceClientConfig,
    http: reqwest::Client,
}

impl ServiceClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServiceClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(|e| ClientError::Request {
            reason: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self { config, http })
    }

    /// Return the base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// Resolve an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path}", self.config.base_url),
                reason: e.to_string(),
            })
    }

    /// POST a JSON body and decode a JSON success body.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "posting to orchestration service");

        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        debug!(status = status.as_u16(), bytes = text.len(), "orchestration service responded");
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl OrchestrationService for ServiceClient {
    async fn generate_workflow(&self, request: &GenerateRequest) -> Result<Workflow> {
        let response: GenerateResponse = self.post_json(GENERATE_PATH, request).await?;
        response
            .workflow
            .ok_or(ClientError::MissingField { field: "workflow" })
    }

    async fn execute_workflow(&self, workflow: &Workflow) -> Result<String> {
        let response: ExecuteResponse = self
            .post_json(EXECUTE_PATH, &ExecuteRequest { workflow })
            .await?;
        response
            .status
            .ok_or(ClientError::MissingField { field: "status" })
    }
}

/// Extract the `error` message from a failure body, falling back to the raw
/// text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "empty response body".to_owned(),
        Err(_) => body.trim().to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
