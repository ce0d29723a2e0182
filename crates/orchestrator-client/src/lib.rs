//! # orchestrator-client
//!
//! HTTP client for the Orchestration Service, the remote collaborator that
//! turns a free-text request into a workflow and executes it.
//!
//! The service exposes two JSON endpoints:
//!
//! ```text
//! POST /generate-workflow   { request, automation }  ->  { workflow }
//! POST /execute-workflow    { workflow }             ->  { status }
//! ```
//!
//! Workflows are opaque: the client never inspects their structure, it only
//! carries them between the two calls.  Callers program against the
//! [`OrchestrationService`] trait so the console can be driven by a fake
//! service in tests.

pub mod client;
pub mod error;
pub mod types;

pub use client::{DEFAULT_BASE_URL, OrchestrationService, ServiceClient, ServiceClientConfig};
pub use error::{ClientError, Result};
pub use types::{ExecuteRequest, GenerateRequest, Workflow};
