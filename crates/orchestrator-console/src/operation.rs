//! Per-operation request tracking.
//!
//! Each service call (generate, execute) gets an [`Operation`] that records
//! the latest outcome as an [`OperationState`], counts requests still in
//! flight, and decides whether a late response should be applied according
//! to the session's [`ResponsePolicy`].

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifies one issued request.  Tokens increase monotonically per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// The first token a session issues.
    pub(crate) const FIRST: Self = Self(1);

    /// The token that follows this one.
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How responses to overlapping requests are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    /// Apply every response as it arrives; the last one to arrive wins.
    #[default]
    LastArrival,
    /// Only apply the response to the most recently issued request; older
    /// responses are dropped.
    LatestRequest,
}

/// Observable state of one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState<T> {
    /// Nothing has been requested yet.
    Idle,
    /// A request was issued and its outcome is not known.
    Pending { token: RequestToken },
    /// The service answered successfully.
    Succeeded(T),
    /// The request failed for the given reason.
    Failed { reason: String },
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> OperationState<T> {
    /// Whether the latest transition was a request being issued.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The failure reason, if the latest outcome was a failure.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// What happened to a response handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The response updated the session.
    Applied,
    /// The response was older than a newer request and was dropped.
    Stale,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Bookkeeping for one kind of service call.
#[derive(Debug)]
pub(crate) struct Operation<T> {
    state: OperationState<T>,
    latest: Option<RequestToken>,
    in_flight: usize,
}

impl<T> Default for Operation<T> {
    fn default() -> Self {
        Self {
            state: OperationState::Idle,
            latest: None,
            in_flight: 0,
        }
    }
}

impl<T> Operation<T> {
    pub(crate) fn state(&self) -> &OperationState<T> {
        &self.state
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Record that a request was issued.
    pub(crate) fn issue(&mut self, token: RequestToken) {
        self.latest = Some(token);
        self.in_flight += 1;
        self.state = OperationState::Pending { token };
    }

    /// Record that the request with `token` finished.  Returns whether its
    /// outcome should be applied under `policy`.
    pub(crate) fn settle(&mut self, token: RequestToken, policy: ResponsePolicy) -> Disposition {
        self.in_flight = self.in_flight.saturating_sub(1);
        match policy {
            ResponsePolicy::LatestRequest if self.latest != Some(token) => Disposition::Stale,
            _ => Disposition::Applied,
        }
    }

    pub(crate) fn succeed(&mut self, value: T) {
        self.state = OperationState::Succeeded(value);
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.state = OperationState::Failed { reason };
    }
}
