//! Workflow console session for the Orchestration Service.
//!
//! A [`ConsoleSession`] owns the four pieces of state a console user works
//! with (request text, automation level, generated workflow, run status) and
//! mediates the two service calls.  It knows nothing about terminals: the TUI
//! and the one-shot CLI both drive the same session.
//!
//! Each call is split into a synchronous `begin_*` step, which checks the
//! precondition and hands back the payload to send, and an `apply_*` step,
//! which folds the service's answer back into the session.  This lets a UI
//! run the network call on a background task while the session stays on the
//! UI loop.

pub mod automation;
pub mod error;
pub mod operation;
pub mod session;

pub use automation::AutomationLevel;
pub use error::{ConsoleError, Result};
pub use operation::{Disposition, OperationState, RequestToken, ResponsePolicy};
pub use session::{ConsoleSession, Notice, PendingExecute, PendingGenerate};
