//! Terminal UI for the workflow console.
//!
//! A single screen with a request input, an automation slider, the generated
//! workflow preview, and the latest run status.  Service calls run on
//! background tokio tasks and report back through a channel drained by the
//! draw loop, so the screen stays responsive while a request is in flight.

pub mod app;
pub mod error;
pub mod run;
pub mod ui;

pub use app::{AppAction, Focus, ServiceEvent, TuiApp};
pub use error::{Result, TuiError};
pub use run::run_tui;
