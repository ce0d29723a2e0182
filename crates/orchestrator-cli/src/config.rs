//! Console configuration.
//!
//! Reads `config/default.toml` (or the file given with `--config`).  A missing
//! file or section falls back to built-in defaults; a file that exists but
//! does not parse is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use orchestrator_client::DEFAULT_BASE_URL;
use orchestrator_console::{AutomationLevel, ResponsePolicy};

/// Environment variable that overrides `service.base_url`.
pub const BASE_URL_ENV: &str = "ORCHESTRATOR_BASE_URL";

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Settings loaded from the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// The `[service]` section.
    pub service: ServiceSection,
    /// The `[console]` section.
    pub console: ConsoleSection,
}

/// How to reach the Orchestration Service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Base URL the endpoint paths are joined onto.
    pub base_url: String,
    /// Per-request timeout in seconds; `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// How responses to overlapping requests are applied.
    pub response_policy: ResponsePolicy,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout_secs: None,
            response_policy: ResponsePolicy::default(),
        }
    }
}

impl ServiceSection {
    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Console behaviour and logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    /// Automation level a new session starts at.
    pub default_automation: AutomationLevel,
    /// Log file used while the terminal UI owns the screen.
    pub log_file: PathBuf,
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            default_automation: AutomationLevel::DEFAULT,
            log_file: PathBuf::from("orchestrator.log"),
            log_level: "info".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ConsoleConfig {
    /// Load configuration from `path`, or defaults if the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply an environment override for the base URL.  Empty values are
    /// ignored.
    pub fn apply_env(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.service.base_url = url;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
