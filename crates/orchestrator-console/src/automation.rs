//! The automation level slider value.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Percentage of automation requested from the service, always in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AutomationLevel(u8);

impl AutomationLevel {
    /// Lowest level.
    pub const MIN: Self = Self(0);
    /// Highest level.
    pub const MAX: Self = Self(100);
    /// Level a new session starts at.
    pub const DEFAULT: Self = Self(50);

    /// Create a level, clamping out-of-range input.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    /// The level as a percentage.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Move the level by a signed step, clamping at the ends.
    pub fn nudged(self, delta: i64) -> Self {
        Self::new(i64::from(self.0).saturating_add(delta))
    }
}

impl Default for AutomationLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AutomationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl<'de> Deserialize<'de> for AutomationLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}
