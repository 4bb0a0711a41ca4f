//! Device configuration.
//!
//! Loaded from a JSON file; every field is optional:
//! ```json
//! { "tick_ms": 100, "poll_ms": 10, "step_limit": 10000,
//!   "analog": [0, 0, 0, 0, 0, 0, 0, 0, 128], "inputs": [false, true, false, false] }
//! ```

use crate::hal::{SimBoard, ANALOG_CHANNELS, DIGITAL_INPUTS};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Timing and initial input levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Wall-clock milliseconds per tenth of a second of `WAI`.
    pub tick_ms: u64,
    /// How often blocking waits poll the mode switch, in milliseconds.
    pub poll_ms: u64,
    /// Instruction limit for headless runs.
    pub step_limit: u64,
    /// Initial analog channel levels.
    pub analog: [u8; ANALOG_CHANNELS],
    /// Initial push button states.
    pub inputs: [bool; DIGITAL_INPUTS],
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            poll_ms: 10,
            step_limit: 10_000,
            analog: [0; ANALOG_CHANNELS],
            inputs: [false; DIGITAL_INPUTS],
        }
    }
}

impl DeviceConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Json(e.to_string()))?;
        if config.poll_ms == 0 {
            return Err(ConfigError::Invalid("poll_ms must be at least 1".into()));
        }
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Set a simulated board's inputs to the configured levels.
    pub fn apply(&self, board: &mut SimBoard) {
        board.analog = self.analog;
        board.inputs = self.inputs;
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::from_json("{}").unwrap();
        assert_eq!(config, DeviceConfig::default());
        assert_eq!(config.tick_ms, 100);
    }

    #[test]
    fn test_partial() {
        let config = DeviceConfig::from_json(r#"{ "step_limit": 5, "inputs": [true, false, false, true] }"#).unwrap();
        assert_eq!(config.step_limit, 5);
        assert_eq!(config.inputs, [true, false, false, true]);
        assert_eq!(config.poll_ms, 10);
    }

    #[test]
    fn test_apply() {
        let mut config = DeviceConfig::default();
        config.analog[8] = 200;
        let mut board = SimBoard::running();
        config.apply(&mut board);
        assert_eq!(board.analog[8], 200);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(DeviceConfig::from_json("{"), Err(ConfigError::Json(_))));
        assert!(matches!(DeviceConfig::from_json(r#"{"poll_ms": 0}"#), Err(ConfigError::Invalid(_))));
        assert!(matches!(DeviceConfig::load("/nonexistent/device.json"), Err(ConfigError::Io(_))));
    }
}
