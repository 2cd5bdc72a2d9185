//! Control loop configuration
//!
//! Only the settings that change decisions inside the control loop live here.
//! Transport settings (serial port, broker) belong to the application layer.

use serde::{Deserialize, Serialize};

/// Whether motor commands are held back during calibration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGate {
    /// Subject and test-mode commands flow as soon as the link is open
    #[default]
    Passthrough,
    /// Subject and test-mode commands are dropped until the zero point is set
    UntilZeroed,
}

/// Configuration for the control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlConfig {
    /// Direction convention applied to bearings (default: true)
    #[serde(default = "default_true")]
    pub flip_direction: bool,

    /// Emit random bench-test angles on the test interval
    #[serde(default)]
    pub test_mode: bool,

    /// Calibration gating policy
    #[serde(default)]
    pub command_gate: CommandGate,

    /// Delay before the zero point is set, in milliseconds (default: 9000)
    #[serde(default = "default_wait_to_zero")]
    pub wait_to_zero_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_wait_to_zero() -> u64 {
    9000
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            flip_direction: true,
            test_mode: false,
            command_gate: CommandGate::Passthrough,
            wait_to_zero_ms: default_wait_to_zero(),
        }
    }
}

impl ControlConfig {
    /// Create a new control configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the direction convention
    pub fn with_flip_direction(mut self, flip: bool) -> Self {
        self.flip_direction = flip;
        self
    }

    /// Builder method: enable or disable test mode
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Builder method: set the calibration gating policy
    pub fn with_command_gate(mut self, gate: CommandGate) -> Self {
        self.command_gate = gate;
        self
    }

    /// Builder method: set the zero-point delay
    pub fn with_wait_to_zero(mut self, ms: u64) -> Self {
        self.wait_to_zero_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControlConfig::new();

        assert!(config.flip_direction);
        assert!(!config.test_mode);
        assert_eq!(config.command_gate, CommandGate::Passthrough);
        assert_eq!(config.wait_to_zero_ms, 9000);
    }

    #[test]
    fn test_builder() {
        let config = ControlConfig::new()
            .with_flip_direction(false)
            .with_test_mode(true)
            .with_command_gate(CommandGate::UntilZeroed)
            .with_wait_to_zero(0);

        assert!(!config.flip_direction);
        assert!(config.test_mode);
        assert_eq!(config.command_gate, CommandGate::UntilZeroed);
        assert_eq!(config.wait_to_zero_ms, 0);
    }
}
