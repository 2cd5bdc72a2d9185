//! Configuration loading and parsing
//!
//! Every key is optional; a missing file section falls back to the defaults
//! the motor rig was commissioned with.

use anyhow::{anyhow, bail, Context, Result};
use log::LevelFilter;
use pan_tracker_core::{CommandGate, ControlConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default = "default_wait_to_zero")]
    pub wait_to_zero: u64,
    #[serde(default = "default_true")]
    pub flip_direction: bool,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "default_test_interval")]
    pub test_interval: u64,
    #[serde(default)]
    pub command_gate: CommandGate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    /// Pause between attempts while the port cannot be opened (ms)
    #[serde(default = "default_reopen_interval")]
    pub reopen_interval: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    #[serde(default = "default_bus_host")]
    pub host: String,
    #[serde(default = "default_bus_port")]
    pub port: u16,
    #[serde(default = "default_bus_username")]
    pub username: Option<String>,
    #[serde(default = "default_bus_password")]
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_tracking_topic")]
    pub tracking_topic: String,
    #[serde(default = "default_target_topic")]
    pub target_topic: String,
}

fn default_app_name() -> String {
    "pan-tracker".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_wait_to_zero() -> u64 {
    9000
}

fn default_true() -> bool {
    true
}

fn default_test_interval() -> u64 {
    3000
}

fn default_serial_port() -> String {
    "/dev/tty.usbserial-6".to_string()
}

fn default_baudrate() -> u32 {
    9600
}

fn default_reopen_interval() -> u64 {
    2000
}

fn default_bus_host() -> String {
    "localhost".to_string()
}

fn default_bus_port() -> u16 {
    1883
}

fn default_bus_username() -> Option<String> {
    Some("tether".to_string())
}

fn default_bus_password() -> Option<String> {
    Some("sp_ceB0ss!".to_string())
}

fn default_client_id() -> String {
    "trackingToMotor".to_string()
}

fn default_tracking_topic() -> String {
    "+/+/smoothedTrackedPoints".to_string()
}

fn default_target_topic() -> String {
    "+/+/subjectTargetIds".to_string()
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baudrate: default_baudrate(),
            reopen_interval: default_reopen_interval(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: default_bus_host(),
            port: default_bus_port(),
            username: default_bus_username(),
            password: default_bus_password(),
            client_id: default_client_id(),
            tracking_topic: default_tracking_topic(),
            target_topic: default_target_topic(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            loglevel: default_loglevel(),
            serial: SerialConfig::default(),
            bus: BusConfig::default(),
            wait_to_zero: default_wait_to_zero(),
            flip_direction: true,
            test_mode: false,
            test_interval: default_test_interval(),
            command_gate: CommandGate::default(),
        }
    }
}

impl AppConfig {
    /// Check values that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            bail!("serial.port must not be empty");
        }
        if self.serial.baudrate == 0 {
            bail!("serial.baudrate must be greater than zero");
        }
        if self.test_interval == 0 {
            bail!("testInterval must be greater than zero");
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.loglevel)
            .map_err(|_| anyhow!("Unknown loglevel: {:?}", self.loglevel))
    }

    /// Settings consumed by the control loop
    pub fn control(&self) -> ControlConfig {
        ControlConfig::new()
            .with_flip_direction(self.flip_direction)
            .with_test_mode(self.test_mode)
            .with_command_gate(self.command_gate)
            .with_wait_to_zero(self.wait_to_zero)
    }

    /// Copy safe to print: credentials are masked
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        if copy.bus.password.is_some() {
            copy.bus.password = Some("***".to_string());
        }
        copy
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            loglevel = "debug"
            waitToZero = 5000
            flipDirection = false
            testMode = true
            commandGate = "until-zeroed"

            [serial]
            port = "/dev/ttyUSB0"
            baudrate = 115200

            [bus]
            host = "broker.local"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baudrate, 115200);
        assert_eq!(config.serial.reopen_interval, 2000);
        assert_eq!(config.bus.host, "broker.local");
        assert_eq!(config.bus.port, 1883);
        assert_eq!(config.wait_to_zero, 5000);
        assert!(!config.flip_direction);
        assert!(config.test_mode);
        assert_eq!(config.command_gate, CommandGate::UntilZeroed);
        assert_eq!(config.log_level().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.serial.port, "/dev/tty.usbserial-6");
        assert_eq!(config.serial.baudrate, 9600);
        assert_eq!(config.wait_to_zero, 9000);
        assert!(config.flip_direction);
        assert!(!config.test_mode);
        assert_eq!(config.test_interval, 3000);
        assert_eq!(config.bus.tracking_topic, "+/+/smoothedTrackedPoints");
        assert_eq!(config.bus.target_topic, "+/+/subjectTargetIds");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.serial.baudrate = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.loglevel = "chatty".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.test_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_control_config_mapping() {
        let mut config = AppConfig::default();
        config.flip_direction = false;
        config.wait_to_zero = 0;

        let control = config.control();
        assert!(!control.flip_direction);
        assert_eq!(control.wait_to_zero_ms, 0);
    }

    #[test]
    fn test_redacted_masks_password() {
        let config = AppConfig::default();
        assert_eq!(config.redacted().bus.password.as_deref(), Some("***"));
        assert_eq!(config.bus.password.as_deref(), Some("sp_ceB0ss!"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "testInterval = 500\n[serial]\nport = \"COM3\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.test_interval, 500);
        assert_eq!(config.serial.port, "COM3");

        assert!(load_config(Path::new("/nonexistent/pan-tracker.toml")).is_err());
    }
}
