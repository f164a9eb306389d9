//! Configuration loading for the arm daemon

use crate::error::{ArmError, Result};
use crate::status::JOINTS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub coordinator: Option<CoordinatorConfig>,
    pub continuum: ContinuumConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    /// Port of the fixed-size binary status feed.
    pub telemetry_port: u16,
    /// Port commands are written to, one serialized command per write.
    pub command_port: u16,
}

/// Tunables of the command/status coordinator. All optional in the file;
/// accessors fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    pub command_timeout_seconds: Option<u64>,
    pub debounce_ms: Option<u64>,
}

impl CoordinatorConfig {
    /// Deadline for an outstanding command before it is reported TimedOut.
    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.command_timeout_seconds.unwrap_or(30))
    }

    /// How long "all joints steady" must hold before a motion command is
    /// treated as completed.
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms.unwrap_or(500))
    }
}

/// Declarative parameters of the preconfigured sweep motion. Supplied by an
/// external source at startup and treated as already validated; the core
/// does not re-check angle bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContinuumConfig {
    /// Home pose, six joint angles in degrees.
    pub home_position: [f64; JOINTS],
    /// Where the scan collaborators write their output.
    pub work_directory: PathBuf,
    pub scan: ScanConfig,
}

/// Angular sweep bounds in degrees.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    pub min: f64,
    pub max: f64,
}

impl Config {
    /// Load the daemon configuration once at startup.
    pub fn load_from_path(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ArmError::Config(format!("failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        self.coordinator.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let yaml = r#"
connection:
  host: arm.local
  telemetry_port: 30003
  command_port: 30002
coordinator:
  command_timeout_seconds: 10
  debounce_ms: 250
continuum:
  home_position: [0.0, -90.0, 0.0, -90.0, 0.0, 0.0]
  work_directory: /data/scans
  scan:
    min: -45.0
    max: 15.0
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.connection.host, "arm.local");
        assert_eq!(config.coordinator().command_timeout().as_secs(), 10);
        assert_eq!(config.coordinator().debounce().as_millis(), 250);
        assert_eq!(config.continuum.scan.min, -45.0);
        assert_eq!(config.continuum.home_position[1], -90.0);
    }

    #[test]
    fn coordinator_section_is_optional() {
        let yaml = r#"
connection:
  host: 127.0.0.1
  telemetry_port: 30003
  command_port: 30002
continuum:
  home_position: [0, 0, 0, 0, 0, 0]
  work_directory: /tmp
  scan: { min: -10.0, max: 10.0 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.coordinator().command_timeout().as_secs(), 30);
        assert_eq!(config.coordinator().debounce().as_millis(), 500);
    }
}
