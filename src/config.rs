//! Daemon configuration.
//!
//! All settings come from a TOML file; every section has working defaults so
//! a missing file still produces a runnable single-robot configuration.

use serde::Deserialize;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Fleet size must be positive.
    #[error("nb_robots must be positive")]
    EmptyFleet,
    /// Robot id must be within the fleet.
    #[error("robot_id {id} out of range for a fleet of {nb}")]
    RobotIdOutOfRange {
        /// Configured robot id.
        id: u32,
        /// Configured fleet size.
        nb: u32,
    },
    /// Timer periods must be positive.
    #[error("timer periods must be positive")]
    ZeroPeriod,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fleet membership.
    pub fleet: FleetConfig,
    /// Back-end timing.
    pub backend: BackendConfig,
    /// Default measurement noise.
    pub noise: NoiseConfig,
    /// Transport settings.
    pub network: NetworkConfig,
}

impl Config {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fleet.nb_robots == 0 {
            return Err(ConfigError::EmptyFleet);
        }
        if self.fleet.robot_id >= self.fleet.nb_robots {
            return Err(ConfigError::RobotIdOutOfRange {
                id: self.fleet.robot_id,
                nb: self.fleet.nb_robots,
            });
        }
        if self.backend.process_period_ms == 0 || self.backend.optimization_loop_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

/// Fleet membership.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of robots in the fleet.
    pub nb_robots: u32,
    /// This robot's id, `< nb_robots`.
    pub robot_id: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            nb_robots: 1,
            robot_id: 0,
        }
    }
}

/// Back-end timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Trigger-tick period: how often a new round may start.
    pub process_period_ms: u64,
    /// Loop-tick period: how often in-progress rounds advance.
    pub optimization_loop_period_ms: u64,
    /// Hard deadline for any wait within a round.
    pub max_waiting_time_sec: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            process_period_ms: 1000,
            optimization_loop_period_ms: 100,
            max_waiting_time_sec: 60,
        }
    }
}

/// Default measurement noise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Rotation sigma in radians.
    pub rotation_std: f64,
    /// Translation sigma in meters.
    pub translation_std: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            rotation_std: 0.01,
            translation_std: 0.1,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP bind address.
    pub bind_addr: String,
    /// Peer addresses for the rest of the fleet.
    pub peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7600".to_string(),
            peers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_robot_id_out_of_range() {
        let mut config = Config::default();
        config.fleet.nb_robots = 2;
        config.fleet.robot_id = 2;
        assert_eq!(
            config.validate(),
            Err(ConfigError::RobotIdOutOfRange { id: 2, nb: 2 })
        );
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut config = Config::default();
        config.backend.process_period_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPeriod));
    }

    #[test]
    fn test_toml_parse() {
        let toml = r#"
            [fleet]
            nb_robots = 3
            robot_id = 1

            [backend]
            process_period_ms = 500
            max_waiting_time_sec = 30

            [network]
            bind_addr = "0.0.0.0:7601"
            peers = ["10.0.0.1:7600", "10.0.0.3:7600"]
        "#;
        let config: Config = basic_toml::from_str(toml).unwrap();
        assert_eq!(config.fleet.nb_robots, 3);
        assert_eq!(config.fleet.robot_id, 1);
        assert_eq!(config.backend.process_period_ms, 500);
        // Unspecified fields keep their defaults.
        assert_eq!(config.backend.optimization_loop_period_ms, 100);
        assert_eq!(config.network.peers.len(), 2);
        assert!(config.validate().is_ok());
    }
}
