use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thermosync_server::errors::ConfigError;

const DEFAULT_CONFIG: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../",
    "configs/default.toml"
));

/// Thermal model of one simulated room. Rates are in °F per simulated
/// minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Simulation {
    pub outdoor_temp: f64,
    pub initial_temp: f64,
    /// Fraction of the indoor/outdoor difference leaking in per minute
    pub leakage: f64,
    pub ac_rate: f64,
    pub heat_rate: f64,
    /// Standard deviation of the sensor noise
    pub noise: f64,
    pub humidity: f64,
    /// Simulated minutes per real minute
    pub time_scale: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            outdoor_temp: 92.0,
            initial_temp: 78.0,
            leakage: 0.02,
            ac_rate: 0.6,
            heat_rate: 0.8,
            noise: 0.1,
            humidity: 45.0,
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub server: thermosync_server::configs::Settings,
    #[serde(default)]
    pub simulation: Simulation,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_CONFIG)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.server.validate()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file() {
        let settings = Settings::new().unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_simulation_section() {
        let settings = Settings::parse(
            r#"
            [hvac]
            switch_interval = 10

            [[zones]]
            name = "lab"

            [simulation]
            outdoor_temp = 40.0
            time_scale = 60.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.hvac.switch_interval, 10);
        assert_eq!(settings.server.zones[0].name, "lab");
        assert_eq!(settings.simulation.outdoor_temp, 40.0);
        assert_eq!(settings.simulation.time_scale, 60.0);
        assert_eq!(settings.simulation.leakage, 0.02);
    }
}
