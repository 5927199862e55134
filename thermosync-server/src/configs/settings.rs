use std::fs;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thermosync_api::models::TemperatureBounds;
use thermosync_api::schedule::DEFAULT_OVERRIDE_HOLD;
use time::macros::format_description;
use time::UtcOffset;

use crate::errors::ConfigError;

const DEFAULT_CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../configs/default.toml"));

/// Longest accepted relay delay or control interval, in seconds.
pub const MAX_DELAY: u64 = 24 * 60 * 60;

/// Longest accepted override hold, in seconds.
pub const MAX_OVERRIDE_HOLD: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Relay timing, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hvac {
    pub switch_interval: u64,
    pub fan_on_delay: u64,
    pub fan_off_delay: u64,
}

impl Default for Hvac {
    fn default() -> Self {
        Self {
            switch_interval: 120,
            fan_on_delay: 15,
            fan_off_delay: 30,
        }
    }
}

impl Hvac {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("hvac.switch_interval", self.switch_interval, 0, MAX_DELAY)?;
        check_range("hvac.fan_on_delay", self.fan_on_delay, 0, MAX_DELAY)?;
        check_range("hvac.fan_off_delay", self.fan_off_delay, 0, MAX_DELAY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Seconds a reading is served from cache
    pub cache_ttl: u64,
    /// Added to every temperature reading, °F
    pub temperature_correction: f64,
    /// Added to every humidity reading, %
    pub humidity_correction: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            cache_ttl: 20,
            temperature_correction: 0.0,
            humidity_correction: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Control {
    /// Seconds between two sensor samples
    pub interval: u64,
    /// Global lower bound for every mode
    pub min_temp: f64,
    /// Global upper bound for every mode
    pub max_temp: f64,
    /// Seconds a temporary override lasts when nothing is scheduled after it
    pub override_hold: u64,
    /// Fixed local offset as `[+-]HH:MM`, never adjusted for daylight saving.
    /// Takes precedence over `timezone`.
    pub utc_offset: Option<String>,
    /// IANA zone such as `America/New_York`; the host zone is used when
    /// neither this nor `utc_offset` is set
    pub timezone: Option<String>,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            interval: 60,
            min_temp: 60.0,
            max_temp: 85.0,
            override_hold: DEFAULT_OVERRIDE_HOLD.whole_seconds() as u64,
            utc_offset: None,
            timezone: None,
        }
    }
}

impl Control {
    pub fn bounds(&self) -> TemperatureBounds {
        TemperatureBounds {
            min_temp: self.min_temp,
            max_temp: self.max_temp,
        }
    }

    pub fn utc_offset(&self) -> Result<Option<UtcOffset>, ConfigError> {
        let Some(offset) = &self.utc_offset else {
            return Ok(None);
        };

        UtcOffset::parse(
            offset,
            format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
        )
        .map(Some)
        .map_err(|_| ConfigError::UtcOffset(offset.clone()))
    }

    pub fn timezone(&self) -> Result<Option<Tz>, ConfigError> {
        let Some(name) = &self.timezone else {
            return Ok(None);
        };

        name.parse::<Tz>()
            .map(Some)
            .map_err(|_| ConfigError::TimeZone(name.clone()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range("control.interval", self.interval, 1, MAX_DELAY)?;
        check_range("control.override_hold", self.override_hold, 1, MAX_OVERRIDE_HOLD)?;
        self.utc_offset()?;
        self.timezone()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    /// CSV activity file; activity goes to the log when absent
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// sqlx connection url
    pub url: String,
    /// Drop and recreate every table at startup
    pub clean_start: bool,
    /// Connections opened up front and kept for the lifetime of the pool
    pub connections: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite://thermosync.db?mode=rwc".to_string(),
            clean_start: false,
            connections: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub hvac: Hvac,
    pub sensor: SensorSettings,
    pub control: Control,
    pub report: Report,
    pub database: Database,
    pub zones: Vec<ZoneConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logger: Logger::default(),
            hvac: Hvac::default(),
            sensor: SensorSettings::default(),
            control: Control::default(),
            report: Report::default(),
            database: Database::default(),
            zones: vec![ZoneConfig { name: "main".to_string() }],
        }
    }
}

impl Settings {
    /// Settings shipped in `configs/default.toml`.
    pub fn new() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_CONFIG)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hvac.validate()?;
        self.control.validate()
    }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_matches_defaults() {
        let settings = Settings::new().unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse(
            r#"
            [hvac]
            switch_interval = 300

            [[zones]]
            name = "upstairs"

            [[zones]]
            name = "basement"
            "#,
        )
        .unwrap();

        assert_eq!(settings.hvac.switch_interval, 300);
        assert_eq!(settings.hvac.fan_off_delay, 30);
        assert_eq!(settings.control, Control::default());
        assert_eq!(settings.zones.len(), 2);
    }

    #[test]
    fn test_utc_offset() {
        let mut control = Control::default();
        assert_eq!(control.utc_offset().unwrap(), None);

        control.utc_offset = Some("-05:30".to_string());
        assert_eq!(
            control.utc_offset().unwrap(),
            Some(UtcOffset::from_hms(-5, -30, 0).unwrap())
        );

        control.utc_offset = Some("five".to_string());
        assert!(matches!(control.utc_offset(), Err(ConfigError::UtcOffset(_))));
    }

    #[test]
    fn test_rejects_bad_offset() {
        let result = Settings::parse("[control]\nutc_offset = \"25:00\"");

        assert!(result.is_err());
    }

    #[test]
    fn test_timezone() {
        let mut control = Control::default();
        assert_eq!(control.timezone().unwrap(), None);

        control.timezone = Some("Europe/Helsinki".to_string());
        assert_eq!(control.timezone().unwrap(), Some(chrono_tz::Europe::Helsinki));

        assert!(matches!(
            Settings::parse("[control]\ntimezone = \"Mars/Olympus\""),
            Err(ConfigError::TimeZone(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            Settings::parse("[control]\noverride_hold = 18446744073709551615"),
            Err(ConfigError::Parse(_)) | Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            Settings::parse("[control]\noverride_hold = 9223372036854775807"),
            Err(ConfigError::OutOfRange { name: "control.override_hold", .. })
        ));
        assert!(matches!(
            Settings::parse("[control]\ninterval = 0"),
            Err(ConfigError::OutOfRange { name: "control.interval", .. })
        ));
        assert!(matches!(
            Settings::parse("[control]\ninterval = 31536000"),
            Err(ConfigError::OutOfRange { name: "control.interval", .. })
        ));
        assert!(matches!(
            Settings::parse("[hvac]\nswitch_interval = 9223372036854775807"),
            Err(ConfigError::OutOfRange { name: "hvac.switch_interval", .. })
        ));

        assert!(Settings::parse("[control]\noverride_hold = 86400\ninterval = 30").is_ok());
    }

    #[test]
    fn test_database_section() {
        let settings = Settings::parse(
            r#"
            [database]
            url = "sqlite::memory:"
            clean_start = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.database.url, "sqlite::memory:");
        assert!(settings.database.clean_start);
        assert_eq!(settings.database.connections, 4);
    }
}
