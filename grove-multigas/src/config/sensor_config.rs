use serde::Deserialize;
use std::time::Duration;

use crate::bus::i2c::DEFAULT_ADDRESS;
use crate::errors::{ConfigError, ConfigResult};
use crate::sensors::{GasType, SamplingConfig};

/// Root configuration struct expecting `[[sensor]]` TOML array format
#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorEntry>,
}

/// One sensor entry, matching each `[[sensor]]` section
#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub driver: String,
    pub bus: String,
    #[serde(default = "default_address")]
    pub address: u8,
    /// Pause in seconds between the end of one sample and the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run the 30 minute conditioning cycle before the first sample
    #[serde(default)]
    pub warmup: bool,
    /// Store a fresh clean-air baseline before the first sample
    #[serde(default)]
    pub calibrate: bool,
    #[serde(default = "default_gases")]
    pub gases: Vec<GasType>,
    pub max_settle_cycles: Option<u32>,
}

fn default_address() -> u8 {
    DEFAULT_ADDRESS
}

fn default_interval_secs() -> u64 {
    60
}

fn default_gases() -> Vec<GasType> {
    GasType::ALL.to_vec()
}

impl SensorEntry {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            max_settle_cycles: self.max_settle_cycles,
        }
    }
}

impl SensorConfig {
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let parsed: SensorConfig = toml::from_str(content)?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (i, sensor) in self.sensors.iter().enumerate() {
            if self.sensors[..i].iter().any(|s| s.id == sensor.id) {
                return Err(invalid("sensor.id", format!("duplicate sensor id '{}'", sensor.id)));
            }
            if sensor.interval_secs == 0 {
                return Err(invalid(
                    "sensor.interval_secs",
                    format!("'{}' must sample at least every second", sensor.id),
                ));
            }
            if !(0x03..=0x77).contains(&sensor.address) {
                return Err(invalid(
                    "sensor.address",
                    format!("'{}' has invalid 7-bit address {:#04x}", sensor.id, sensor.address),
                ));
            }
            if sensor.max_settle_cycles == Some(0) {
                return Err(invalid(
                    "sensor.max_settle_cycles",
                    format!("'{}' would never settle", sensor.id),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason,
    }
}

/// Loads config from TOML file
pub fn load_sensor_config(path: &str) -> ConfigResult<SensorConfig> {
    let content = super::read_config_file(path)?;
    SensorConfig::parse(&content)
}
