use serde::Deserialize;

use crate::errors::{ConfigError, ConfigResult};

/// Root structure for loading `[[bus]]` style TOML config
#[derive(Debug, Deserialize)]
pub struct BusConfig {
    #[serde(rename = "bus")]
    pub buses: Vec<BusEntry>,
}

/// One bus entry, e.g. `/dev/i2c-1`
#[derive(Debug, Clone, Deserialize)]
pub struct BusEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String, // 'type' is a reserved word in Rust, use raw identifier
    pub path: String,
}

impl BusConfig {
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let parsed: BusConfig = toml::from_str(content)?;
        for (i, bus) in parsed.buses.iter().enumerate() {
            if parsed.buses[..i].iter().any(|b| b.id == bus.id) {
                return Err(ConfigError::InvalidValue {
                    field: "bus.id".to_string(),
                    reason: format!("duplicate bus id '{}'", bus.id),
                });
            }
        }
        Ok(parsed)
    }

    pub fn find(&self, id: &str) -> Option<&BusEntry> {
        self.buses.iter().find(|b| b.id == id)
    }
}

/// Load bus config file
pub fn load_bus_config(path: &str) -> ConfigResult<BusConfig> {
    let content = super::read_config_file(path)?;
    BusConfig::parse(&content)
}
