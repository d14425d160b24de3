/// Board-specific constants and configuration for a Raspberry Pi carrying
/// the Grove Multichannel Gas Sensor v2 (MiCS-6814 behind an I2C bridge MCU)
/// on `/dev/i2c-1`.

/// Default configuration directory (embedded at compile time)
pub const CONFIG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config");

/// Embedded TOML configurations
pub const BUSES_TOML: &str = include_str!("../config/buses.toml");
pub const SENSORS_TOML: &str = include_str!("../config/sensors.toml");

/// Board name
pub const BOARD_NAME: &str = "Grove-Multichannel-v2";

/// Get the configuration path (allow override via CONFIG_PATH env var)
pub fn get_config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| CONFIG_DIR.to_string())
}

/// Hub identifier stamped on every reading (allow override via DEVICE_ID env var)
pub fn get_device_id() -> String {
    std::env::var("DEVICE_ID").unwrap_or_else(|_| "grove_multigas".to_string())
}
