use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

use crate::sensors::mics6814::FirmwareVersion;

/// Errors raised by a MiCS-6814 device session
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("I2C communication failed: {0}")]
    Bus(ErrorKind),

    #[error("Device at {address:#04x} did not acknowledge the indicator after {attempts} attempts")]
    DeviceUnresponsive { address: u8, attempts: u8 },

    #[error("Unsupported firmware version {found:?}: only V2 boards are supported")]
    UnsupportedVersion { found: FirmwareVersion },

    #[error("Invalid 7-bit I2C address {address:#04x}")]
    InvalidAddress { address: u8 },

    #[error("Readings did not settle after {cycles} sampling cycles")]
    SampleTimeout { cycles: u32 },
}

impl From<ErrorKind> for SensorError {
    fn from(kind: ErrorKind) -> Self {
        SensorError::Bus(kind)
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Bus '{bus}' could not be opened at '{path}': {reason}")]
    BusOpenError { bus: String, path: String, reason: String },

    #[error("Bus '{bus}' not found or unavailable")]
    BusNotFound { bus: String },

    #[error("Unsupported sensor driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("Sensor '{sensor}' initialization failed: {source}")]
    InitError {
        sensor: String,
        #[source]
        source: SensorError,
    },

    #[error("Sensor '{sensor}' bring-up task failed: {reason}")]
    TaskError { sensor: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type aliases for convenience
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
