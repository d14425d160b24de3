pub mod conversion;
pub mod mics6814;
pub mod sampling;

pub use conversion::{GasType, INVALID_CONCENTRATION};
pub use mics6814::{DeviceConfig, FirmwareVersion, Mics6814};
pub use sampling::{SampleReading, SamplingConfig, StabilityDetector};

use crate::errors::{RegistryError, RegistryResult};

/// Driver names accepted in `sensors.toml`
pub const SUPPORTED_DRIVERS: &[&str] = &["mics6814"];

pub fn check_driver(driver: &str) -> RegistryResult<()> {
    if SUPPORTED_DRIVERS.contains(&driver) {
        Ok(())
    } else {
        Err(RegistryError::UnsupportedDriver { driver: driver.to_string() })
    }
}
