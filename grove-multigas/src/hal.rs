/// Hardware Abstraction Layer (HAL) for the supported host platforms
///
/// The driver itself only needs `embedded_hal::i2c::I2c` and
/// `embedded_hal::delay::DelayNs`; this module names the concrete types
/// the hub uses on each platform.

#[cfg(feature = "linux-hal")]
pub mod linux {
    // Re-export linux-embedded-hal types directly
    pub use linux_embedded_hal::i2cdev::linux::LinuxI2CError as I2CError;
    pub use linux_embedded_hal::Delay;
    pub use linux_embedded_hal::I2cdev as I2CDevice;

    /// Open an I2C character device such as `/dev/i2c-1`
    pub fn open_bus(path: &str) -> Result<I2CDevice, I2CError> {
        I2CDevice::new(path)
    }
}

// Re-export the active platform's HAL
#[cfg(feature = "linux-hal")]
pub use linux::*;
