//! Device session for the Grove Multichannel Gas Sensor v2 (MiCS-6814).
//!
//! A session owns the bus, the delay provider and the baseline (R0) of the
//! three sensing channels. It is created by [`Mics6814::begin`], which proves
//! the board answers, checks the firmware and loads the stored baseline, and
//! it ends with [`Mics6814::shutdown`], which hands the bus back.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bus::i2c::{command, EepromSlot, I2CBus};
use crate::errors::{SensorError, SensorResult};
use crate::sensors::conversion::{self, GasType, INVALID_CONCENTRATION};
use crate::sensors::sampling::{SampleReading, SamplingConfig};

/// Signature stored by v2 firmware in the first memory slot
pub const V2_SIGNATURE: u16 = 0x0466;

/// Number of indicator round-trips tried before giving up on the board
pub const BRING_UP_ATTEMPTS: u8 = 10;

const BRING_UP_SETTLE_MS: u32 = 50;
const ADDRESS_SETTLE_MS: u32 = 5;

/// Firmware generation reported by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirmwareVersion {
    Unknown = 0,
    V1 = 1,
    V2 = 2,
}

impl FirmwareVersion {
    pub fn from_signature(signature: u16) -> Self {
        match signature {
            V2_SIGNATURE => FirmwareVersion::V2,
            0xFFFF => FirmwareVersion::Unknown,
            _ => FirmwareVersion::V1,
        }
    }
}

/// Contents of the board's persistent memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub i2c_address: u16,
    pub factory_baseline: [u16; 3],
    pub user_baseline: [u16; 3],
}

/// MiCS-6814 session bound to one board address
pub struct Mics6814<I2C, D> {
    pub(crate) bus: I2CBus<I2C>,
    pub(crate) delay: D,
    pub(crate) address: u8,
    pub(crate) version: FirmwareVersion,
    pub(crate) baseline: [u16; 3],
    pub(crate) last_sample: Option<SampleReading>,
    pub(crate) sampling: SamplingConfig,
}

impl<I2C: I2c, D: DelayNs> Mics6814<I2C, D> {
    /// Bring the board up at `address` and load its stored baseline.
    ///
    /// Leaves heater and indicator off on success. Only the bring-up round
    /// trip and the memory reads are fatal; a failed switch-off is logged.
    pub fn begin(i2c: I2C, delay: D, address: u8) -> SensorResult<Self> {
        let mut sensor = Self {
            bus: I2CBus::new(i2c),
            delay,
            address,
            version: FirmwareVersion::Unknown,
            baseline: [0; 3],
            last_sample: None,
            sampling: SamplingConfig::default(),
        };

        sensor.check_responsive()?;

        let version = sensor.read_version()?;
        if version != FirmwareVersion::V2 {
            return Err(SensorError::UnsupportedVersion { found: version });
        }
        sensor.version = version;

        sensor.best_effort("indicator off", Self::indicator_off);
        sensor.best_effort("heater off", Self::heater_off);

        for (channel, slot) in EepromSlot::USER_BASELINE.into_iter().enumerate() {
            sensor.baseline[channel] = sensor.read_eeprom(slot)?;
        }

        info!(
            "[mics6814@{:#04x}] ready, firmware {:?}, baseline {:?}",
            sensor.address, sensor.version, sensor.baseline
        );
        Ok(sensor)
    }

    /// Replace the sampling settings used by `sample` and `calibrate`
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Blink the indicator until one "on" command goes through
    fn check_responsive(&mut self) -> SensorResult<()> {
        for attempt in 1..=BRING_UP_ATTEMPTS {
            let ready = self.indicator_on().is_ok();
            self.delay.delay_ms(BRING_UP_SETTLE_MS);
            let _ = self.indicator_off();
            self.delay.delay_ms(BRING_UP_SETTLE_MS);

            if ready {
                debug!("[mics6814@{:#04x}] answered on attempt {}", self.address, attempt);
                return Ok(());
            }
        }

        Err(SensorError::DeviceUnresponsive {
            address: self.address,
            attempts: BRING_UP_ATTEMPTS,
        })
    }

    /// Switch everything off and hand back the bus and delay
    pub fn shutdown(mut self) -> (I2C, D) {
        if let Err(e) = self.indicator_off() {
            warn!("[mics6814@{:#04x}] indicator off failed during shutdown: {}", self.address, e);
        }
        if let Err(e) = self.heater_off() {
            warn!("[mics6814@{:#04x}] heater off failed during shutdown: {}", self.address, e);
        }
        info!("[mics6814@{:#04x}] released", self.address);
        (self.bus.into_inner(), self.delay)
    }

    /// Reprogram the board's own slave address
    pub fn set_address(&mut self, new_address: u8) -> SensorResult<()> {
        if !(0x03..=0x77).contains(&new_address) {
            return Err(SensorError::InvalidAddress { address: new_address });
        }

        self.bus
            .write_command(self.address, command::CHANGE_I2C_ADDR, new_address)?;
        info!("[mics6814@{:#04x}] moved to {:#04x}", self.address, new_address);
        self.address = new_address;
        self.delay.delay_ms(ADDRESS_SETTLE_MS);
        Ok(())
    }

    pub fn heater_on(&mut self) -> SensorResult<()> {
        self.control(command::CONTROL_PWR, true)
    }

    pub fn heater_off(&mut self) -> SensorResult<()> {
        self.control(command::CONTROL_PWR, false)
    }

    pub fn indicator_on(&mut self) -> SensorResult<()> {
        self.control(command::CONTROL_LED, true)
    }

    pub fn indicator_off(&mut self) -> SensorResult<()> {
        self.control(command::CONTROL_LED, false)
    }

    fn control(&mut self, opcode: u8, on: bool) -> SensorResult<()> {
        self.bus
            .write_command(self.address, opcode, u8::from(on))
            .map_err(SensorError::from)
    }

    /// Read the firmware generation from the signature slot
    pub fn read_version(&mut self) -> SensorResult<FirmwareVersion> {
        let signature = self.read_eeprom(EepromSlot::Signature)?;
        Ok(FirmwareVersion::from_signature(signature))
    }

    pub fn read_eeprom(&mut self, slot: EepromSlot) -> SensorResult<u16> {
        let value = self.bus.read_word(
            &mut self.delay,
            self.address,
            command::READ_EEPROM,
            Some(slot.offset()),
        )?;
        Ok(value)
    }

    /// Snapshot of the stored address and both baseline sets
    pub fn device_config(&mut self) -> SensorResult<DeviceConfig> {
        let mut factory_baseline = [0u16; 3];
        let mut user_baseline = [0u16; 3];
        for channel in 0..3 {
            factory_baseline[channel] = self.read_eeprom(EepromSlot::FACTORY_BASELINE[channel])?;
            user_baseline[channel] = self.read_eeprom(EepromSlot::USER_BASELINE[channel])?;
        }

        Ok(DeviceConfig {
            i2c_address: self.read_eeprom(EepromSlot::I2cAddress)?,
            factory_baseline,
            user_baseline,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn version(&self) -> FirmwareVersion {
        self.version
    }

    /// Baseline (R0) currently used for conversions
    pub fn baseline(&self) -> [u16; 3] {
        self.baseline
    }

    /// Most recent completed sample, if any
    pub fn last_sample(&self) -> Option<&SampleReading> {
        self.last_sample.as_ref()
    }

    /// Concentration of `gas` in ppm from the last sample, `None` when the
    /// reading is outside the curve's domain or nothing was sampled yet
    pub fn try_get(&self, gas: GasType) -> Option<f32> {
        let sample = self.last_sample.as_ref()?;
        conversion::concentration(gas, &sample.raw, &self.baseline)
    }

    /// Like [`Self::try_get`] but reports invalid readings as `-3.0`
    pub fn get(&self, gas: GasType) -> f32 {
        self.try_get(gas).unwrap_or(INVALID_CONCENTRATION)
    }

    /// Concentrations of several gases from the last sample
    pub fn concentrations(&self, gases: &[GasType]) -> Vec<(GasType, Option<f32>)> {
        gases.iter().map(|&gas| (gas, self.try_get(gas))).collect()
    }
}
