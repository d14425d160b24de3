//! Command framing for the Grove Multichannel Gas Sensor v2 firmware.
//!
//! The board's microcontroller speaks a tiny command protocol: a one byte
//! opcode optionally followed by parameter bytes. Commands that return data
//! answer with a big-endian 16-bit word which must be fetched with a separate
//! read after a short settle delay.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Default slave address of the board
pub const DEFAULT_ADDRESS: u8 = 0x04;

/// Delay between a command write and the matching response read
pub const RESPONSE_DELAY_MS: u32 = 5;

/// Data bytes of a block write: two per channel
pub const BLOCK_LEN: usize = 6;

/// Command opcodes understood by the board firmware
pub mod command {
    pub const READ_ADC_CH0: u8 = 0x01;
    pub const READ_ADC_CH1: u8 = 0x02;
    pub const READ_ADC_CH2: u8 = 0x03;
    pub const CHANGE_I2C_ADDR: u8 = 0x05;
    pub const READ_EEPROM: u8 = 0x06;
    pub const SET_R0: u8 = 0x07;
    pub const CONTROL_LED: u8 = 0x0A;
    pub const CONTROL_PWR: u8 = 0x0B;

    /// ADC read opcodes indexed by channel
    pub const READ_ADC: [u8; 3] = [READ_ADC_CH0, READ_ADC_CH1, READ_ADC_CH2];
}

/// Slots of the board's persistent memory, addressed through `READ_EEPROM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EepromSlot {
    /// Firmware signature, `0x0466` on v2 boards
    Signature = 0x00,
    FactoryAdcCh0 = 0x02,
    FactoryAdcCh1 = 0x04,
    FactoryAdcCh2 = 0x06,
    UserAdcCh0 = 0x08,
    UserAdcCh1 = 0x0A,
    UserAdcCh2 = 0x0C,
    I2cAddress = 0x14,
}

impl EepromSlot {
    pub const FACTORY_BASELINE: [EepromSlot; 3] = [
        EepromSlot::FactoryAdcCh0,
        EepromSlot::FactoryAdcCh1,
        EepromSlot::FactoryAdcCh2,
    ];

    pub const USER_BASELINE: [EepromSlot; 3] = [
        EepromSlot::UserAdcCh0,
        EepromSlot::UserAdcCh1,
        EepromSlot::UserAdcCh2,
    ];

    pub fn offset(self) -> u8 {
        self as u8
    }
}

/// I2C bus wrapper speaking the board's command protocol
pub struct I2CBus<I2C> {
    device: I2C,
}

impl<I2C: I2c> I2CBus<I2C> {
    pub fn new(device: I2C) -> Self {
        Self { device }
    }

    /// Send an opcode with a single parameter byte
    pub fn write_command(&mut self, address: u8, opcode: u8, param: u8) -> Result<(), ErrorKind> {
        self.device
            .write(address, &[opcode, param])
            .map_err(|e| e.kind())
    }

    /// Send an opcode followed by one big-endian word per channel
    pub fn write_block(
        &mut self,
        address: u8,
        opcode: u8,
        data: &[u8; BLOCK_LEN],
    ) -> Result<(), ErrorKind> {
        let mut frame = [0u8; BLOCK_LEN + 1];
        frame[0] = opcode;
        frame[1..].copy_from_slice(data);
        self.device.write(address, &frame).map_err(|e| e.kind())
    }

    /// Issue a command and read back its 16-bit big-endian answer
    pub fn read_word<D: DelayNs>(
        &mut self,
        delay: &mut D,
        address: u8,
        opcode: u8,
        param: Option<u8>,
    ) -> Result<u16, ErrorKind> {
        match param {
            Some(p) => self.device.write(address, &[opcode, p]),
            None => self.device.write(address, &[opcode]),
        }
        .map_err(|e| e.kind())?;

        delay.delay_ms(RESPONSE_DELAY_MS);

        let mut buf = [0u8; 2];
        self.device.read(address, &mut buf).map_err(|e| e.kind())?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Consume self and return the underlying device
    pub fn into_inner(self) -> I2C {
        self.device
    }
}
