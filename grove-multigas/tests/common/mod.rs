//! Simulated Grove Multichannel Gas Sensor v2 and a delay that only counts time.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use grove_multigas::bus::i2c::{command, DEFAULT_ADDRESS};

pub const V2_SIGNATURE: u16 = 0x0466;

#[derive(Debug)]
pub struct BoardState {
    pub address: u8,
    pub eeprom: HashMap<u8, u16>,
    /// Upcoming ADC triples; the last one served repeats once this runs dry
    pub adc: VecDeque<[u16; 3]>,
    pub current: [u16; 3],
    pub heater: bool,
    pub led: bool,
    /// Number of upcoming "LED on" commands to NACK
    pub led_on_failures: u32,
    /// NACK every LED and heater command
    pub reject_controls: bool,
    /// NACK every write starting with this opcode
    pub fail_opcode: Option<u8>,
    /// Fail ADC reads once this many triples were served
    pub fail_adc_after: Option<usize>,
    pub adc_reads: usize,
    pub led_on_commands: usize,
    pub writes: Vec<Vec<u8>>,
    pending: Option<u16>,
}

impl BoardState {
    fn handle_write(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        self.writes.push(bytes.to_vec());
        let (&opcode, params) = bytes.split_first().ok_or(ErrorKind::Other)?;
        let param = params.first().copied();

        if self.fail_opcode == Some(opcode) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }

        match opcode {
            command::READ_ADC_CH0 => {
                if self.fail_adc_after.is_some_and(|limit| self.adc_reads >= limit) {
                    return Err(ErrorKind::Other);
                }
                if let Some(next) = self.adc.pop_front() {
                    self.current = next;
                }
                self.adc_reads += 1;
                self.pending = Some(self.current[0]);
            }
            command::READ_ADC_CH1 => self.pending = Some(self.current[1]),
            command::READ_ADC_CH2 => self.pending = Some(self.current[2]),
            command::READ_EEPROM => {
                let slot = param.ok_or(ErrorKind::Other)?;
                self.pending = Some(self.eeprom.get(&slot).copied().unwrap_or(0xFFFF));
            }
            command::SET_R0 => {
                if params.len() != 6 {
                    return Err(ErrorKind::Other);
                }
                for (channel, slot) in [0x08u8, 0x0A, 0x0C].into_iter().enumerate() {
                    let value = u16::from_be_bytes([params[channel * 2], params[channel * 2 + 1]]);
                    self.eeprom.insert(slot, value);
                }
            }
            command::CONTROL_LED => {
                if self.reject_controls {
                    return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                }
                let on = param.ok_or(ErrorKind::Other)? == 1;
                if on && self.led_on_failures > 0 {
                    self.led_on_failures -= 1;
                    return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                }
                if on {
                    self.led_on_commands += 1;
                }
                self.led = on;
            }
            command::CONTROL_PWR => {
                if self.reject_controls {
                    return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                }
                self.heater = param.ok_or(ErrorKind::Other)? == 1;
            }
            command::CHANGE_I2C_ADDR => {
                let address = param.ok_or(ErrorKind::Other)?;
                self.address = address;
                self.eeprom.insert(0x14, address as u16);
            }
            _ => return Err(ErrorKind::Other),
        }
        Ok(())
    }

    fn handle_read(&mut self, buf: &mut [u8]) -> Result<(), ErrorKind> {
        let value = self.pending.take().ok_or(ErrorKind::Other)?;
        if buf.len() != 2 {
            return Err(ErrorKind::Other);
        }
        buf.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Control writes (LED / heater) in the order they were sent
    pub fn control_writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|w| matches!(w[0], command::CONTROL_LED | command::CONTROL_PWR))
            .cloned()
            .collect()
    }
}

/// Cloneable handle onto one simulated board
#[derive(Clone, Debug)]
pub struct SimulatedBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoard {
    pub fn with_signature(signature: u16, baseline: [u16; 3]) -> Self {
        let mut eeprom = HashMap::new();
        eeprom.insert(0x00, signature);
        for (channel, value) in baseline.into_iter().enumerate() {
            eeprom.insert(0x02 + 2 * channel as u8, value + 10);
            eeprom.insert(0x08 + 2 * channel as u8, value);
        }
        eeprom.insert(0x14, DEFAULT_ADDRESS as u16);

        Self {
            state: Arc::new(Mutex::new(BoardState {
                address: DEFAULT_ADDRESS,
                eeprom,
                adc: VecDeque::new(),
                current: baseline,
                heater: false,
                led: false,
                led_on_failures: 0,
                reject_controls: false,
                fail_opcode: None,
                fail_adc_after: None,
                adc_reads: 0,
                led_on_commands: 0,
                writes: Vec::new(),
                pending: None,
            })),
        }
    }

    pub fn v2(baseline: [u16; 3]) -> Self {
        Self::with_signature(V2_SIGNATURE, baseline)
    }

    pub fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap()
    }

    /// Queue ADC triples to be served by the next reads
    pub fn script<I: IntoIterator<Item = [u16; 3]>>(&self, readings: I) {
        self.state().adc.extend(readings);
    }

    /// Forget traffic recorded so far
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.writes.clear();
        state.adc_reads = 0;
        state.led_on_commands = 0;
    }
}

impl ErrorType for SimulatedBoard {
    type Error = ErrorKind;
}

impl I2c for SimulatedBoard {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut state = self.state();
        if address != state.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => state.handle_write(bytes)?,
                Operation::Read(buf) => state.handle_read(buf)?,
            }
        }
        Ok(())
    }
}

/// Delay provider that returns immediately and accumulates simulated time
#[derive(Clone, Debug, Default)]
pub struct RecordingDelay {
    elapsed_ns: Arc<AtomicU64>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.load(Ordering::SeqCst) / 1_000_000
    }

    pub fn reset(&self) {
        self.elapsed_ns.store(0, Ordering::SeqCst);
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.fetch_add(ns as u64, Ordering::SeqCst);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns.fetch_add(ms as u64 * 1_000_000, Ordering::SeqCst);
    }
}

/// Simulated milliseconds of one sample that settled after `cycles` reads
pub fn sample_duration_ms(cycles: u64) -> u64 {
    // indicator + cool-down + heater, first read + wait, per-cycle read + wait, switch-off
    10 + 1000 + 10 + (15 + 1000) + cycles * (15 + 1000) + 20
}
