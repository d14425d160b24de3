//! Sampling engine: heater cycle, stability detection, warm-up and calibration.
//!
//! Every step is timed through the session's `DelayNs`, so the whole sequence
//! runs against simulated time in tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bus::i2c::{command, BLOCK_LEN};
use crate::errors::{SensorError, SensorResult};
use crate::sensors::mics6814::Mics6814;

/// Consecutive quiet cycles required before a sample is accepted
pub const STABLE_CYCLES: u32 = 20;

/// Largest per-channel change (ADC units) still counted as quiet
pub const STABILITY_THRESHOLD: u16 = 2;

/// Length of the first-use conditioning run
pub const WARMUP_SECONDS: u32 = 30 * 60;

const SWITCH_SETTLE_MS: u32 = 10;
const COOL_DOWN_MS: u32 = 1000;
const CYCLE_MS: u32 = 1000;

/// Stabilised raw ADC triple from one completed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleReading {
    /// Raw 10-bit reading (Rs) per channel
    pub raw: [u16; 3],
    /// Reads taken after the first one before the triple settled
    pub cycles: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Abort a sample after this many settle cycles. `None` waits for
    /// stability indefinitely, like the vendor firmware examples do.
    pub max_settle_cycles: Option<u32>,
}

/// Tracks how long a stream of triples has stayed within the threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityDetector {
    previous: [u16; 3],
    stable_cycles: u32,
    cycles: u32,
}

impl StabilityDetector {
    pub fn new(first: [u16; 3]) -> Self {
        Self {
            previous: first,
            stable_cycles: 0,
            cycles: 0,
        }
    }

    /// Feed one reading, returns true once the stream is stable
    pub fn observe(&mut self, reading: [u16; 3]) -> bool {
        self.cycles += 1;

        let moved = self
            .previous
            .iter()
            .zip(reading.iter())
            .any(|(prev, now)| prev.abs_diff(*now) > STABILITY_THRESHOLD);

        if moved {
            self.previous = reading;
            self.stable_cycles = 0;
        } else {
            self.stable_cycles += 1;
        }

        self.is_stable()
    }

    pub fn is_stable(&self) -> bool {
        self.stable_cycles >= STABLE_CYCLES
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn stable_cycles(&self) -> u32 {
        self.stable_cycles
    }
}

/// Steps of one sample run
#[derive(Debug)]
enum SamplePhase {
    /// Indicator on to mark the board busy
    Indicate,
    /// Heater forced off so every sample starts from the same state
    CoolDown,
    Heat,
    FirstRead,
    Settle(StabilityDetector),
    Finish(SampleReading),
}

impl<I2C: I2c, D: DelayNs> Mics6814<I2C, D> {
    /// Run a heater cycle and read until the three channels settle.
    ///
    /// Heater and indicator toggles are best effort; a failed ADC read ends
    /// the sample with heater and indicator switched off.
    pub fn sample(&mut self) -> SensorResult<SampleReading> {
        info!("[mics6814@{:#04x}] sampling", self.address);

        match self.run_sample() {
            Ok(reading) => {
                self.last_sample = Some(reading);
                info!(
                    "[mics6814@{:#04x}] sample {:?} settled after {} cycles",
                    self.address, reading.raw, reading.cycles
                );
                Ok(reading)
            }
            Err(e) => {
                self.best_effort("heater off", Self::heater_off);
                self.best_effort("indicator off", Self::indicator_off);
                Err(e)
            }
        }
    }

    fn run_sample(&mut self) -> SensorResult<SampleReading> {
        let mut phase = SamplePhase::Indicate;
        loop {
            phase = match phase {
                SamplePhase::Indicate => {
                    self.best_effort("indicator on", Self::indicator_on);
                    self.delay.delay_ms(SWITCH_SETTLE_MS);
                    SamplePhase::CoolDown
                }
                SamplePhase::CoolDown => {
                    self.best_effort("heater off", Self::heater_off);
                    self.delay.delay_ms(COOL_DOWN_MS);
                    SamplePhase::Heat
                }
                SamplePhase::Heat => {
                    self.best_effort("heater on", Self::heater_on);
                    self.delay.delay_ms(SWITCH_SETTLE_MS);
                    SamplePhase::FirstRead
                }
                SamplePhase::FirstRead => {
                    let first = self.read_raw()?;
                    self.delay.delay_ms(CYCLE_MS);
                    SamplePhase::Settle(StabilityDetector::new(first))
                }
                SamplePhase::Settle(mut detector) => {
                    let reading = self.read_raw()?;
                    let stable = detector.observe(reading);
                    debug!(
                        "[mics6814@{:#04x}] cycle {} {:?} quiet for {}",
                        self.address,
                        detector.cycles(),
                        reading,
                        detector.stable_cycles()
                    );
                    self.delay.delay_ms(CYCLE_MS);

                    if stable {
                        SamplePhase::Finish(SampleReading {
                            raw: reading,
                            cycles: detector.cycles(),
                        })
                    } else if self
                        .sampling
                        .max_settle_cycles
                        .is_some_and(|max| detector.cycles() >= max)
                    {
                        return Err(SensorError::SampleTimeout {
                            cycles: detector.cycles(),
                        });
                    } else {
                        SamplePhase::Settle(detector)
                    }
                }
                SamplePhase::Finish(reading) => {
                    self.best_effort("heater off", Self::heater_off);
                    self.delay.delay_ms(SWITCH_SETTLE_MS);
                    self.best_effort("indicator off", Self::indicator_off);
                    self.delay.delay_ms(SWITCH_SETTLE_MS);
                    return Ok(reading);
                }
            };
        }
    }

    /// Read the raw ADC value of all three channels
    pub fn read_raw(&mut self) -> SensorResult<[u16; 3]> {
        let mut raw = [0u16; 3];
        for (channel, opcode) in command::READ_ADC.into_iter().enumerate() {
            raw[channel] = self
                .bus
                .read_word(&mut self.delay, self.address, opcode, None)?;
        }
        Ok(raw)
    }

    /// Thirty minute first-use conditioning run: heater on, indicator blinking at 1 Hz
    pub fn warmup(&mut self) {
        info!("[mics6814@{:#04x}] warming up for {}s", self.address, WARMUP_SECONDS);

        self.best_effort("indicator on", Self::indicator_on);
        self.delay.delay_ms(SWITCH_SETTLE_MS);
        self.best_effort("heater on", Self::heater_on);
        self.delay.delay_ms(SWITCH_SETTLE_MS);

        for remaining in (0..WARMUP_SECONDS).rev() {
            if remaining % 2 == 0 {
                self.best_effort("indicator on", Self::indicator_on);
            } else {
                self.best_effort("indicator off", Self::indicator_off);
            }
            if remaining % 60 == 0 {
                debug!("[mics6814@{:#04x}] warm-up {}s left", self.address, remaining);
            }
            self.delay.delay_ms(CYCLE_MS);
        }

        self.best_effort("heater off", Self::heater_off);
        self.delay.delay_ms(SWITCH_SETTLE_MS);
        self.best_effort("indicator off", Self::indicator_off);
        self.delay.delay_ms(SWITCH_SETTLE_MS);

        info!("[mics6814@{:#04x}] warm-up complete", self.address);
    }

    /// Sample in clean air and store the result as the new baseline (R0).
    ///
    /// The in-memory baseline only changes once the board accepted the write.
    pub fn calibrate(&mut self) -> SensorResult<[u16; 3]> {
        let reading = self.sample()?;

        let mut frame = [0u8; BLOCK_LEN];
        for (channel, value) in reading.raw.iter().enumerate() {
            frame[channel * 2..channel * 2 + 2].copy_from_slice(&value.to_be_bytes());
        }
        self.bus.write_block(self.address, command::SET_R0, &frame)?;

        self.baseline = reading.raw;
        info!("[mics6814@{:#04x}] calibrated baseline {:?}", self.address, self.baseline);
        Ok(self.baseline)
    }

    pub(crate) fn best_effort(&mut self, what: &str, action: fn(&mut Self) -> SensorResult<()>) {
        if let Err(e) = action(self) {
            warn!("[mics6814@{:#04x}] {} failed: {}", self.address, what, e);
        }
    }
}
