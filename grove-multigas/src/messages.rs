use serde::{Deserialize, Serialize};

use crate::sensors::{GasType, SampleReading};

/// Header metadata common to all published messages
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Header {
    /// Unique hub identifier
    pub device_id: String,
    /// Sensor identifier from `sensors.toml` (e.g. "gas0")
    pub sensor_id: String,
    /// Sequence number for message ordering
    pub seq: u64,
    /// UTC timestamp in nanoseconds
    pub t_utc_ns: u64,
    /// Message schema version for evolution
    pub schema_v: u16,
}

impl Header {
    /// Create a new header stamped with the current time
    pub fn new(device_id: String, sensor_id: String, seq: u64) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let t_utc_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        Self {
            device_id,
            sensor_id,
            seq,
            t_utc_ns,
            schema_v: 1,
        }
    }
}

/// Concentration of one gas; `ppm` is absent when the reading was out of range
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GasConcentration {
    pub gas: GasType,
    pub ppm: Option<f32>,
}

/// One completed sample with its derived concentrations
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GasReadingMessage {
    pub h: Header,
    /// Raw ADC triple (Rs)
    pub raw: [u16; 3],
    /// Baseline the concentrations were computed against (R0)
    pub baseline: [u16; 3],
    /// Settle cycles the sample needed
    pub cycles: u32,
    pub concentrations: Vec<GasConcentration>,
}

impl GasReadingMessage {
    pub fn new(
        h: Header,
        sample: &SampleReading,
        baseline: [u16; 3],
        concentrations: Vec<(GasType, Option<f32>)>,
    ) -> Self {
        Self {
            h,
            raw: sample.raw,
            baseline,
            cycles: sample.cycles,
            concentrations: concentrations
                .into_iter()
                .map(|(gas, ppm)| GasConcentration { gas, ppm })
                .collect(),
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.h.sensor_id
    }

    pub fn ppm(&self, gas: GasType) -> Option<f32> {
        self.concentrations
            .iter()
            .find(|c| c.gas == gas)
            .and_then(|c| c.ppm)
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
