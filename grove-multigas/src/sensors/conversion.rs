//! Resistance-ratio to gas concentration conversion.
//!
//! Each gas is read off one of the three sensing channels through an
//! empirical power law `ppm = coefficient * ratio^exponent`, where `ratio`
//! compares the live reading (Rs) with the clean-air baseline (R0) of that
//! channel. The curves were fitted against v2 boards only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Full scale of the board's 10-bit ADC
pub const ADC_MAX: u16 = 1023;

/// Value reported by [`crate::Mics6814::get`] when no valid concentration exists
pub const INVALID_CONCENTRATION: f32 = -3.0;

/// Gases the MiCS-6814 curves are published for
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GasType {
    CO,
    NO2,
    NH3,
    C3H8,
    C4H10,
    CH4,
    H2,
    C2H5OH,
}

/// Power-law response curve of one gas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    /// Sensing channel the curve reads from
    pub channel: usize,
    pub exponent: f32,
    pub coefficient: f32,
}

impl Curve {
    /// Apply the curve to a resistance ratio, `None` if the result is not finite
    pub fn apply(&self, ratio: f32) -> Option<f32> {
        let ppm = self.coefficient * ratio.powf(self.exponent);
        ppm.is_finite().then_some(ppm)
    }
}

impl GasType {
    pub const ALL: [GasType; 8] = [
        GasType::CO,
        GasType::NO2,
        GasType::NH3,
        GasType::C3H8,
        GasType::C4H10,
        GasType::CH4,
        GasType::H2,
        GasType::C2H5OH,
    ];

    pub fn curve(self) -> Curve {
        let (channel, exponent, coefficient) = match self {
            GasType::NH3 => (0, -1.67, 1.0 / 1.47),
            GasType::C3H8 => (0, -2.518, 570.164),
            GasType::C4H10 => (0, -2.138, 398.107),
            GasType::CO => (1, -1.179, 4.385),
            GasType::CH4 => (1, -4.363, 630.957),
            GasType::H2 => (1, -1.8, 0.73),
            GasType::C2H5OH => (1, -1.552, 1.622),
            GasType::NO2 => (2, 1.007, 1.0 / 6.855),
        };
        Curve { channel, exponent, coefficient }
    }

    pub fn channel(self) -> usize {
        self.curve().channel
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GasType::CO => "CO",
            GasType::NO2 => "NO2",
            GasType::NH3 => "NH3",
            GasType::C3H8 => "C3H8",
            GasType::C4H10 => "C4H10",
            GasType::CH4 => "CH4",
            GasType::H2 => "H2",
            GasType::C2H5OH => "C2H5OH",
        }
    }
}

impl fmt::Display for GasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GasType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GasType::ALL
            .iter()
            .copied()
            .find(|gas| gas.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown gas type '{}'", s))
    }
}

/// Rs/R0 ratio of one channel, corrected for the board's voltage divider.
///
/// Returns `None` outside the usable domain: a zero baseline, a reading at the
/// ADC ceiling, or a reading equal to its baseline. A saturated baseline gives
/// a ratio of zero, which only the positive-exponent curve can convert.
pub fn resistance_ratio(raw: u16, baseline: u16) -> Option<f32> {
    if baseline == 0 || raw >= ADC_MAX || raw == baseline {
        return None;
    }

    let rs = raw as f32;
    let r0 = baseline as f32;
    let full = ADC_MAX as f32;
    let ratio = rs / r0 * (full - r0) / (full - rs);
    ratio.is_finite().then_some(ratio)
}

/// Concentration of `gas` in ppm for a raw triple against a baseline triple
pub fn concentration(gas: GasType, raw: &[u16; 3], baseline: &[u16; 3]) -> Option<f32> {
    let curve = gas.curve();
    let ratio = resistance_ratio(raw[curve.channel], baseline[curve.channel])?;
    curve.apply(ratio)
}
