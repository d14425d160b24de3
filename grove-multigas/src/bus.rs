pub mod i2c;

/// Bus type enum for different communication interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    I2C,
}

impl BusType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i2c" => Some(BusType::I2C),
            _ => None,
        }
    }
}
