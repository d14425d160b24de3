use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use tracing::{debug, info, warn};

use crate::bus::BusType;
use crate::config::{BusConfig, BusEntry, SensorConfig, SensorEntry};
use crate::errors::{RegistryError, RegistryResult};
use crate::sensors::{check_driver, Mics6814};

/// A started session together with the config entry it came from
pub struct SensorTask<I2C, D> {
    pub entry: SensorEntry,
    pub session: Mics6814<I2C, D>,
}

/// Open the bus of every configured sensor and bring its session up.
///
/// `open` turns a bus entry into the I2C device and delay provider handed to
/// the session; each sensor gets its own handle.
pub async fn init_all<I2C, D, F>(
    sensor_config: &SensorConfig,
    bus_config: &BusConfig,
    mut open: F,
) -> RegistryResult<Vec<SensorTask<I2C, D>>>
where
    I2C: I2c + Send + 'static,
    D: DelayNs + Send + 'static,
    F: FnMut(&BusEntry) -> Result<(I2C, D), String>,
{
    let mut sensors = Vec::with_capacity(sensor_config.sensors.len());
    info!("[registry] initializing {} sensors...", sensor_config.sensors.len());

    for s in sensor_config.sensors.iter() {
        check_driver(&s.driver)?;

        let bus = bus_config
            .find(&s.bus)
            .ok_or_else(|| RegistryError::BusNotFound { bus: s.bus.clone() })?;
        if BusType::from_str(&bus.r#type) != Some(BusType::I2C) {
            return Err(RegistryError::BusOpenError {
                bus: bus.id.clone(),
                path: bus.path.clone(),
                reason: format!("unsupported bus type '{}'", bus.r#type),
            });
        }

        let (i2c, delay) = open(bus).map_err(|reason| RegistryError::BusOpenError {
            bus: bus.id.clone(),
            path: bus.path.clone(),
            reason,
        })?;

        info!(
            "[registry] registering sensor: id={} driver={} bus={} address={:#04x}",
            s.id, s.driver, s.bus, s.address
        );

        let address = s.address;
        let mut session = tokio::task::spawn_blocking(move || Mics6814::begin(i2c, delay, address))
            .await
            .map_err(|e| RegistryError::TaskError {
                sensor: s.id.clone(),
                reason: e.to_string(),
            })?
            .map_err(|source| RegistryError::InitError {
                sensor: s.id.clone(),
                source,
            })?
            .with_sampling(s.sampling());

        match session.device_config() {
            Ok(config) => debug!("[{}] device memory {:?}", s.id, config),
            Err(e) => warn!("[{}] could not read device memory: {}", s.id, e),
        }

        sensors.push(SensorTask {
            entry: s.clone(),
            session,
        });
    }

    Ok(sensors)
}
