// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod hal;
pub mod messages;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use config::{load_bus_config, load_sensor_config, BusConfig, SensorConfig};
pub use errors::{ConfigError, RegistryError, SensorError, SensorResult};
pub use messages::GasReadingMessage;
pub use publisher::ReadingPublisher;
pub use registry::init_all;
pub use scheduler::spawn_sensor_tasks;
pub use sensors::{
    FirmwareVersion, GasType, Mics6814, SampleReading, SamplingConfig, INVALID_CONCENTRATION,
};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Run the gas hub with the configuration found in `config_path`
/// (`buses.toml` and `sensors.toml`) until Ctrl-C is received
#[cfg(feature = "linux-hal")]
pub async fn run_gas_hub(config_path: &str, device_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tokio::sync::watch;
    use tracing::{error, info};

    info!("[GroveMultigas] starting up...");

    // Load configuration
    let sensor_config = load_sensor_config(&format!("{}/sensors.toml", config_path))?;
    let bus_config = load_bus_config(&format!("{}/buses.toml", config_path))?;
    info!(
        "[config] loaded {} sensor(s) on {} bus(es)",
        sensor_config.sensors.len(),
        bus_config.buses.len()
    );

    // Open buses and bring every board up
    let sensors = init_all(&sensor_config, &bus_config, |bus| {
        hal::open_bus(&bus.path)
            .map(|device| (device, hal::Delay))
            .map_err(|e| e.to_string())
    })
    .await?;
    info!("[registry] sensors and buses initialized");

    let publisher = ReadingPublisher::default();
    let logger = tokio::spawn(publisher::log_readings(publisher.subscribe()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = spawn_sensor_tasks(sensors, publisher, device_id, shutdown_rx);
    info!("[main] {} sensor task(s) launched", tasks.len());

    tokio::signal::ctrl_c().await?;
    info!("[main] shutdown requested, finishing current samples...");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        match task.await {
            Ok(Some(_released)) => {}
            Ok(None) => error!("[main] a sensor task lost its session"),
            Err(e) => error!("[main] sensor task failed: {}", e),
        }
    }

    // every publisher handle is gone now, so the logger drains and ends
    let _ = logger.await;
    info!("[main] all sensors released");
    Ok(())
}
