mod common;

use common::{RecordingDelay, SimulatedBoard};
use grove_multigas::{
    init_all, spawn_sensor_tasks, BusConfig, GasType, ReadingPublisher, RegistryError,
    SensorConfig, SensorError,
};
use tokio::sync::watch;

const BUSES: &str = r#"
[[bus]]
id = "i2c1"
type = "i2c"
path = "/dev/i2c-1"
"#;

fn sensors(extra: &str) -> SensorConfig {
    SensorConfig::parse(&format!(
        r#"
        [[sensor]]
        id = "gas0"
        driver = "mics6814"
        bus = "i2c1"
        interval_secs = 3600
        gases = ["CO", "NO2"]
        {}
        "#,
        extra
    ))
    .unwrap()
}

#[tokio::test]
async fn hub_publishes_readings_and_releases_on_shutdown() {
    let board = SimulatedBoard::v2([500, 500, 500]);
    board.script([[500, 400, 600]]);
    let bus_config = BusConfig::parse(BUSES).unwrap();

    let opened = board.clone();
    let tasks = init_all(&sensors(""), &bus_config, |bus| {
        assert_eq!(bus.path, "/dev/i2c-1");
        Ok((opened.clone(), RecordingDelay::new()))
    })
    .await
    .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].entry.id, "gas0");

    let publisher = ReadingPublisher::default();
    let mut rx = publisher.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_sensor_tasks(tasks, publisher.clone(), "test_hub", shutdown_rx);

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.sensor_id(), "gas0");
    assert_eq!(msg.h.device_id, "test_hub");
    assert_eq!(msg.h.seq, 1);
    assert_eq!(msg.raw, [500, 400, 600]);
    assert_eq!(msg.baseline, [500, 500, 500]);
    assert_eq!(msg.concentrations.len(), 2);
    assert!(msg.ppm(GasType::CO).is_some());
    assert!(msg.ppm(GasType::NO2).is_some());
    assert_eq!(msg.ppm(GasType::NH3), None);

    shutdown_tx.send(true).unwrap();
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    let state = board.state();
    assert!(!state.heater);
    assert!(!state.led);
    drop(state);

    let stats = publisher.stats("gas0").await.unwrap();
    assert_eq!(stats.messages_sent, 1);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn hub_calibrates_before_first_reading() {
    let board = SimulatedBoard::v2([500, 500, 500]);
    board.script([[480, 410, 590]]);
    let bus_config = BusConfig::parse(BUSES).unwrap();

    let opened = board.clone();
    let tasks = init_all(&sensors("calibrate = true"), &bus_config, |_| {
        Ok((opened.clone(), RecordingDelay::new()))
    })
    .await
    .unwrap();

    let publisher = ReadingPublisher::default();
    let mut rx = publisher.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_sensor_tasks(tasks, publisher, "test_hub", shutdown_rx);

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.baseline, [480, 410, 590]);
    // unchanged air right after calibration has no valid ratio
    assert_eq!(msg.ppm(GasType::CO), None);

    shutdown_tx.send(true).unwrap();
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(board.state().eeprom.get(&0x0A), Some(&410));
}

#[tokio::test]
async fn registry_rejects_unknown_bus() {
    let bus_config = BusConfig::parse(BUSES).unwrap();
    let config = SensorConfig::parse(
        r#"
        [[sensor]]
        id = "gas0"
        driver = "mics6814"
        bus = "i2c7"
        "#,
    )
    .unwrap();

    let result = init_all(&config, &bus_config, |_| {
        Ok((SimulatedBoard::v2([500, 500, 500]), RecordingDelay::new()))
    })
    .await;

    assert!(matches!(result, Err(RegistryError::BusNotFound { bus }) if bus == "i2c7"));
}

#[tokio::test]
async fn registry_rejects_unsupported_driver() {
    let bus_config = BusConfig::parse(BUSES).unwrap();
    let config = SensorConfig::parse(
        r#"
        [[sensor]]
        id = "env0"
        driver = "bme680"
        bus = "i2c1"
        "#,
    )
    .unwrap();

    let result = init_all(&config, &bus_config, |_| {
        Ok((SimulatedBoard::v2([500, 500, 500]), RecordingDelay::new()))
    })
    .await;

    assert!(matches!(result, Err(RegistryError::UnsupportedDriver { driver }) if driver == "bme680"));
}

#[tokio::test]
async fn registry_reports_bus_open_and_bring_up_failures() {
    let bus_config = BusConfig::parse(BUSES).unwrap();

    let result = init_all(&sensors(""), &bus_config, |_| {
        Err::<(SimulatedBoard, RecordingDelay), _>("permission denied".to_string())
    })
    .await;
    assert!(matches!(
        result,
        Err(RegistryError::BusOpenError { reason, .. }) if reason == "permission denied"
    ));

    let silent = SimulatedBoard::v2([500, 500, 500]);
    silent.state().led_on_failures = u32::MAX;
    let result = init_all(&sensors(""), &bus_config, |_| {
        Ok((silent.clone(), RecordingDelay::new()))
    })
    .await;
    assert!(matches!(
        result,
        Err(RegistryError::InitError {
            sensor,
            source: SensorError::DeviceUnresponsive { attempts: 10, .. },
        }) if sensor == "gas0"
    ));
}
