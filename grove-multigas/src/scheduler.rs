use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::messages::{GasReadingMessage, Header};
use crate::publisher::ReadingPublisher;
use crate::registry::SensorTask;
use crate::sensors::Mics6814;

/// Run `f` on the blocking pool with exclusive access to `session`, handing the
/// session back afterwards. `None` if the blocking task panicked.
async fn with_session<I2C, D, R, F>(
    mut session: Mics6814<I2C, D>,
    f: F,
) -> Option<(Mics6814<I2C, D>, R)>
where
    I2C: I2c + Send + 'static,
    D: DelayNs + Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut Mics6814<I2C, D>) -> R + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = f(&mut session);
        (session, result)
    })
    .await
    .ok()
}

/// Start one sampling task per sensor.
///
/// Each task runs the optional warm-up and calibration, then samples until
/// `shutdown` turns true, and finally shuts its session down and returns the
/// released bus. A task whose blocking work panicked returns `None`.
pub fn spawn_sensor_tasks<I2C, D>(
    sensors: Vec<SensorTask<I2C, D>>,
    publisher: ReadingPublisher,
    device_id: &str,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<Option<(I2C, D)>>>
where
    I2C: I2c + Send + 'static,
    D: DelayNs + Send + 'static,
{
    sensors
        .into_iter()
        .map(|task| {
            let publisher = publisher.clone();
            let device_id = device_id.to_string();
            let shutdown = shutdown.clone();
            tokio::spawn(run_sensor(task, publisher, device_id, shutdown))
        })
        .collect()
}

async fn run_sensor<I2C, D>(
    task: SensorTask<I2C, D>,
    publisher: ReadingPublisher,
    device_id: String,
    mut shutdown: watch::Receiver<bool>,
) -> Option<(I2C, D)>
where
    I2C: I2c + Send + 'static,
    D: DelayNs + Send + 'static,
{
    let SensorTask { entry, mut session } = task;
    let sensor_id = entry.id.clone();
    let mut sequence_counter = 0u64;

    if entry.warmup {
        info!("[{}] running warm-up before first sample", sensor_id);
        session = with_session(session, |s| s.warmup()).await?.0;
    }

    if entry.calibrate {
        let (s, result) = with_session(session, |s| s.calibrate()).await?;
        session = s;
        match result {
            Ok(baseline) => info!("[{}] new baseline {:?}", sensor_id, baseline),
            Err(e) => warn!("[{}] calibration failed, keeping stored baseline: {}", sensor_id, e),
        }
    }

    info!("[{}] Starting sensor task every {}s", sensor_id, entry.interval_secs);

    while !*shutdown.borrow() {
        let (s, result) = with_session(session, |s| s.sample()).await?;
        session = s;

        match result {
            Ok(sample) => {
                sequence_counter += 1;
                let header = Header::new(device_id.clone(), sensor_id.clone(), sequence_counter);
                let msg = GasReadingMessage::new(
                    header,
                    &sample,
                    session.baseline(),
                    session.concentrations(&entry.gases),
                );
                publisher.publish(msg).await;
            }
            Err(e) => {
                error!("[{}] Sensor read error: {}", sensor_id, e);
                publisher.report_error(&sensor_id, e.to_string()).await;
            }
        }

        tokio::select! {
            _ = sleep(entry.interval()) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("[{}] stopping after {} readings", sensor_id, sequence_counter);
    Some(session.shutdown())
}
