use grove_multigas::{init_tracing, run_gas_hub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    init_tracing();

    // Get config path (board default or override)
    let config_path = grove_multigas_multichannel_v2::get_config_path();
    let device_id = grove_multigas_multichannel_v2::get_device_id();

    tracing::info!(
        "[{}] Configuration path: {}",
        grove_multigas_multichannel_v2::BOARD_NAME,
        config_path
    );

    // Run the gas hub
    run_gas_hub(&config_path, &device_id).await
}
