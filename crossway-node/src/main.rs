use clap::Parser;
use tracing::{error, info, warn};

use crossway_node::{cli::Args, config::ensure_config, logging, SimulationDriver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _guard = logging::init(&args.log_dir)?;

    info!("--- CROSSWAY ---");
    info!("Config: {}", args.config.display());

    let mut config = match ensure_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    args.apply(&mut config);
    config.validate()?;
    info!(
        "Transport {:?}, quorum {:?}, sampling {:?}, vision {} ms",
        config.transport, config.quorum_policy, config.sample_mode, config.vision_time_ms
    );

    let mut driver = SimulationDriver::from_config(config);
    let shutdown = driver.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, finishing the current pass");
            shutdown.cancel();
        }
    });

    let report = driver.run().await;
    println!("{}", report);
    Ok(())
}
