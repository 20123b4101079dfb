use tracing::{error, info};

use logship::telemetry::init_tracing;
use logship::{Dependencies, Settings, ShipperError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ShipperError> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    init_tracing(settings.log_format);

    info!(queue_key = %settings.queue_key, "Starting log shipper");

    let dependencies = Dependencies::new(&settings).await?;

    if let Err(e) = dependencies.orchestrator.run_until_signal().await {
        error!(error = %e, "Log shipper stopped with an error");
        return Err(e.into());
    }

    info!("Log shipper stopped");
    Ok(())
}
