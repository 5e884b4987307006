mod telemetry;

use slotbook_api::Application;
use slotbook_infra::{metrics::register_metrics, setup_context};
use telemetry::init_subscriber;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the subscriber for logging & tracing
    init_subscriber()?;

    if let Err(e) = register_metrics() {
        error!("Unable to register metrics: {:?}", e);
    }

    let context = setup_context().await?;

    let app = Application::new(context).await?;
    info!("Application configured, serving requests");

    // Actix handles SIGINT/SIGTERM itself and drains workers gracefully
    app.start().await?;

    info!("[shutdown] shutdown complete");

    Ok(())
}
