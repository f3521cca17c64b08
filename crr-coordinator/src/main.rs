use crr_config::shared::CoordinatorConfig;
use crr_telemetry::init_tracing;
use tracing::error;

use crate::config::load_coordinator_config;
use crate::core::start_coordinator_with_config;

mod config;
mod core;

fn main() -> anyhow::Result<()> {
    let coordinator_config = load_coordinator_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(coordinator_config))?;

    Ok(())
}

async fn async_main(coordinator_config: CoordinatorConfig) -> anyhow::Result<()> {
    if let Err(err) = start_coordinator_with_config(coordinator_config).await {
        error!("an error occurred in the coordinator: {err}");

        return Err(err);
    }

    Ok(())
}
