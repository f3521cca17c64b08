use anyhow::Context;
use crr::event::{ChangeEvent, EventProcessor};
use crr::provision::MemoryResourceProvisioner;
use crr::store::{MemoryMetadataStore, MetadataStore};
use crr_config::shared::CoordinatorConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Starts the coordinator with the provided configuration.
///
/// Replays a newline-delimited JSON stream of change events from stdin
/// against an in-memory metadata store and provisioner, then prints the
/// converged group records to stdout, one JSON document per line.
pub async fn start_coordinator_with_config(config: CoordinatorConfig) -> anyhow::Result<()> {
    info!("starting replication coordinator");

    log_config(&config);

    let store = MemoryMetadataStore::new();
    let provisioner = MemoryResourceProvisioner::new();
    let processor = EventProcessor::new(store.clone(), provisioner, config.retry);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut processed = 0usize;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: ChangeEvent = serde_json::from_str(line)
            .with_context(|| format!("malformed change event at line {}", processed + 1))?;
        let sequence = event.sequence_number.clone();
        processor
            .process_event(&event)
            .await
            .with_context(|| format!("failed to process event {sequence}"))?;

        processed += 1;
    }

    info!(processed, "event stream drained");

    for uuid in store.list_group_ids().await? {
        if let Some(group) = store.read_group(&uuid).await? {
            println!("{}", serde_json::to_string(&group)?);
        }
    }

    Ok(())
}

fn log_config(config: &CoordinatorConfig) {
    info!(
        max_attempts = config.retry.max_attempts,
        initial_delay_ms = config.retry.initial_delay_ms,
        max_delay_ms = config.retry.max_delay_ms,
        backoff_factor = config.retry.backoff_factor,
        "loaded coordinator configuration"
    );
}
