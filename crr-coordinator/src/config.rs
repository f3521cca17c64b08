use crr_config::load_config;
use crr_config::shared::CoordinatorConfig;

/// Loads the [`CoordinatorConfig`] and validates it.
pub fn load_coordinator_config() -> anyhow::Result<CoordinatorConfig> {
    let config = load_config::<CoordinatorConfig>()?;
    config.validate()?;

    Ok(config)
}
