//! Interactive mode command

use crate::config::CliConfigLoader;
use crate::data::DataOptions;
use crate::interactive::run_interactive;
use anyhow::Result;
use tracing::debug;

/// Start interactive mode
pub async fn interactive_command(config_loader: CliConfigLoader, data: DataOptions) -> Result<()> {
    let config = config_loader.load().await?;
    debug!(
        multiple = config.multiple,
        mode = config.reference_mode.as_str(),
        client_mode = config.client_mode,
        "Starting interactive mode"
    );

    if let Some(path) = &data.path {
        debug!("Data file: {}", path.display());
    }

    let handle = data.spawn_control(config).await?;
    run_interactive(handle).await
}
