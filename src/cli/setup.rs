use crate::infra::config::{CONFIG_FILE_NAME, ensure_config_dir, install_default_config};
use anyhow::Result;
use std::path::Path;
use tracing::info;

pub fn install(config_dir: &Path) -> Result<()> {
    info!("preparing config in {:?}", config_dir);

    ensure_config_dir(config_dir)?;
    install_default_config(config_dir)?;

    info!("config ready; adjust {CONFIG_FILE_NAME} in {:?} as needed", config_dir);

    Ok(())
}
