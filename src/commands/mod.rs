mod backups;
mod instances;
mod launch;
mod ports;
mod rewrite;
mod validate;

pub use backups::run_backups;
pub use instances::run_instances;
pub use launch::run_launch;
pub use ports::run_ports;
pub use rewrite::run_rewrite;
pub use validate::run_validate;

use multi_launch::port::{PortAllocator, SystemPortOracle};
use multi_launch::{LauncherConfig, Parser as ConfigParser};
use std::path::{Path, PathBuf};

/// Locate and load the launcher config, honouring `--config`.
pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<(PathBuf, LauncherConfig)> {
    let parser = ConfigParser::new();
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => parser.find_config_file()?,
    };
    let config = parser.load_config(&path)?;
    Ok((path, config))
}

/// Config for commands that also work without a config file.
pub fn load_config_or_default(config_path: Option<&Path>) -> anyhow::Result<LauncherConfig> {
    if config_path.is_some() {
        return Ok(load_config(config_path)?.1);
    }
    match ConfigParser::new().find_config_file() {
        Ok(path) => Ok(ConfigParser::new().load_config(&path)?),
        Err(_) => {
            tracing::debug!("No multi-launch config found, using default settings");
            Ok(LauncherConfig::default())
        }
    }
}

/// Allocator over the host's real ports using the configured range and probe timeout.
pub fn system_allocator(config: &LauncherConfig) -> PortAllocator<SystemPortOracle> {
    let settings = &config.settings;
    PortAllocator::with_oracle(
        settings.port_range,
        settings.reserved_ports(),
        SystemPortOracle::with_probe_timeout(settings.probe_timeout()),
    )
}
