//! Launcher configuration types.
//!
//! The file is read-only input: the launcher never writes it back.

use crate::orchestrator::{OrchestratorSettings, DEFAULT_CONFIG_FILE};
use crate::port::{PortRange, ReservedPorts, DEFAULT_PROBE_TIMEOUT};
use crate::rewrite::ConfigFormat;
use crate::supervisor::{LaunchCommand, DEFAULT_STARTUP_GRACE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root of `multi-launch.{toml,json,yaml}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub settings: LaunchSettings,

    /// Declaration order is batch order
    #[serde(default)]
    pub instances: Vec<InstanceDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    pub port_range: PortRange,

    /// Added to the built-in reserved set
    pub extra_reserved_ports: Vec<u16>,

    pub base_port: u16,

    /// Bot config location relative to each instance's `bot_path`
    pub config_file: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_format: Option<ConfigFormat>,

    pub probe_timeout_ms: u64,

    pub require_port_field: bool,

    pub startup_grace_ms: u64,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            port_range: PortRange::default(),
            extra_reserved_ports: Vec::new(),
            base_port: 8000,
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            config_format: None,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            require_port_field: false,
            startup_grace_ms: DEFAULT_STARTUP_GRACE.as_millis() as u64,
        }
    }
}

impl LaunchSettings {
    pub fn reserved_ports(&self) -> ReservedPorts {
        ReservedPorts::default().with_extra(self.extra_reserved_ports.iter().copied())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            config_file: self.config_file.clone(),
            config_format: self.config_format,
            require_port_field: self.require_port_field,
        }
    }
}

/// One bot instance the launcher can start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDefinition {
    pub name: String,

    pub bot_path: PathBuf,

    /// Defaults to the instance name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,

    /// Overrides `settings.base_port` for this instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_port: Option<u16>,

    /// Program and arguments; required only for actually launching
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl InstanceDefinition {
    pub fn config_name(&self) -> &str {
        self.config_name.as_deref().unwrap_or(&self.name)
    }

    pub fn launch_command(&self) -> LaunchCommand {
        LaunchCommand {
            argv: self.command.clone(),
            env: self.env.clone(),
        }
    }
}

impl LauncherConfig {
    pub fn instance(&self, name: &str) -> Option<&InstanceDefinition> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Make relative `bot_path`s absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for instance in &mut self.instances {
            if instance.bot_path.is_relative() {
                instance.bot_path = base.join(&instance.bot_path);
            }
        }
    }
}
