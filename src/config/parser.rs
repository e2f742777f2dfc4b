use super::LauncherConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched for, in order of preference.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "multi-launch.toml",
    "multi-launch.json",
    "multi-launch.yaml",
    "multi-launch.yml",
];

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Find config file starting from current directory
    pub fn find_config_file(&self) -> Result<PathBuf> {
        let current_dir = std::env::current_dir()?;
        Self::find_config_in_dir(&current_dir)
    }

    pub fn find_config_in_dir(dir: &Path) -> Result<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        if let Some(parent) = dir.parent() {
            return Self::find_config_in_dir(parent);
        }

        Err(Error::Config(
            "Could not find multi-launch.toml (or .json/.yaml/.yml) in current directory or any parent"
                .to_string(),
        ))
    }

    /// Load, resolve and validate a config file.
    ///
    /// Relative instance paths are resolved against the file's directory.
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<LauncherConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let mut config = self
            .parse_config(&content, &kind)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;

        tracing::debug!(
            "Loaded {} instance(s) from {}",
            config.instances.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse config text; `kind` is a file extension (`toml`, `json`, `yaml`, `yml`).
    pub fn parse_config(&self, content: &str, kind: &str) -> Result<LauncherConfig> {
        match kind {
            "toml" => toml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e))),
            "json" => serde_json::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e))),
            "yaml" | "yml" => serde_yaml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse YAML config: {}", e))),
            other => Err(Error::Config(format!(
                "Unsupported config file extension '{}'",
                other
            ))),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
