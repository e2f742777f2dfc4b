//! Port rewriting for instance config files.
//!
//! Each [`ConfigFormat`] variant has its own strategy: TOML-like files are
//! patched textually so comments and layout survive, JSON and YAML are
//! parsed, walked and re-serialised. All strategies share one contract:
//! `Ok(true)` when the file content changed, `Ok(false)` when there was
//! nothing to change or the file could not be processed.

pub mod structured;
pub mod text;

use crate::error::{Error, Result};
use crate::fs_util::atomic_write;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use text::PORT_FIELDS;

/// Supported instance config formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// TOML and other `key = value` text, patched in place
    #[serde(alias = "toml")]
    Text,
    Json,
    #[serde(alias = "yml")]
    Yaml,
}

impl ConfigFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" | "cfg" | "ini" | "conf" | "env" => Some(ConfigFormat::Text),
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "toml" | "text" => Ok(ConfigFormat::Text),
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Text => write!(f, "toml"),
            ConfigFormat::Json => write!(f, "json"),
            ConfigFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Rewrites every port-bearing field of a config file to one value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigPortRewriter;

impl ConfigPortRewriter {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite `path` given a format name, rejecting unknown formats.
    pub fn rewrite_ports(&self, path: &Path, new_port: u16, format: &str) -> Result<bool> {
        let format = format.parse::<ConfigFormat>()?;
        Ok(self.rewrite(path, new_port, format))
    }

    /// Rewrite `path` with the strategy for `format`.
    ///
    /// A missing file, unreadable file or unparsable document yields `false`
    /// with a logged reason. Writes go through a temp file and rename.
    pub fn rewrite(&self, path: &Path, new_port: u16, format: ConfigFormat) -> bool {
        if !path.exists() {
            tracing::warn!("Config file {} does not exist, nothing to rewrite", path.display());
            return false;
        }

        let result = match format {
            ConfigFormat::Text => rewrite_text_file(path, new_port),
            ConfigFormat::Json => rewrite_json_file(path, new_port),
            ConfigFormat::Yaml => rewrite_yaml_file(path, new_port),
        };

        match result {
            Ok(true) => {
                tracing::info!(
                    "Rewrote port fields in {} ({}) to {}",
                    path.display(),
                    format,
                    new_port
                );
                true
            }
            Ok(false) => {
                tracing::warn!("No port fields to change in {}", path.display());
                false
            }
            Err(e) => {
                tracing::warn!("Failed to rewrite ports in {}: {}", path.display(), e);
                false
            }
        }
    }

    /// True if `path` has at least one port field this rewriter would touch.
    ///
    /// Tells "already on the right port" apart from "nothing to rewrite"
    /// after [`rewrite`](Self::rewrite) returned `false`.
    pub fn has_port_fields(&self, path: &Path, format: ConfigFormat) -> bool {
        let Ok(content) = fs::read_to_string(path) else {
            return false;
        };
        match format {
            ConfigFormat::Text => text::count_port_fields(&content) > 0,
            ConfigFormat::Json => serde_json::from_str::<serde_json::Value>(&content)
                .map(|value| structured::count_json_ports(&value) > 0)
                .unwrap_or(false),
            ConfigFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(&content)
                .map(|value| structured::count_yaml_ports(&value) > 0)
                .unwrap_or(false),
        }
    }
}

fn rewrite_text_file(path: &Path, new_port: u16) -> Result<bool> {
    let content = fs::read_to_string(path)?;
    let (patched, _) = text::rewrite_port_fields(&content, new_port);
    if patched == content {
        return Ok(false);
    }
    atomic_write(path, patched.as_bytes())?;
    Ok(true)
}

fn rewrite_json_file(path: &Path, new_port: u16) -> Result<bool> {
    let content = fs::read_to_string(path)?;
    let mut value: serde_json::Value = serde_json::from_str(&content)?;
    if structured::replace_json_ports(&mut value, new_port) == 0 {
        return Ok(false);
    }
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    atomic_write(path, out.as_bytes())?;
    Ok(true)
}

fn rewrite_yaml_file(path: &Path, new_port: u16) -> Result<bool> {
    let content = fs::read_to_string(path)?;
    let mut value: serde_yaml::Value = serde_yaml::from_str(&content)?;
    if value.is_null() {
        tracing::debug!("YAML document {} is empty", path.display());
        return Ok(false);
    }
    if structured::replace_yaml_ports(&mut value, new_port) == 0 {
        return Ok(false);
    }
    let out = serde_yaml::to_string(&value)?;
    atomic_write(path, out.as_bytes())?;
    Ok(true)
}
