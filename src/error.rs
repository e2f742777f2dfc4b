// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(mlaunch::config::error))]
    Config(String),

    #[error("No usable port in {low}-{high}{}",
        .index.map(|i| format!(" (batch index {})", i)).unwrap_or_default()
    )]
    #[diagnostic(
        code(mlaunch::port::exhausted),
        help("Widen settings.port_range or stop services occupying ports in the range")
    )]
    PortExhausted {
        index: Option<usize>,
        low: u16,
        high: u16,
    },

    #[error("Invalid port range {low}-{high}")]
    #[diagnostic(
        code(mlaunch::port::invalid_range),
        help("port_range.low must be non-zero and not greater than port_range.high")
    )]
    InvalidPortRange { low: u16, high: u16 },

    #[error("Instance '{0}' is already registered")]
    #[diagnostic(
        code(mlaunch::instance::duplicate),
        help("Instance names must be unique within one launch batch")
    )]
    DuplicateInstanceName(String),

    #[error("Instance not found: {0}")]
    #[diagnostic(
        code(mlaunch::instance::not_found),
        help("List configured instances with `mlaunch instances`")
    )]
    InstanceNotFound(String),

    #[error("Instance '{name}' cannot move from {from} to {to}")]
    #[diagnostic(code(mlaunch::instance::invalid_transition))]
    InvalidTransition {
        name: String,
        from: String,
        to: String,
    },

    #[error("Unsupported config format: {0}")]
    #[diagnostic(
        code(mlaunch::rewrite::unsupported_format),
        help("Supported formats are: toml (text), json, yaml")
    )]
    UnsupportedFormat(String),

    #[error("Process supervisor error for '{0}': {1}")]
    #[diagnostic(code(mlaunch::supervisor::error))]
    Supervisor(String, String),

    #[error("Backup directory error at {}: {reason}", .path.display())]
    BackupScan { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::PortExhausted { low, high, .. } => Some(format!(
                "Every port in {}-{} is reserved, bound, or already handed out. \
                 Check what is listening with `mlaunch ports check <port>` or widen port_range.",
                low, high
            )),
            Error::DuplicateInstanceName(name) => Some(format!(
                "Rename one of the '{}' entries in your multi-launch config.",
                name
            )),
            Error::InstanceNotFound(_) => {
                Some("List configured instances with: mlaunch instances".to_string())
            }
            Error::UnsupportedFormat(_) => Some(
                "Pass --format toml, --format json or --format yaml, or use a file extension that identifies the format."
                    .to_string(),
            ),
            Error::Config(msg) if msg.contains("Could not find") => Some(
                "Create multi-launch.toml in this directory or pass --config <path>.".to_string(),
            ),
            Error::Config(_) | Error::Yaml(_) | Error::Json(_) => {
                Some("Check the syntax of your multi-launch config file.".to_string())
            }
            Error::Supervisor(name, _) => Some(format!(
                "Check the command configured for instance '{}' and that its bot_path exists.",
                name
            )),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_exhausted_mentions_batch_index() {
        let err = Error::PortExhausted {
            index: Some(2),
            low: 8000,
            high: 8010,
        };
        let msg = err.to_string();
        assert!(msg.contains("8000-8010"), "{}", msg);
        assert!(msg.contains("batch index 2"), "{}", msg);
    }

    #[test]
    fn port_exhausted_without_index() {
        let err = Error::PortExhausted {
            index: None,
            low: 1,
            high: 2,
        };
        assert_eq!(err.to_string(), "No usable port in 1-2");
    }

    #[test]
    fn with_suggestion_appends_hint() {
        let err = Error::DuplicateInstanceName("bot-a".into());
        let rendered = err.with_suggestion();
        assert!(rendered.starts_with("Instance 'bot-a' is already registered"));
        assert!(rendered.contains("Hint:"));
    }

    #[test]
    fn io_errors_have_no_suggestion() {
        let err = Error::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.suggestion().is_none());
    }
}
