use crate::backup::BackupEntry;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where an instance is in its launch lifecycle.
///
/// ```text
/// Registered ──► EnvironmentReady ──► Launched
///      │                 │                │
///      └────────────► Failed ◄────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Registered,
    EnvironmentReady,
    Launched,
    Failed,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Registered => write!(f, "registered"),
            InstanceStatus::EnvironmentReady => write!(f, "environment_ready"),
            InstanceStatus::Launched => write!(f, "launched"),
            InstanceStatus::Failed => write!(f, "failed"),
        }
    }
}

impl InstanceStatus {
    /// Check if a status transition is valid.
    ///
    /// Preparation may be re-run on a ready instance; everything can fail.
    pub fn can_transition_to(self, next: InstanceStatus) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Registered, EnvironmentReady)
                | (EnvironmentReady, EnvironmentReady)
                | (EnvironmentReady, Launched)
                | (_, Failed)
        )
    }
}

/// One registered launch target.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceRecord {
    name: String,
    bot_path: PathBuf,
    config_name: String,
    allocated_port: u16,
    status: InstanceStatus,
}

impl InstanceRecord {
    pub(crate) fn new(name: String, bot_path: PathBuf, config_name: String, port: u16) -> Self {
        Self {
            name,
            bot_path,
            config_name,
            allocated_port: port,
            status: InstanceStatus::Registered,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bot_path(&self) -> &Path {
        &self.bot_path
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn allocated_port(&self) -> u16 {
        self.allocated_port
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: InstanceStatus) {
        self.status = status;
    }
}

/// Snapshot of what a rollback would currently touch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackStatus {
    pub modified_configs: Vec<PathBuf>,
    pub launched_instances: Vec<String>,
    pub config_backups: Vec<BackupEntry>,
}

/// Per-file result of a rollback, in the order files were modified.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RollbackReport {
    pub results: Vec<(PathBuf, bool)>,
}

impl RollbackReport {
    pub fn restored_count(&self) -> usize {
        self.results.iter().filter(|(_, ok)| *ok).count()
    }

    /// Files the rollback could not put back; these need manual attention.
    pub fn failed_paths(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(path, _)| path.as_path())
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.results.iter().all(|(_, ok)| *ok)
    }

    pub fn get(&self, path: &Path) -> Option<bool> {
        self.results
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, ok)| *ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions() {
        use InstanceStatus::*;
        assert!(Registered.can_transition_to(EnvironmentReady));
        assert!(EnvironmentReady.can_transition_to(Launched));
        assert!(EnvironmentReady.can_transition_to(EnvironmentReady));
        assert!(!Registered.can_transition_to(Launched));
        assert!(!Launched.can_transition_to(EnvironmentReady));
        assert!(!Failed.can_transition_to(Launched));
    }

    #[test]
    fn failed_reachable_from_anywhere() {
        use InstanceStatus::*;
        for status in [Registered, EnvironmentReady, Launched, Failed] {
            assert!(status.can_transition_to(Failed), "{} -> failed", status);
        }
    }

    #[test]
    fn report_summaries() {
        let report = RollbackReport {
            results: vec![
                (PathBuf::from("/a"), true),
                (PathBuf::from("/b"), false),
            ],
        };
        assert_eq!(report.restored_count(), 1);
        assert_eq!(report.failed_paths(), vec![Path::new("/b")]);
        assert!(!report.is_clean());
        assert_eq!(report.get(Path::new("/a")), Some(true));
        assert_eq!(report.get(Path::new("/c")), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&InstanceStatus::EnvironmentReady).unwrap();
        assert_eq!(json, "\"environment_ready\"");
    }
}
