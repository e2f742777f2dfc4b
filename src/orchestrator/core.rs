use super::types::{InstanceRecord, InstanceStatus, RollbackReport, RollbackStatus};
use crate::backup::BackupLedger;
use crate::error::{Error, Result};
use crate::port::allocator::preferred_port_for;
use crate::port::{PortAllocator, PortOracle, SystemPortOracle};
use crate::rewrite::{ConfigFormat, ConfigPortRewriter};
use std::path::{Path, PathBuf};

/// Relative location of an instance's bot config under its root.
pub const DEFAULT_CONFIG_FILE: &str = "config/bot_config.toml";

/// How the orchestrator finds and treats each instance's config file.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Config path relative to each instance's `bot_path`
    pub config_file: PathBuf,
    /// Forced format; detected from the file extension when `None`
    pub config_format: Option<ConfigFormat>,
    /// Fail preparation when the config is missing or has no port field
    pub require_port_field: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            config_format: None,
            require_port_field: false,
        }
    }
}

/// Coordinates port allocation, config patching and rollback for one batch.
///
/// Single-threaded by construction: every mutating operation takes
/// `&mut self`. Drive one orchestrator from one call site, or give each
/// batch its own orchestrator.
pub struct LaunchOrchestrator<O = SystemPortOracle> {
    allocator: PortAllocator<O>,
    rewriter: ConfigPortRewriter,
    ledger: BackupLedger,
    settings: OrchestratorSettings,
    /// Registration order is batch order
    instances: Vec<InstanceRecord>,
    /// Files rewritten in this batch, in modification order
    modified_configs: Vec<PathBuf>,
    launched_instances: Vec<String>,
}

impl<O: PortOracle> LaunchOrchestrator<O> {
    pub fn new(allocator: PortAllocator<O>, settings: OrchestratorSettings) -> Self {
        Self {
            allocator,
            rewriter: ConfigPortRewriter::new(),
            ledger: BackupLedger::new(),
            settings,
            instances: Vec::new(),
            modified_configs: Vec::new(),
            launched_instances: Vec::new(),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn allocator(&self) -> &PortAllocator<O> {
        &self.allocator
    }

    /// Register an instance and allocate its port.
    ///
    /// The n-th registration prefers `base_port + n * 10` and falls back to
    /// scanning from `range.low + n`. Nothing is registered on failure.
    pub fn register_instance(
        &mut self,
        name: &str,
        bot_path: impl Into<PathBuf>,
        config_name: &str,
        base_port: u16,
    ) -> Result<u16> {
        if self.index_of(name).is_some() {
            return Err(Error::DuplicateInstanceName(name.to_string()));
        }

        let index = self.instances.len();
        let preferred = preferred_port_for(base_port, index);
        let offset = u16::try_from(index).unwrap_or(u16::MAX);
        let port = self.allocator.allocate(preferred, offset)?;

        self.instances.push(InstanceRecord::new(
            name.to_string(),
            bot_path.into(),
            config_name.to_string(),
            port,
        ));
        tracing::info!("Registered instance '{}' on port {}", name, port);
        Ok(port)
    }

    /// Drop an instance from the registry and return its port to the pool.
    pub fn unregister_instance(&mut self, name: &str) -> bool {
        let Some(index) = self.index_of(name) else {
            return false;
        };
        let record = self.instances.remove(index);
        self.allocator.release(record.allocated_port());
        tracing::info!("Unregistered instance '{}'", name);
        true
    }

    pub fn instance(&self, name: &str) -> Option<&InstanceRecord> {
        self.instances.iter().find(|r| r.name() == name)
    }

    pub fn get_all_instances(&self) -> &[InstanceRecord] {
        &self.instances
    }

    /// Absolute path of the bot config file for `record`.
    pub fn config_path_for(&self, record: &InstanceRecord) -> PathBuf {
        record.bot_path().join(&self.settings.config_file)
    }

    /// Back up and patch the instance's config with its allocated port.
    ///
    /// `Ok(true)` when the instance is `environment_ready`, `Ok(false)` when
    /// preparation failed and the instance is now `failed`. A missing config
    /// or one without port fields is only a warning unless
    /// `require_port_field` is set.
    pub fn prepare_environment(&mut self, name: &str) -> Result<bool> {
        let index = self.require_index(name)?;
        self.check_transition(index, InstanceStatus::EnvironmentReady)?;

        let record = &self.instances[index];
        let port = record.allocated_port();
        let path = self.config_path_for(record);

        if !path.exists() {
            if self.settings.require_port_field {
                tracing::error!(
                    "Instance '{}' has no config at {}, refusing to launch",
                    name,
                    path.display()
                );
                return Ok(self.fail(index));
            }
            tracing::warn!(
                "Instance '{}' has no config at {}, skipping port rewrite",
                name,
                path.display()
            );
            self.instances[index].set_status(InstanceStatus::EnvironmentReady);
            return Ok(true);
        }

        if self.ledger.backup(&path).is_none() {
            tracing::error!(
                "Could not back up {} for instance '{}', not rewriting",
                path.display(),
                name
            );
            return Ok(self.fail(index));
        }

        let format = self
            .settings
            .config_format
            .or_else(|| ConfigFormat::from_path(&path))
            .unwrap_or(ConfigFormat::Text);

        if self.rewriter.rewrite(&path, port, format) {
            self.record_modified(path);
        } else if self.rewriter.has_port_fields(&path, format) {
            tracing::debug!("{} already uses port {}", path.display(), port);
        } else if self.settings.require_port_field {
            tracing::error!(
                "Instance '{}': no port field could be set in {}",
                name,
                path.display()
            );
            return Ok(self.fail(index));
        } else {
            tracing::warn!(
                "Instance '{}': no port field changed in {}, it must get port {} some other way",
                name,
                path.display(),
                port
            );
        }

        self.instances[index].set_status(InstanceStatus::EnvironmentReady);
        tracing::info!("Instance '{}' environment ready on port {}", name, port);
        Ok(true)
    }

    /// Record that the process supervisor started `name`.
    pub fn mark_launched(&mut self, name: &str) -> Result<()> {
        let index = self.require_index(name)?;
        if self.instances[index].status() == InstanceStatus::Launched {
            return Ok(());
        }
        self.check_transition(index, InstanceStatus::Launched)?;
        self.instances[index].set_status(InstanceStatus::Launched);
        if !self.launched_instances.iter().any(|n| n == name) {
            self.launched_instances.push(name.to_string());
        }
        Ok(())
    }

    pub fn mark_failed(&mut self, name: &str) -> Result<()> {
        let index = self.require_index(name)?;
        self.fail(index);
        Ok(())
    }

    /// Record a mutation made outside [`prepare_environment`].
    ///
    /// Only paths with a tracked backup can be rolled back, so anything else
    /// is refused with `false`.
    ///
    /// [`prepare_environment`]: LaunchOrchestrator::prepare_environment
    pub fn mark_config_modified(&mut self, path: &Path) -> bool {
        if !self.ledger.is_tracked(path) {
            tracing::warn!(
                "Refusing to track {} as modified: it has no backup",
                path.display()
            );
            return false;
        }
        self.record_modified(path.to_path_buf());
        true
    }

    /// Back up a file ahead of a caller-driven mutation.
    pub fn backup_config(&mut self, path: &Path) -> Option<PathBuf> {
        self.ledger.backup(path)
    }

    /// Restore every modified file, discard all backups, clear both logs.
    pub fn rollback_all(&mut self) -> RollbackReport {
        tracing::warn!(
            "Rolling back {} modified config file(s)",
            self.modified_configs.len()
        );

        let modified = std::mem::take(&mut self.modified_configs);
        let results: Vec<(PathBuf, bool)> = modified
            .into_iter()
            .map(|path| {
                let restored = self.ledger.restore(&path);
                (path, restored)
            })
            .collect();

        self.ledger.discard(None);
        self.launched_instances.clear();

        let report = RollbackReport { results };
        tracing::info!(
            "Rollback finished: {}/{} file(s) restored",
            report.restored_count(),
            report.results.len()
        );
        for path in report.failed_paths() {
            tracing::error!("Could not restore {}, fix it manually", path.display());
        }
        report
    }

    /// Accept the batch: drop backups without restoring and clear both logs.
    pub fn commit(&mut self) {
        tracing::info!(
            "Committing batch: {} modified file(s), {} launched instance(s)",
            self.modified_configs.len(),
            self.launched_instances.len()
        );
        self.ledger.discard(None);
        self.modified_configs.clear();
        self.launched_instances.clear();
    }

    pub fn get_rollback_status(&self) -> RollbackStatus {
        RollbackStatus {
            modified_configs: self.modified_configs.clone(),
            launched_instances: self.launched_instances.clone(),
            config_backups: self.ledger.entries(),
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.instances.iter().position(|r| r.name() == name)
    }

    fn require_index(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| Error::InstanceNotFound(name.to_string()))
    }

    fn check_transition(&self, index: usize, next: InstanceStatus) -> Result<()> {
        let record = &self.instances[index];
        if record.status().can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                name: record.name().to_string(),
                from: record.status().to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Mark the instance failed; always returns `false` for use as a result.
    fn fail(&mut self, index: usize) -> bool {
        let record = &mut self.instances[index];
        tracing::warn!("Instance '{}' failed ({})", record.name(), record.status());
        record.set_status(InstanceStatus::Failed);
        false
    }

    fn record_modified(&mut self, path: PathBuf) {
        if !self.modified_configs.contains(&path) {
            self.modified_configs.push(path);
        }
    }
}
