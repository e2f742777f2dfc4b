//! Starting and stopping instance processes.
//!
//! The orchestrator only records lifecycle; a [`ProcessSupervisor`] does the
//! actual spawning. [`CommandSupervisor`] runs each instance's configured
//! command in its `bot_path` and hands the allocated port over through the
//! environment.

use crate::error::{Error, Result};
use crate::orchestrator::InstanceRecord;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Default time a freshly spawned process must stay alive to count as started.
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(1500);

/// Environment variables set on every spawned instance.
pub const ENV_PORT: &str = "PORT";
pub const ENV_LAUNCH_PORT: &str = "MULTI_LAUNCH_PORT";
pub const ENV_LAUNCH_INSTANCE: &str = "MULTI_LAUNCH_INSTANCE";

type SyncMutex<T> = parking_lot::Mutex<T>;

#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Start the instance's process. Returns once it is considered running.
    async fn start(&self, instance: &InstanceRecord) -> Result<()>;

    /// Stop a process previously started by this supervisor.
    async fn stop(&self, name: &str) -> Result<()>;
}

/// How to run one instance.
#[derive(Debug, Clone, Default)]
pub struct LaunchCommand {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Spawns configured commands and keeps their child handles.
pub struct CommandSupervisor {
    commands: HashMap<String, LaunchCommand>,
    grace: Duration,
    /// Never held across an await
    children: SyncMutex<HashMap<String, Child>>,
}

impl CommandSupervisor {
    pub fn new(commands: HashMap<String, LaunchCommand>) -> Self {
        Self {
            commands,
            grace: DEFAULT_STARTUP_GRACE,
            children: SyncMutex::new(HashMap::new()),
        }
    }

    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Names of instances with a live child handle.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.children.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Wait for every started child to exit on its own.
    pub async fn wait_all(&self) -> Vec<(String, Option<i32>)> {
        let children: Vec<(String, Child)> = self.children.lock().drain().collect();
        let waits = children.into_iter().map(|(name, mut child)| async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!("Error waiting for instance '{}': {}", name, e);
                    None
                }
            };
            (name, code)
        });
        futures::future::join_all(waits).await
    }

    fn spawn(&self, instance: &InstanceRecord) -> Result<Child> {
        let name = instance.name();
        let launch = self
            .commands
            .get(name)
            .ok_or_else(|| Error::Supervisor(name.to_string(), "no command configured".into()))?;
        let (program, args) = launch
            .argv
            .split_first()
            .ok_or_else(|| Error::Supervisor(name.to_string(), "command is empty".into()))?;

        let port = instance.allocated_port().to_string();
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(instance.bot_path())
            .envs(&launch.env)
            .env(ENV_PORT, &port)
            .env(ENV_LAUNCH_PORT, &port)
            .env(ENV_LAUNCH_INSTANCE, name)
            .stdin(Stdio::null())
            .kill_on_drop(false);

        tracing::debug!("Spawning '{}' for instance '{}' on port {}", program, name, port);
        cmd.spawn().map_err(|e| {
            Error::Supervisor(
                name.to_string(),
                format!("failed to spawn {}: {}", program, e),
            )
        })
    }
}

#[async_trait]
impl ProcessSupervisor for CommandSupervisor {
    async fn start(&self, instance: &InstanceRecord) -> Result<()> {
        let name = instance.name();
        let mut child = self.spawn(instance)?;

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => Err(Error::Supervisor(
                name.to_string(),
                format!("exited during startup ({})", status),
            )),
            Ok(Err(e)) => Err(Error::Supervisor(
                name.to_string(),
                format!("could not wait on process: {}", e),
            )),
            Err(_) => {
                tracing::info!(
                    "Instance '{}' running (pid {:?}) on port {}",
                    name,
                    child.id(),
                    instance.allocated_port()
                );
                self.children.lock().insert(name.to_string(), child);
                Ok(())
            }
        }
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let child = self.children.lock().remove(name);
        let Some(mut child) = child else {
            tracing::debug!("Instance '{}' has no running process", name);
            return Ok(());
        };

        child
            .kill()
            .await
            .map_err(|e| Error::Supervisor(name.to_string(), format!("failed to stop: {}", e)))?;
        tracing::info!("Stopped instance '{}'", name);
        Ok(())
    }
}
