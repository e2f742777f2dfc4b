//! # Multi Launch
//!
//! Launch several instances of the same bot side by side, each on its own
//! port, with all-or-nothing config changes.
//!
//! ## Features
//!
//! - **Port allocation**: unique, free, non-reserved ports from a configured range,
//!   spaced ten apart per batch member
//! - **Config rewriting**: port fields patched in TOML-like text (layout preserved),
//!   JSON and YAML
//! - **Backups and rollback**: every modified config is backed up first and restored
//!   if any instance in the batch fails
//! - **Process supervision**: instances started with their allocated port in the
//!   environment and stopped again on rollback
//!
//! ## Quick Start
//!
//! ```no_run
//! use multi_launch::orchestrator::{launch_batch, LaunchOrchestrator, OrchestratorSettings};
//! use multi_launch::port::{PortAllocator, PortRange};
//! use multi_launch::supervisor::CommandSupervisor;
//!
//! # async fn example() -> Result<(), multi_launch::Error> {
//! let allocator = PortAllocator::new(PortRange::new(8000, 9000)?);
//! let mut orchestrator = LaunchOrchestrator::new(allocator, OrchestratorSettings::default());
//!
//! orchestrator.register_instance("alpha", "/srv/bots/alpha", "alpha", 8000)?;
//! orchestrator.register_instance("beta", "/srv/bots/beta", "beta", 8000)?;
//!
//! let supervisor = CommandSupervisor::new(Default::default());
//! let outcome = launch_batch(&mut orchestrator, &supervisor).await?;
//! println!("committed: {}", outcome.is_committed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! One [`LaunchOrchestrator`] serves one batch from one task: its mutating
//! methods take `&mut self`. Only process starts run concurrently, inside
//! [`orchestrator::launch_batch`].

pub mod backup;
pub mod config;
pub mod error;
pub mod fs_util;
pub mod orchestrator;
pub mod port;
pub mod rewrite;
pub mod supervisor;

// Re-export commonly used types
pub use backup::BackupLedger;
pub use config::{LauncherConfig, Parser};
pub use error::{Error, Result};
pub use orchestrator::{InstanceRecord, InstanceStatus, LaunchOrchestrator};
pub use port::{PortAllocator, PortOracle, PortRange, SystemPortOracle};
pub use rewrite::{ConfigFormat, ConfigPortRewriter};
