mod core;
mod lifecycle;
mod types;

pub use core::{LaunchOrchestrator, OrchestratorSettings, DEFAULT_CONFIG_FILE};
pub use lifecycle::{launch_batch, BatchOutcome};
pub use types::{InstanceRecord, InstanceStatus, RollbackReport, RollbackStatus};
