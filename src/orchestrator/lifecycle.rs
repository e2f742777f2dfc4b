use super::core::LaunchOrchestrator;
use super::types::RollbackReport;
use crate::error::Result;
use crate::port::PortOracle;
use crate::supervisor::ProcessSupervisor;
use serde::Serialize;

/// How a batch launch ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every instance started; backups were discarded.
    Committed { ports: Vec<(String, u16)> },
    /// At least one instance failed; all config changes were undone.
    RolledBack {
        failed: Vec<String>,
        report: RollbackReport,
    },
}

impl BatchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, BatchOutcome::Committed { .. })
    }
}

/// Prepare, start and commit every registered instance as one unit.
///
/// Preparation runs in registration order and stops at the first failure.
/// Starts run concurrently. Any failure stops what was started and rolls
/// back every modified config. Errors from preparation are propagated after
/// the rollback.
pub async fn launch_batch<O: PortOracle>(
    orchestrator: &mut LaunchOrchestrator<O>,
    supervisor: &dyn ProcessSupervisor,
) -> Result<BatchOutcome> {
    let names: Vec<String> = orchestrator
        .get_all_instances()
        .iter()
        .map(|r| r.name().to_string())
        .collect();
    tracing::info!("Launching batch of {} instance(s)", names.len());

    for name in &names {
        match orchestrator.prepare_environment(name) {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!("Preparation failed for '{}', rolling back batch", name);
                let report = orchestrator.rollback_all();
                return Ok(BatchOutcome::RolledBack {
                    failed: vec![name.clone()],
                    report,
                });
            }
            Err(e) => {
                orchestrator.rollback_all();
                return Err(e);
            }
        }
    }

    let records: Vec<_> = orchestrator.get_all_instances().to_vec();
    let starts = records.iter().map(|record| supervisor.start(record));
    let results = futures::future::join_all(starts).await;

    let mut failed = Vec::new();
    for (record, result) in records.iter().zip(results) {
        match result {
            Ok(()) => orchestrator.mark_launched(record.name())?,
            Err(e) => {
                tracing::error!("Instance '{}' failed to start: {}", record.name(), e);
                orchestrator.mark_failed(record.name())?;
                failed.push(record.name().to_string());
            }
        }
    }

    if failed.is_empty() {
        let ports = records
            .iter()
            .map(|r| (r.name().to_string(), r.allocated_port()))
            .collect();
        orchestrator.commit();
        return Ok(BatchOutcome::Committed { ports });
    }

    for name in orchestrator.get_rollback_status().launched_instances {
        if let Err(e) = supervisor.stop(&name).await {
            tracing::warn!("Failed to stop '{}' during rollback: {}", name, e);
        }
    }
    let report = orchestrator.rollback_all();
    Ok(BatchOutcome::RolledBack { failed, report })
}
