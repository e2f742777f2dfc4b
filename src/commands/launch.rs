use crate::output::UserOutput;
use multi_launch::config::InstanceDefinition;
use multi_launch::orchestrator::{launch_batch, BatchOutcome, LaunchOrchestrator};
use multi_launch::supervisor::CommandSupervisor;
use multi_launch::Error;
use std::collections::HashMap;
use std::path::Path;

pub async fn run_launch(
    names: &[String],
    base_port: Option<u16>,
    dry_run: bool,
    json: bool,
    config_path: Option<&Path>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let (_, config) = super::load_config(config_path)?;

    let selected: Vec<&InstanceDefinition> = if names.is_empty() {
        config.instances.iter().collect()
    } else {
        names
            .iter()
            .map(|name| {
                config
                    .instance(name)
                    .ok_or_else(|| Error::InstanceNotFound(name.clone()))
            })
            .collect::<Result<_, _>>()?
    };

    if selected.is_empty() {
        out.warning("No instances configured, nothing to launch");
        return Ok(());
    }

    let mut orchestrator = LaunchOrchestrator::new(
        super::system_allocator(&config),
        config.settings.orchestrator_settings(),
    );

    for instance in &selected {
        let base = base_port
            .or(instance.base_port)
            .unwrap_or(config.settings.base_port);
        let port = orchestrator.register_instance(
            &instance.name,
            &instance.bot_path,
            instance.config_name(),
            base,
        )?;
        if !json {
            out.status(&format!("  {} -> port {}", instance.name, port));
        }
    }

    if dry_run {
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(orchestrator.get_all_instances())?
            );
        } else {
            out.blank();
            out.success(&format!(
                "Dry run: {} instance(s) planned, no files changed",
                selected.len()
            ));
        }
        return Ok(());
    }

    let commands: HashMap<String, _> = selected
        .iter()
        .map(|i| (i.name.clone(), i.launch_command()))
        .collect();
    let supervisor =
        CommandSupervisor::new(commands).with_startup_grace(config.settings.startup_grace());

    let outcome = launch_batch(&mut orchestrator, &supervisor).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        BatchOutcome::Committed { ports } => {
            if !json {
                out.blank();
                out.success(&format!("Launched {} instance(s)", ports.len()));
            }
            let exits = supervisor.wait_all().await;
            for (name, code) in exits {
                if json {
                    tracing::info!("Instance '{}' exited with {:?}", name, code);
                    continue;
                }
                match code {
                    Some(0) => out.status(&format!("Instance '{}' exited", name)),
                    Some(code) => {
                        out.warning(&format!("Instance '{}' exited with code {}", name, code))
                    }
                    None => out.warning(&format!("Instance '{}' terminated by signal", name)),
                }
            }
            Ok(())
        }
        BatchOutcome::RolledBack { failed, report } => {
            if !json {
                out.error(&format!("Launch failed for: {}", failed.join(", ")));
                for (path, restored) in &report.results {
                    if *restored {
                        out.status(&format!("  restored {}", path.display()));
                    } else {
                        out.error(&format!("  could NOT restore {}", path.display()));
                    }
                }
            }
            anyhow::bail!(
                "batch rolled back ({} of {} config file(s) restored)",
                report.restored_count(),
                report.results.len()
            )
        }
    }
}
