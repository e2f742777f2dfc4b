use crate::cli::PortsCommands;
use crate::output::UserOutput;
use multi_launch::port::PortConflict;
use std::path::Path;

pub fn run_ports(
    cmd: &PortsCommands,
    config_path: Option<&Path>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let config = super::load_config_or_default(config_path)?;

    match cmd {
        PortsCommands::Allocate {
            count,
            base_port,
            json,
        } => {
            let mut allocator = super::system_allocator(&config);
            let base = base_port.unwrap_or(config.settings.base_port);
            let ports = allocator.allocate_batch(*count, base)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&ports)?);
            } else {
                let range = allocator.range();
                out.status(&format!(
                    "{} port(s) from base {} in {}-{}:",
                    ports.len(),
                    base,
                    range.low(),
                    range.high()
                ));
                for (i, port) in ports.iter().enumerate() {
                    out.status(&format!("  [{}] {}", i, port));
                }
            }
            Ok(())
        }
        PortsCommands::Check { port, json } => {
            let allocator = super::system_allocator(&config);
            let conflict = PortConflict::check(allocator.oracle(), *port);

            if *json {
                let value = serde_json::json!({
                    "port": port,
                    "in_use": conflict.is_some(),
                    "processes": conflict.as_ref().map(|c| c.processes.clone()).unwrap_or_default(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            match conflict {
                Some(conflict) => {
                    out.warning(&conflict.describe());
                    for p in &conflict.processes {
                        if let Some(ref command) = p.command {
                            out.status(&format!("  {} {}", p.pid, command));
                        }
                    }
                }
                None => out.success(&format!("port {} is free", port)),
            }
            Ok(())
        }
    }
}
