use crate::output::UserOutput;
use std::path::Path;

pub fn run_instances(
    json: bool,
    config_path: Option<&Path>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let (path, config) = super::load_config(config_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.instances)?);
        return Ok(());
    }

    out.status(&format!("Instances in {}:", path.display()));
    if config.instances.is_empty() {
        out.status("  (none)");
        return Ok(());
    }
    for instance in &config.instances {
        let base = instance.base_port.unwrap_or(config.settings.base_port);
        let command = if instance.command.is_empty() {
            "-".to_string()
        } else {
            instance.command.join(" ")
        };
        out.status(&format!(
            "  {:<16} base {:<5} {}  [{}]",
            instance.name,
            base,
            instance.bot_path.display(),
            command
        ));
    }
    Ok(())
}
