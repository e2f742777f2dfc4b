use crate::output::UserOutput;
use std::path::Path;

pub fn run_validate(config_path: Option<&Path>, out: &dyn UserOutput) -> anyhow::Result<()> {
    let (path, config) = super::load_config(config_path)?;

    for instance in &config.instances {
        if !instance.bot_path.is_dir() {
            out.warning(&format!(
                "Instance '{}': bot_path {} does not exist",
                instance.name,
                instance.bot_path.display()
            ));
        }
        if instance.command.is_empty() {
            out.warning(&format!(
                "Instance '{}' has no command; `mlaunch launch` will fail for it",
                instance.name
            ));
        }
    }

    out.success(&format!(
        "{} is valid ({} instance(s))",
        path.display(),
        config.instances.len()
    ));
    Ok(())
}
