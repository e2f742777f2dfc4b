use super::LauncherConfig;
use crate::error::{Error, Result};
use std::collections::HashSet;

impl LauncherConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for instance in &self.instances {
            if instance.name.trim().is_empty() {
                return Err(Error::Config("Instance name must not be empty".to_string()));
            }
            if !seen.insert(instance.name.as_str()) {
                return Err(Error::Config(format!(
                    "Instance '{}' is defined more than once",
                    instance.name
                )));
            }
            if instance.base_port == Some(0)
                || (instance.base_port.is_none() && self.settings.base_port == 0)
            {
                return Err(Error::Config(format!(
                    "Instance '{}' has base_port 0",
                    instance.name
                )));
            }
            if let Some(first) = instance.command.first() {
                if first.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "Instance '{}' has an empty program in its command",
                        instance.name
                    )));
                }
            }
        }

        if self.settings.probe_timeout_ms == 0 {
            return Err(Error::Config("probe_timeout_ms must be greater than 0".to_string()));
        }

        Ok(())
    }
}
