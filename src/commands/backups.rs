use crate::cli::BackupsCommands;
use crate::output::UserOutput;
use multi_launch::backup::{clean_stray_backups, find_stray_backups};

pub fn run_backups(cmd: &BackupsCommands, out: &dyn UserOutput) -> anyhow::Result<()> {
    match cmd {
        BackupsCommands::List { dir } => {
            let found = find_stray_backups(dir)?;
            if found.is_empty() {
                out.status(&format!("No backups in {}", dir.display()));
                return Ok(());
            }
            for path in &found {
                println!("{}", path.display());
            }
            Ok(())
        }
        BackupsCommands::Clean { dir } => {
            let removed = clean_stray_backups(dir)?;
            for path in &removed {
                out.status(&format!("  removed {}", path.display()));
            }
            out.success(&format!("Removed {} backup file(s)", removed.len()));
            Ok(())
        }
    }
}
