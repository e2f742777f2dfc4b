use crate::output::UserOutput;
use multi_launch::rewrite::{ConfigFormat, ConfigPortRewriter};
use multi_launch::Error;
use std::path::Path;

pub fn run_rewrite(
    file: &Path,
    port: u16,
    format: Option<&str>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let format = match format {
        Some(name) => name.parse::<ConfigFormat>()?,
        None => ConfigFormat::from_path(file).ok_or_else(|| {
            Error::UnsupportedFormat(
                file.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("<none>")
                    .to_string(),
            )
        })?,
    };

    if !file.exists() {
        anyhow::bail!("{} does not exist", file.display());
    }

    if ConfigPortRewriter::new().rewrite(file, port, format) {
        out.success(&format!("Set port fields in {} to {}", file.display(), port));
    } else {
        out.warning(&format!(
            "No port fields changed in {} (already {} or none recognised)",
            file.display(),
            port
        ));
    }
    Ok(())
}
