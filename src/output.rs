/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// `--quiet` can drop chatter while keeping failures visible. Machine-readable
/// `--json` output bypasses it and goes straight to stdout.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Registered 3 instance(s)")
    fn status(&self, message: &str);

    /// Success message (e.g., "All instances launched")
    fn success(&self, message: &str);

    /// Warning message (e.g., "Rolled back after 'beta' failed")
    fn warning(&self, message: &str);

    /// Error message (e.g., "Could not restore config/bot_config.toml")
    fn error(&self, message: &str);

    /// A blank line separator.
    fn blank(&self);
}

/// Standard CLI output: writes to stdout/stderr with ANSI colors.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("\x1b[32m{}\x1b[0m", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("\x1b[33m{}\x1b[0m", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn blank(&self) {
        println!();
    }
}

/// Prints only warnings and errors. Used with `--quiet`.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn blank(&self) {}
}

/// Pick the output implementation for the `--quiet` flag.
pub fn for_quiet(quiet: bool) -> Box<dyn UserOutput> {
    if quiet {
        Box::new(QuietOutput)
    } else {
        Box::new(CliOutput)
    }
}
