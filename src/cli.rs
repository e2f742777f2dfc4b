use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mlaunch")]
#[command(about = "Launch several bot instances with unique ports and all-or-nothing config rollback")]
pub struct Cli {
    /// Config file path (defaults to multi-launch.toml found in this or a parent directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Allocate ports, patch configs and start instances as one batch
    Launch {
        /// Instances to launch (defaults to all, in config order)
        names: Vec<String>,

        /// Base port for this batch (overrides settings.base_port and per-instance values)
        #[arg(long)]
        base_port: Option<u16>,

        /// Show the port plan without touching files or starting processes
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect and preview port allocation
    #[command(subcommand)]
    Ports(PortsCommands),
    /// Rewrite the port fields of one config file (no backup is taken)
    Rewrite {
        /// Config file to patch
        file: PathBuf,

        /// New port value
        #[arg(short, long)]
        port: u16,

        /// toml, json or yaml (detected from the extension by default)
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Find or remove leftover config backups
    #[command(subcommand)]
    Backups(BackupsCommands),
    /// List configured instances
    Instances {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration without launching anything
    Validate,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Clone)]
pub enum PortsCommands {
    /// Preview the ports a batch of the given size would get
    Allocate {
        /// Number of ports
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Base port (defaults to settings.base_port)
        #[arg(long)]
        base_port: Option<u16>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a port is in use and by whom
    Check {
        port: u16,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum BackupsCommands {
    /// List backup files in a directory
    #[command(alias = "ls")]
    List {
        /// Directory holding the config files
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Delete backup files in a directory
    Clean {
        /// Directory holding the config files
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}
