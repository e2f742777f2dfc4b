mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use multi_launch::Error as LaunchError;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(launch_error) = e.downcast_ref::<LaunchError>() {
            eprintln!("Error: {}", launch_error);
            if let Some(suggestion) = launch_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let out = output::for_quiet(cli.quiet);
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Launch {
            names,
            base_port,
            dry_run,
            json,
        } => commands::run_launch(names, *base_port, *dry_run, *json, config, out.as_ref()).await,
        Commands::Ports(ports_cmd) => commands::run_ports(ports_cmd, config, out.as_ref()),
        Commands::Rewrite { file, port, format } => {
            commands::run_rewrite(file, *port, format.as_deref(), out.as_ref())
        }
        Commands::Backups(backups_cmd) => commands::run_backups(backups_cmd, out.as_ref()),
        Commands::Instances { json } => commands::run_instances(*json, config, out.as_ref()),
        Commands::Validate => commands::run_validate(config, out.as_ref()),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
