use clap::Parser;
use owo_colors::{OwoColorize, Style};
use taskeduler_core::error::CoreError;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod jobs;
mod parser;
mod views;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            handle_error(e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        cli::Commands::Run(command) => commands::run::run_tasks(command, &config).await,
        cli::Commands::List(command) => commands::list::list_tasks(command, &config),
        cli::Commands::Preview(command) => commands::preview::preview_task(command, &config),
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    match err.chain().find_map(|e| e.downcast_ref::<CoreError>()) {
        Some(CoreError::UnsupportedFrequency { value, valid }) => {
            eprintln!(
                "{} Unsupported frequency '{}'",
                "Error:".style(error_style),
                value.yellow()
            );
            eprintln!("Valid frequencies are: {}", valid.join(", "));
        }
        Some(CoreError::TaskNotFound(name)) => {
            eprintln!(
                "{} No task named '{}' is configured",
                "Error:".style(error_style),
                name.yellow()
            );
        }
        Some(CoreError::JobNotFound(entrypoint)) => {
            eprintln!("{} {:#}", "Error:".style(error_style), err);
            eprintln!(
                "Unknown entrypoint '{}'. Built-in jobs are: {}",
                entrypoint.yellow(),
                jobs::builtin_registry().entrypoints().join(", ")
            );
        }
        Some(CoreError::InvalidTimezone(_)) => {
            eprintln!("{} {:#}", "Error:".style(error_style), err);
            eprintln!("Use IANA timezone names like 'Europe/Berlin' or 'America/New_York'");
        }
        _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
    }
}
