mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the transformed text
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        cli::Commands::Sanitize { input, json, gates } => {
            let config = commands::load_config(config_path)?;
            commands::sanitize::handle(&config, &input, json, gates).await
        }
        cli::Commands::Restore {
            original,
            response,
            gates,
        } => {
            let config = commands::load_config(config_path)?;
            commands::restore::handle(&config, &original, &response, gates).await
        }
        cli::Commands::Patterns { category } => {
            let config = commands::load_config(config_path)?;
            commands::patterns::handle(&config, category.as_deref())
        }
        cli::Commands::Config => commands::config::handle(config_path),
        cli::Commands::Completions { shell } => {
            commands::completions::handle(shell);
            Ok(())
        }
    }
}
