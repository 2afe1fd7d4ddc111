use clap::Parser;
use colored::Colorize;

use canarywatch_cli::cli::{Cli, Commands};
use canarywatch_cli::commands;
use canarywatch_cli::error::CliError;
use canarywatch_cli::logging;
use canarywatch_cli::output::OutputWriter;
use canarywatch_core::config::{CanarywatchConfig, GeneralConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let loaded = CanarywatchConfig::load_or_default(cli.config.as_deref()).await;

    let general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_else(|_| GeneralConfig::default());
    logging::init_tracing(&general, cli.log_level.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;
    canarywatch_core::metrics::describe_all();

    tracing::debug!(
        config = ?cli.config,
        version = env!("CARGO_PKG_VERSION"),
        "canarywatch starting"
    );

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, &loaded?, &writer).await,
        Commands::Rules(args) => commands::rules::execute(args, &loaded?, &writer).await,
        Commands::Evaluate(args) => commands::evaluate::execute(args, &loaded?, &writer).await,
        Commands::Summarize(args) => commands::summarize::execute(args, &loaded?, &writer).await,
        Commands::Config(args) => {
            commands::config::execute(args, cli.config.as_deref(), loaded, &writer).await
        }
    }
}
