mod cli;
mod dump;

use clap::{CommandFactory, Parser};
use cli::Cli;
use pacer_core::RunStatistics;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pacer=info,pacer_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    if config.urls.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let results = pacer::run(config.clone()).await?;

    let stats = RunStatistics::from_results(&results, cli.cutoff());
    print!("{stats}");

    if let Some(path) = &cli.results_dump {
        if let Err(err) = dump::write(path, &config.urls, &results) {
            error!("Cannot dump results to {}: {err}", path.display());
        }
    }

    Ok(())
}
