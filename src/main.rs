mod cli;
mod engine;
mod error;
mod host;
mod logging;
mod model;
mod orchestrator;
mod prompt;
mod text_summary;
#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let args = cli::Cli::parse();

    let completion = cli::run(args).await?;
    // Exit code carries the run outcome for scripted use.
    std::process::exit(completion.exit_code());
}
