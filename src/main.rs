mod cli;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use update_gateway::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => server::run(args.address).await?,
    }

    Ok(())
}
