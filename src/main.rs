// src/main.rs — proposer entry point

use clap::Parser;

use proposer::cli::{self, Cli, Commands};
use proposer::infra::config::Config;
use proposer::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG still wins over either level
    logger::init_logging(if cli.verbose { "info" } else { "warn" });

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Run(args) => cli::run::run_proposal(args, config, cli.quiet).await,
        Commands::Resume { snapshot, session } => {
            cli::run::resume_proposal(snapshot, session, config, cli.quiet).await
        }
        Commands::Show { snapshot, json } => cli::run::show_snapshot(&snapshot, json),
    }
}
