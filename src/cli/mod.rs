// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "proposer",
    about = "Draft, critique and refine proposals with a panel of model critics",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ~/.proposer/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress progress output (only emit the final proposal)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log at info level instead of warn (RUST_LOG overrides both)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a proposal and refine it until it is accepted
    Run(RunArgs),
    /// Continue an interrupted run from its snapshot
    Resume {
        /// Snapshot written by an earlier `run --snapshot`
        #[arg(long)]
        snapshot: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Print a snapshot: final proposal, scores and termination reason
    Show {
        #[arg(long)]
        snapshot: PathBuf,
        /// Print the raw snapshot JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Problem statement file (TOML or JSON with text, goals, constraints)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Default model for every role
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum optimization rounds
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Overall score (0-10) at which a proposal is accepted
    #[arg(long)]
    pub excellent_score: Option<f64>,

    /// Keep going when a critic fails, scoring on the rest
    #[arg(long)]
    pub tolerate_failures: bool,

    /// Where to write the run snapshot (defaults to the data directory)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Options shared by `run` and `resume`.
#[derive(Args, Clone, Default)]
pub struct SessionArgs {
    /// Ask before each optimization round
    #[arg(long)]
    pub review: bool,

    /// Directory of .md/.txt reference documents for the proposer and optimizer
    #[arg(long)]
    pub references: Option<PathBuf>,

    /// Print the final state as JSON instead of the proposal text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "proposer",
            "run",
            "--input",
            "task.toml",
            "--max-iterations",
            "2",
            "--excellent-score",
            "8.0",
            "--review",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input, PathBuf::from("task.toml"));
                assert_eq!(args.max_iterations, Some(2));
                assert_eq!(args.excellent_score, Some(8.0));
                assert!(args.session.review);
                assert!(!args.tolerate_failures);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_resume_with_global_flags() {
        let cli = Cli::parse_from(["proposer", "resume", "--snapshot", "run.json", "-q"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Resume { .. }));
    }

    #[test]
    fn test_run_requires_input() {
        assert!(Cli::try_parse_from(["proposer", "run"]).is_err());
    }
}
