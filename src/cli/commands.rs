//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: execute the full pipeline for one stored pair
//! - plan: print the plan for a request without executing it
//! - pair: put/get pairs in the local store

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use verimath::tools::Numeric;

/// verimath - verified arithmetic over stored value pairs
#[derive(Parser, Debug)]
#[command(name = "verimath")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Request parameters shared by `run` and `plan`.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Partition key of the stored pair (e.g. USER#alice)
    #[arg(long)]
    pub pk: String,

    /// Sort key of the stored pair (e.g. PAIR#001)
    #[arg(long)]
    pub sk: String,

    /// Operation: add, subtract, multiply or divide
    #[arg(short, long)]
    pub operation: Option<String>,

    /// Task description passed to the planner
    #[arg(short, long)]
    pub task: Option<String>,

    /// Skip the LLM and use the fallback plan
    #[arg(long)]
    pub no_llm: bool,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and print the response
    Run {
        #[command(flatten)]
        request: RequestArgs,

        /// Print the run summary (timings, retries) instead of just the response
        #[arg(short, long)]
        summary: bool,
    },

    /// Print the plan for a request without executing it
    Plan {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Manage stored pairs
    Pair {
        #[command(subcommand)]
        command: PairCommands,
    },
}

/// Pair store subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PairCommands {
    /// Store a pair, replacing any existing one
    Put {
        #[arg(long)]
        pk: String,

        #[arg(long)]
        sk: String,

        #[arg(long, allow_hyphen_values = true)]
        val1: Numeric,

        #[arg(long, allow_hyphen_values = true)]
        val2: Numeric,
    },

    /// Show a stored pair
    Get {
        #[arg(long)]
        pk: String,

        #[arg(long)]
        sk: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["verimath"]).is_err());
    }

    #[test]
    fn test_run_parses_request() {
        let cli = Cli::try_parse_from([
            "verimath",
            "run",
            "--pk",
            "USER#alice",
            "--sk",
            "PAIR#001",
            "-o",
            "divide",
            "--no-llm",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { request, summary } => {
                assert_eq!(request.pk, "USER#alice");
                assert_eq!(request.sk, "PAIR#001");
                assert_eq!(request.operation.as_deref(), Some("divide"));
                assert!(request.no_llm);
                assert!(request.task.is_none());
                assert!(!summary);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "verimath",
            "plan",
            "--pk",
            "a",
            "--sk",
            "b",
            "-v",
            "-c",
            "/tmp/verimath.yml",
        ])
        .unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/verimath.yml")));
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }

    #[test]
    fn test_pair_put_parses_numbers() {
        let cli = Cli::try_parse_from([
            "verimath", "pair", "put", "--pk", "USER#a", "--sk", "PAIR#1", "--val1", "-7.5", "--val2", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Pair {
                command: PairCommands::Put { val1, val2, .. },
            } => {
                assert_eq!(val1, Numeric::Float(-7.5));
                assert!(matches!(val2, Numeric::Int(2)));
            }
            _ => panic!("Expected pair put command"),
        }
    }

    #[test]
    fn test_pair_put_rejects_non_numbers() {
        let result = Cli::try_parse_from([
            "verimath", "pair", "put", "--pk", "a", "--sk", "b", "--val1", "one", "--val2", "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pair_get() {
        let cli = Cli::try_parse_from(["verimath", "pair", "get", "--pk", "a", "--sk", "b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pair {
                command: PairCommands::Get { .. }
            }
        ));
    }
}
