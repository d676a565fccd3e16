//! CLI command definitions using clap.
//!
//! - run: work a goal through the approval loop
//! - snapshot: print the repository listing the agents see

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Babysitter - every file change an agent proposes goes through a second gate
#[derive(Parser, Debug)]
#[command(name = "babysitter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the approval loop for a goal
    Run {
        /// What the agent should achieve
        goal: String,

        /// Repository the agent may change
        #[arg(short, long, default_value = ".")]
        repo_root: PathBuf,

        /// Round budget (defaults to session.max_rounds from config)
        #[arg(short, long)]
        max_rounds: Option<u32>,

        /// Which evaluator gates the proposals
        #[arg(short, long, value_enum, default_value_t = Gate::Llm)]
        gate: Gate,
    },

    /// Print the repository snapshot
    Snapshot {
        #[arg(short, long, default_value = ".")]
        repo_root: PathBuf,

        /// Output cap (defaults to snapshot.max_bytes from config)
        #[arg(long)]
        max_bytes: Option<usize>,
    },
}

/// Evaluator selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Ask the LLM evaluator
    Llm,
    /// Approve everything
    Approve,
    /// Decline everything
    Decline,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["babysitter"]).is_err());
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["babysitter", "run", "add a README"]).unwrap();
        match cli.command {
            Commands::Run {
                goal,
                repo_root,
                max_rounds,
                gate,
            } => {
                assert_eq!(goal, "add a README");
                assert_eq!(repo_root, PathBuf::from("."));
                assert!(max_rounds.is_none());
                assert_eq!(gate, Gate::Llm);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let cli = Cli::try_parse_from([
            "babysitter",
            "-v",
            "run",
            "fix typo",
            "--repo-root",
            "/tmp/repo",
            "--max-rounds",
            "3",
            "--gate",
            "decline",
        ])
        .unwrap();
        assert!(cli.is_verbose());
        match cli.command {
            Commands::Run {
                repo_root,
                max_rounds,
                gate,
                ..
            } => {
                assert_eq!(repo_root, PathBuf::from("/tmp/repo"));
                assert_eq!(max_rounds, Some(3));
                assert_eq!(gate, Gate::Decline);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_unknown_gate_rejected() {
        assert!(Cli::try_parse_from(["babysitter", "run", "g", "--gate", "maybe"]).is_err());
    }

    #[test]
    fn test_snapshot_command() {
        let cli = Cli::try_parse_from(["babysitter", "snapshot", "-r", "src", "--max-bytes", "100"]).unwrap();
        match cli.command {
            Commands::Snapshot { repo_root, max_bytes } => {
                assert_eq!(repo_root, PathBuf::from("src"));
                assert_eq!(max_bytes, Some(100));
            }
            _ => panic!("Expected snapshot command"),
        }
    }

    #[test]
    fn test_config_option_is_global() {
        let cli = Cli::try_parse_from(["babysitter", "snapshot", "-c", "/etc/babysitter.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/babysitter.yml")));
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
