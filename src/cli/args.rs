//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Ingest, validate, transform, train, evaluate and serve a tabular classifier
#[derive(Parser, Debug)]
#[command(name = "tabflow")]
#[command(about = "tabflow - timestamped-run ML pipeline for tabular data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pipeline configuration file (default: ./tabflow.yaml when present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline once (default command)
    #[command(name = "run")]
    Run,

    /// Serve the HTTP front end
    #[command(name = "serve")]
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(short = 'p', long)]
        port: Option<u16>,
    },

    /// Predict labels for JSON records
    #[command(name = "predict")]
    Predict {
        /// File holding a JSON object or array of objects (stdin when omitted or "-")
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Run to predict with (default: latest)
        #[arg(long, value_name = "RUN_ID")]
        run: Option<String>,
    },

    /// Inspect and prune runs
    #[command(name = "runs")]
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunsCommands {
    /// List runs, oldest first
    List,

    /// Print the latest run directory
    Latest,

    /// Remove old runs; the newest run is always kept
    Clean {
        /// Keep this many of the newest runs
        #[arg(long)]
        keep_last: Option<usize>,

        /// Only remove runs older than this (e.g. 7d, 12h)
        #[arg(long, value_parser = parse_age)]
        older_than: Option<Duration>,

        /// Show what would be removed without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_age(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|e| format!("invalid duration '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["tabflow", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_clean_parses_age() {
        let cli = Cli::try_parse_from([
            "tabflow",
            "runs",
            "clean",
            "--keep-last",
            "3",
            "--older-than",
            "2days",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Runs {
                command:
                    RunsCommands::Clean {
                        keep_last,
                        older_than,
                        dry_run,
                    },
            }) => {
                assert_eq!(keep_last, Some(3));
                assert_eq!(older_than, Some(Duration::from_secs(2 * 86_400)));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["tabflow", "predict", "--config", "p.yaml", "--run", "20240101_000000"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("p.yaml")));
    }

    #[test]
    fn test_bad_age_rejected() {
        assert!(Cli::try_parse_from(["tabflow", "runs", "clean", "--older-than", "soon"]).is_err());
    }
}
