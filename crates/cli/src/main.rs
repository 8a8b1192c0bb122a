//! `orglink`: train a record-linkage classifier and link two registries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod exit_codes;
mod link;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine: orglink-linkage\nsimilarity: jaro-winkler (high >= 0.95, medium >= 0.80)"
    )
}

#[derive(Parser)]
#[command(name = "orglink")]
#[command(about = "Probabilistic record linkage between organization registries")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on labeled pairs and link both datasets
    #[command(after_help = "\
Examples:
  orglink run linkage.toml
  orglink run linkage.toml --json | jq '.matches | length'
  orglink run linkage.toml --output links.json
  orglink run linkage.toml --max-matches 100 --block-on-city
  orglink run linkage.toml --no-parallel
  orglink -vv run linkage.toml --parallel")]
    Run {
        /// Path to the linkage TOML config
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Stop after this many matches (overrides [matching].max_matches)
        #[arg(long, allow_negative_numbers = true)]
        max_matches: Option<i64>,

        /// Only compare records whose city is identical
        #[arg(long, conflicts_with = "no_block_on_city")]
        block_on_city: bool,

        /// Compare every pair even if the config enables blocking
        #[arg(long)]
        no_block_on_city: bool,

        /// Evaluate candidate pairs across threads
        #[arg(long, conflicts_with = "no_parallel")]
        parallel: bool,

        /// Evaluate on one thread even if the config enables parallel
        #[arg(long)]
        no_parallel: bool,
    },

    /// Train the label table and print the signature ranking
    #[command(after_help = "\
Examples:
  orglink train linkage.toml
  orglink train linkage.toml --json")]
    Train {
        /// Path to the linkage TOML config
        config: PathBuf,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate a linkage config without running
    #[command(after_help = "\
Examples:
  orglink validate linkage.toml")]
    Validate {
        /// Path to the linkage TOML config
        config: PathBuf,
    },
}

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// `--x` / `--no-x` pair; neither keeps the config value.
fn flag_override(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            max_matches,
            block_on_city,
            no_block_on_city,
            parallel,
            no_parallel,
        } => link::cmd_run(
            config,
            json,
            output,
            link::RunOverrides {
                max_matches,
                block_on_city: flag_override(block_on_city, no_block_on_city),
                parallel: flag_override(parallel, no_parallel),
            },
        ),
        Commands::Train { config, json } => link::cmd_train(config, json),
        Commands::Validate { config } => link::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
