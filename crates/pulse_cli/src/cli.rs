//! Argument parsing. `Run`/`Genome`/`Status` is a deliberate departure from
//! the teacher's flat-REPL shape; the flag names (`--config`, `--log-level`,
//! `--log-file`) still follow the teacher's own conventions.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pulse — the nervous-system daemon", long_about = None)]
pub struct Args {
    /// Path to the TOML config file. Missing or unreadable falls back to
    /// defaults rather than aborting.
    #[arg(long, env = "PULSE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "PULSE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long)]
    pub log_json: bool,

    #[arg(long, env = "PULSE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs the tick loop until interrupted.
    Run,
    /// Inspect or mutate the exportable Genome.
    Genome(GenomeArgs),
    /// Prints a one-shot status snapshot and exits.
    Status,
}

#[derive(ClapArgs, Debug)]
pub struct GenomeArgs {
    #[command(subcommand)]
    pub command: GenomeCommand,
}

#[derive(Subcommand, Debug)]
pub enum GenomeCommand {
    /// Writes the current Genome as TOML to stdout, or to `--out` if given.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replaces the current Genome from a TOML file.
    Import {
        path: PathBuf,
    },
    /// Prints the current Genome as JSON.
    Show,
    /// Diffs the current Genome against a TOML file.
    Diff {
        path: PathBuf,
    },
}
