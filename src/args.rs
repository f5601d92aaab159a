use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array containing every stamped message.
    Json,
    /// One stamped message per line.
    Jsonl,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a TypeScript file, evaluate it in an isolated realm, and
    /// print the stamped message stream.
    Run {
        /// Path to the TypeScript source file.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Declare a package dependency (can be provided multiple times),
        /// e.g. `--dep lodash` or `--dep lodash@4.17.21`.
        #[arg(long = "dep", value_name = "NAME")]
        deps: Vec<String>,

        /// JSON file mapping request hashes to recorded responses.
        #[arg(long, value_name = "PATH")]
        fetch_mocks: Option<PathBuf>,

        /// JSON file mapping query hashes to recorded row sets.
        #[arg(long, value_name = "PATH")]
        sql_mocks: Option<PathBuf>,

        /// Output format for the message stream.
        #[arg(long, value_enum, default_value_t = OutputFormat::Jsonl)]
        format: OutputFormat,

        /// Quiet period after the last message before the command exits.
        /// Module fetches and retried runs extend the window.
        #[arg(long, default_value_t = 2000, value_name = "MS")]
        settle_ms: u64,

        /// Base URL modules are fetched from.
        #[arg(long, value_name = "URL")]
        cdn: Option<String>,
    },
}
