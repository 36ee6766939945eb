use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::*;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    /// Number of threads to use. If this options isn't set or a value
    /// of "0" is chosen, the maximum number of available threads
    /// is used.
    #[clap(
        short = 'j',
        long,
        env = "CORPUS_NUM_JOBS",
        hide_env_values = true
    )]
    pub(crate) num_jobs: Option<usize>,

    /// The config file to use. By default `corpus.toml` is read from
    /// the working directory, if present.
    #[arg(short, long, value_name = "filename")]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    #[clap(alias = "cv")]
    Cvalue(Cvalue),
    Languages(Languages),
    Parse(Parse),
}

impl Command {
    /// Returns the `(verbose, quiet)` flags of the command.
    pub(crate) fn verbosity(&self) -> (bool, bool) {
        match self {
            Self::Cvalue(cmd) => (cmd.verbose, cmd.quiet),
            Self::Languages(_) => (false, false),
            Self::Parse(cmd) => (cmd.verbose, cmd.quiet),
        }
    }
}
