use std::io::ErrorKind;
use std::process;

use clap::Parser;
use cli::{Args, Command};
use config::Config;
use error::{CorpusError, CorpusResult};
use hyperdata::HyperdataError;
use log::LevelFilter;
use rayon::ThreadPoolBuilder;

pub(crate) mod prelude {
    pub(crate) use crate::config::Config;
    pub(crate) use crate::error::{bail, CorpusError, CorpusResult};
    pub(crate) use crate::progress::ProgressBarBuilder;
}

mod cli;
mod commands;
mod config;
mod error;
mod progress;

fn num_threads(args: &Args, config: &Config) -> usize {
    if let Some(num_threads) = args.num_jobs {
        return num_threads;
    }

    config.num_jobs().unwrap_or(0)
}

fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("CORPUS_LOG")
        .format_timestamp(None)
        .init();
}

fn run(args: Args, config: Config) -> CorpusResult<()> {
    match args.cmd {
        Command::Cvalue(cmd) => cmd.execute(),
        Command::Languages(cmd) => cmd.execute(&config),
        Command::Parse(cmd) => cmd.execute(&config),
    }
}

fn main() {
    let args = Args::parse();

    let (verbose, quiet) = args.cmd.verbosity();
    init_logger(verbose, quiet);

    let result = Config::discover(args.config.as_deref()).and_then(|config| {
        ThreadPoolBuilder::new()
            .num_threads(num_threads(&args, &config))
            .build_global()
            .map_err(CorpusError::other)?;

        run(args, config)
    });

    match result {
        Ok(()) => process::exit(0),
        Err(CorpusError::IO(e)) if e.kind() == ErrorKind::BrokenPipe => {
            process::exit(0)
        }
        Err(CorpusError::Hyperdata(HyperdataError::Input(e)))
            if e.kind() == ErrorKind::BrokenPipe =>
        {
            process::exit(0)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}
