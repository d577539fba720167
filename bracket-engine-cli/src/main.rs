mod config;
mod error;
mod logger;
mod progression;
mod tournament;
mod utils;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Path to a TOML config file. Defaults are used if missing.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Progression {
        #[clap(subcommand)]
        command: progression::Command,
    },
    Tournament {
        #[clap(subcommand)]
        command: tournament::Command,
    },
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config from {}: {}", path.display(), err);
                process::exit(1);
            }
        },
        None => Config::default(),
    }
    .with_environment();

    let config = match config.validate() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid config: {}", err);
            process::exit(1);
        }
    };

    logger::init(config.loglevel);
    log::debug!("Using config: {:?}", config);

    let res = match args.command {
        Command::Progression { command } => command.run(&config),
        Command::Tournament { command } => command.run(&config),
    };

    if let Err(err) = res {
        eprintln!("{}", err);
        process::exit(1);
    }
}
