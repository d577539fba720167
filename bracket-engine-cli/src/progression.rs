use std::path::PathBuf;

use bracket_engine_core::progression::{self, BracketConfig};
use clap::Subcommand;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::{print_json, read_json};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validates a JSON array of bracket definitions.
    Validate {
        path: PathBuf,
        /// Allow brackets without a source after the first one.
        #[clap(long)]
        invitational: bool,
        /// Print errors as JSON.
        #[clap(long)]
        json: bool,
    },
}

impl Command {
    pub fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Validate {
                path,
                invitational,
                json,
            } => {
                let brackets: Vec<BracketConfig> = read_json(path)?;

                let progression =
                    match progression::validate_all(&brackets, &config.engine, *invitational) {
                        Ok(progression) => progression,
                        Err(errors) => {
                            if *json {
                                print_json(&errors)?;
                            } else {
                                for err in &errors {
                                    println!("{}", err);
                                }
                            }

                            return Err(Error::Invalid(errors.len()));
                        }
                    };

                println!("Idx | Name | Type | Source");
                for (idx, bracket) in progression.iter() {
                    let source = match &bracket.source {
                        Some(source) => format!("#{} {}", source.bracket_idx, source.placements),
                        None => String::from("-"),
                    };

                    println!(
                        "{} | {} | {} | {}",
                        idx, bracket.config.name, bracket.config.kind, source
                    );
                }
            }
        }

        Ok(())
    }
}
