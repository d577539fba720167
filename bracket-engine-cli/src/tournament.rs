use std::path::{Path, PathBuf};

use bracket_engine_core::destination::Destination;
use bracket_engine_core::progression::BracketConfig;
use bracket_engine_core::tournament::Snapshot;
use bracket_engine_core::{group_number_to_letters, Action, Team, TeamId, Tournament};
use clap::Subcommand;

use crate::config::Config;
use crate::error::Result;
use crate::utils::{print_json, read_json, write_json};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Creates a new tournament snapshot.
    New {
        /// JSON array of bracket definitions.
        #[clap(long)]
        progression: PathBuf,
        /// JSON array of teams.
        #[clap(long)]
        teams: PathBuf,
        #[clap(long)]
        invitational: bool,
        /// Where to write the snapshot.
        #[clap(short, long)]
        out: PathBuf,
    },
    /// Lists the brackets of a tournament and their state.
    Status { snapshot: PathBuf },
    /// Prints the standings of a bracket.
    Standings {
        snapshot: PathBuf,
        bracket: usize,
        /// Include teams without a decided match.
        #[clap(long)]
        unfinished: bool,
        #[clap(long)]
        json: bool,
    },
    /// Prints the data of a bracket as JSON.
    Bracket { snapshot: PathBuf, bracket: usize },
    /// Prints where a team goes after a bracket.
    Destination {
        snapshot: PathBuf,
        team: u32,
        bracket: usize,
    },
    /// Applies a JSON encoded action and writes the snapshot back.
    Apply {
        snapshot: PathBuf,
        action: String,
        /// Do not write the snapshot back.
        #[clap(long)]
        dry_run: bool,
    },
}

impl Command {
    pub fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::New {
                progression,
                teams,
                invitational,
                out,
            } => {
                let progression: Vec<BracketConfig> = read_json(progression)?;
                let teams: Vec<Team> = read_json(teams)?;

                let tournament =
                    Tournament::new(config.engine.clone(), *invitational, progression, teams)?;
                write_json(out, &tournament.snapshot())?;

                log::info!(
                    "Created tournament with {} brackets and {} teams",
                    tournament.brackets().len(),
                    tournament.teams().len()
                );
            }
            Self::Status { snapshot } => {
                let tournament = load(config, snapshot)?;

                println!("Idx | Name | Type | State | Teams");
                for bracket in tournament.brackets() {
                    let state = if bracket.is_preview() {
                        "preview"
                    } else if bracket.is_complete() {
                        "complete"
                    } else {
                        "in progress"
                    };

                    println!(
                        "{} | {} | {} | {} | {}",
                        bracket.idx(),
                        bracket.name(),
                        bracket.kind(),
                        state,
                        bracket.entrants().len()
                    );
                }

                println!("Overrides: {}", tournament.overrides().len());
                if tournament.all_brackets_over() {
                    println!("All brackets are over");
                }
            }
            Self::Standings {
                snapshot,
                bracket,
                unfinished,
                json,
            } => {
                let tournament = load(config, snapshot)?;
                let standings = tournament.standings(*bracket, *unfinished)?;

                if *json {
                    return print_json(&standings);
                }

                let bracket = tournament.bracket(*bracket)?;

                println!("Place | Group | Team | Sets | Maps");
                for standing in &standings {
                    let group = standing
                        .group_id
                        .and_then(|id| bracket.data().group(id))
                        .map(|group| group_number_to_letters(group.number))
                        .unwrap_or_else(|| String::from("-"));

                    let name = bracket
                        .team_by_id(standing.team)
                        .map(|team| team.name.as_str())
                        .unwrap_or("?");

                    println!(
                        "{} | {} | {}{} | {}-{} | {}-{}",
                        standing.placement,
                        group,
                        name,
                        if standing.dropped_out { " (dropped out)" } else { "" },
                        standing.stats.set_wins,
                        standing.stats.set_losses,
                        standing.stats.map_wins,
                        standing.stats.map_losses,
                    );
                }
            }
            Self::Bracket { snapshot, bracket } => {
                let tournament = load(config, snapshot)?;
                print_json(&tournament.bracket_view(*bracket)?)?;
            }
            Self::Destination {
                snapshot,
                team,
                bracket,
            } => {
                let tournament = load(config, snapshot)?;

                match tournament.destination(TeamId(*team), *bracket)? {
                    Some(Destination::Bracket(idx)) => {
                        let name = tournament.bracket(idx)?.name();
                        println!("Bracket #{} ({})", idx, name);
                    }
                    Some(Destination::Eliminated) => println!("Eliminated"),
                    None => println!("Not decided yet"),
                }
            }
            Self::Apply {
                snapshot,
                action,
                dry_run,
            } => {
                let mut tournament = load(config, snapshot)?;
                let action: Action = serde_json::from_str(action)?;

                tournament.apply(action)?;

                if *dry_run {
                    log::info!("Dry run, not writing {}", snapshot.display());
                } else {
                    write_json(snapshot, &tournament.snapshot())?;
                }
            }
        }

        Ok(())
    }
}

fn load(config: &Config, path: &Path) -> Result<Tournament> {
    let snapshot: Snapshot = read_json(path)?;
    Ok(Tournament::resume(config.engine.clone(), snapshot)?)
}
