use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bracket::{DataBuilder, System};
use crate::elimination::{self, Layout, Links, NextMatches, Position, Slot};
use crate::standings::{self, Standings, Stats};
use crate::utils::NumExt;
use crate::{
    BracketData, BracketKind, EntrantSpot, Entrants, Error, IdGen, Opponent, Result, TeamId,
};

const WINNERS: u32 = 1;
const LOSERS: u32 = 2;
const FINAL: u32 = 3;

/// A double elimination bracket.
///
/// The winners bracket feeds its losers into the losers bracket. The winners of both meet in the
/// grand final. If the team coming from the losers bracket wins the grand final a reset match
/// decides the bracket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DoubleElimination;

impl DoubleElimination {
    /// Returns the number of matches in round `round` of the losers bracket.
    fn losers_matches(size: usize, round: u32) -> usize {
        size >> ((round + 1) / 2 + 1)
    }

    /// Returns the final placement of teams losing in each round of the losers bracket.
    fn losers_placements(size: usize, rounds: u32) -> HashMap<u32, u32> {
        let mut placements = HashMap::new();
        let mut next = 3;

        for round in (1..=rounds).rev() {
            placements.insert(round, next);
            next += Self::losers_matches(size, round) as u32;
        }

        placements
    }
}

impl Links for DoubleElimination {
    fn next_matches(
        &self,
        layout: &Layout,
        position: Position,
        winner: Option<usize>,
    ) -> NextMatches {
        let Position {
            group,
            round,
            number,
        } = position;

        match group {
            WINNERS => {
                let rounds = layout.round_count(WINNERS);

                let winner = if round < rounds {
                    Slot::halved(WINNERS, round + 1, number)
                } else {
                    Slot::new(FINAL, 1, 1, 0)
                };

                let loser = if round == 1 {
                    Slot::halved(LOSERS, 1, number)
                } else {
                    Slot::new(LOSERS, 2 * (round - 1), number, 1)
                };

                NextMatches::new(Some(winner), Some(loser))
            }
            LOSERS => {
                let rounds = layout.round_count(LOSERS);

                let winner = if round == rounds {
                    Slot::new(FINAL, 1, 1, 1)
                } else if round % 2 == 1 {
                    Slot::new(LOSERS, round + 1, number, 0)
                } else {
                    Slot::halved(LOSERS, round + 1, number)
                };

                NextMatches::new(Some(winner), None)
            }
            // The grand final is replayed if the team from the losers bracket wins it.
            FINAL if round == 1 && winner == Some(1) => NextMatches::new(
                Some(Slot::new(FINAL, 2, 1, 1)),
                Some(Slot::new(FINAL, 2, 1, 0)),
            ),
            _ => NextMatches::default(),
        }
    }
}

impl System for DoubleElimination {
    fn kind(&self) -> BracketKind {
        BracketKind::DoubleElimination
    }

    fn create(&self, name: &str, entrants: &Entrants, ids: &mut IdGen) -> Result<BracketData> {
        if entrants.len() < 2 {
            return Err(Error::NotEnoughTeams {
                found: entrants.len(),
            });
        }

        log::debug!(
            "Creating a new DoubleElimination bracket with {} entrants",
            entrants.len()
        );

        // The losers bracket needs at least two rounds.
        let size = entrants.len().next_power_of_two().max(4);
        let rounds = size.ilog2_ceil() as u32;
        let order = elimination::seed_order(size);

        let mut builder = DataBuilder::new(name, ids);

        let group = builder.group(WINNERS);
        for round in 1..=rounds {
            let round_id = builder.round(group, round);

            for number in 1..=(size >> round) as u32 {
                let opponents = if round == 1 {
                    let index = (number as usize - 1) * 2;
                    [
                        seeded_spot(entrants, order[index]),
                        seeded_spot(entrants, order[index + 1]),
                    ]
                } else {
                    [EntrantSpot::TBD, EntrantSpot::TBD]
                };

                builder.r#match(group, round_id, number, opponents);
            }
        }

        let group = builder.group(LOSERS);
        for round in 1..=2 * (rounds - 1) {
            let round_id = builder.round(group, round);

            for number in 1..=Self::losers_matches(size, round) as u32 {
                builder.r#match(group, round_id, number, [EntrantSpot::TBD, EntrantSpot::TBD]);
            }
        }

        let group = builder.group(FINAL);
        for round in 1..=2 {
            let round_id = builder.round(group, round);
            builder.r#match(group, round_id, 1, [EntrantSpot::TBD, EntrantSpot::TBD]);
        }

        let mut data = builder.build();
        elimination::settle_byes(self, &mut data);
        Ok(data)
    }

    fn standings(
        &self,
        data: &BracketData,
        entrants: &Entrants,
        include_unfinished: bool,
    ) -> Standings {
        let layout = Layout::new(data);
        let size = 1 << layout.round_count(WINNERS);
        let losers = Self::losers_placements(size, layout.round_count(LOSERS));
        let records = standings::records(&data.matches);

        let mut placements: HashMap<TeamId, u32> = HashMap::new();

        for (index, m) in data.matches.iter().enumerate() {
            let position = layout.position(index);

            let (winner, loser) = match m.winner() {
                Some(winner) => match (m.team(winner), m.team(1 - winner)) {
                    (Some(w), Some(l)) => (w, l),
                    _ => continue,
                },
                None => continue,
            };

            match position.group {
                LOSERS => {
                    if let Some(placement) = losers.get(&position.round) {
                        placements.insert(loser, *placement);
                    }
                }
                // A grand final won by the team from the losers bracket is decided by the reset.
                FINAL if position.round == 1 && m.winner() == Some(1) => (),
                FINAL => {
                    placements.insert(winner, 1);
                    placements.insert(loser, 2);
                }
                _ => (),
            }
        }

        let mut builder = Standings::builder();
        for team in entrants.iter() {
            let record = match records.get(&team.id) {
                Some(record) => record,
                None => continue,
            };

            let placement = match placements.get(&team.id) {
                Some(placement) => *placement,
                None if include_unfinished => 1,
                None => continue,
            };

            builder.entry(team.id, |e| {
                e.placement(placement)
                    .dropped_out(team.dropped_out)
                    .stats(Stats::from_record(record));
            });
        }

        builder.build()
    }

    fn propagate(&self, data: &mut BracketData, index: usize) {
        elimination::propagate(self, data, index);
    }

    fn retract(&self, data: &mut BracketData, index: usize) -> Result<()> {
        elimination::retract(self, data, index)
    }
}

fn seeded_spot(entrants: &Entrants, seed: usize) -> EntrantSpot<Opponent> {
    EntrantSpot::new(entrants.iter().nth(seed).map(|team| Opponent::new(team.id)))
}
