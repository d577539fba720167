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

const MAIN: u32 = 1;
const THIRD_PLACE: u32 = 2;

/// A single elimination bracket.
///
/// Byes are given to the best seeds when the number of teams is not a power of two. The
/// optional third place match is played by the losers of the semifinals.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SingleElimination {
    pub third_place_match: bool,
}

impl SingleElimination {
    /// Returns the final placement of a team losing in `round` of a bracket with `rounds`
    /// rounds.
    fn placement(rounds: u32, round: u32) -> u32 {
        (1 << (rounds - round)) + 1
    }
}

impl Links for SingleElimination {
    fn next_matches(&self, layout: &Layout, position: Position, _: Option<usize>) -> NextMatches {
        let rounds = layout.round_count(MAIN);
        if position.group != MAIN || position.round >= rounds {
            return NextMatches::default();
        }

        let winner = Slot::halved(MAIN, position.round + 1, position.number);
        let loser = if self.third_place_match && position.round + 1 == rounds {
            Some(Slot::halved(THIRD_PLACE, 1, position.number))
        } else {
            None
        };

        NextMatches::new(Some(winner), loser)
    }
}

impl System for SingleElimination {
    fn kind(&self) -> BracketKind {
        BracketKind::SingleElimination
    }

    fn create(&self, name: &str, entrants: &Entrants, ids: &mut IdGen) -> Result<BracketData> {
        if entrants.len() < 2 {
            return Err(Error::NotEnoughTeams {
                found: entrants.len(),
            });
        }

        log::debug!(
            "Creating new SingleElimination bracket with {} entrants",
            entrants.len()
        );

        let size = entrants.len().next_power_of_two();
        let rounds = size.ilog2_ceil() as u32;
        let order = elimination::seed_order(size);

        let mut builder = DataBuilder::new(name, ids);
        let group = builder.group(MAIN);

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

        // At least 2 rounds are required for a third place match.
        if self.third_place_match && rounds >= 2 {
            let group = builder.group(THIRD_PLACE);
            let round = builder.round(group, 1);
            builder.r#match(group, round, 1, [EntrantSpot::TBD, EntrantSpot::TBD]);
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
        let rounds = layout.round_count(MAIN);
        let records = standings::records(&data.matches);

        // Final placements, `None` while a team can still play for a better one.
        let mut placements: HashMap<TeamId, Option<u32>> = HashMap::new();

        for (index, m) in data.matches.iter().enumerate() {
            let position = layout.position(index);

            let winner = match m.winner() {
                Some(winner) => winner,
                None => {
                    // A third place match without a second opponent.
                    if position.group == THIRD_PLACE
                        && m.is_bye()
                        && !m.opponents.iter().any(EntrantSpot::is_tbd)
                    {
                        if let Some(team) = m.team(0).or_else(|| m.team(1)) {
                            placements.insert(team, Some(3));
                        }
                    }

                    continue;
                }
            };

            let (winner, loser) = match (m.team(winner), m.team(1 - winner)) {
                (Some(winner), Some(loser)) => (winner, loser),
                _ => continue,
            };

            if position.group == THIRD_PLACE {
                placements.insert(winner, Some(3));
                placements.insert(loser, Some(4));
            } else if position.round == rounds {
                placements.insert(winner, Some(1));
                placements.insert(loser, Some(2));
            } else if self.third_place_match && position.round + 1 == rounds {
                placements.entry(loser).or_insert(None);
            } else {
                placements.insert(loser, Some(Self::placement(rounds, position.round)));
            }
        }

        let mut builder = Standings::builder();
        for team in entrants.iter() {
            let record = match records.get(&team.id) {
                Some(record) => record,
                None => continue,
            };

            let placement = match placements.get(&team.id) {
                Some(Some(placement)) => *placement,
                // Waiting for the third place match.
                Some(None) if include_unfinished => 3,
                None if include_unfinished => 1,
                _ => continue,
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

/// Returns the spot of the team with 0-based `seed`, or a bye if there are fewer teams.
fn seeded_spot(entrants: &Entrants, seed: usize) -> EntrantSpot<Opponent> {
    EntrantSpot::new(entrants.iter().nth(seed).map(|team| Opponent::new(team.id)))
}

#[cfg(test)]
mod tests {
    use super::SingleElimination;
    use crate::tests::{create, win};
    use crate::{EntrantSpot, Error, IdGen, System, TeamId};

    fn teams(data: &crate::BracketData, index: usize) -> [Option<TeamId>; 2] {
        [data.matches[index].team(0), data.matches[index].team(1)]
    }

    fn placements(standings: &crate::standings::Standings) -> Vec<(u32, u32)> {
        standings
            .iter()
            .map(|s| (s.team.0, s.placement))
            .collect()
    }

    #[test]
    fn test_single_elimination() {
        let format = SingleElimination::default();

        let (data, _) = create(&format, 4);
        assert_eq!(data.matches.len(), 3);
        assert_eq!(data.rounds.len(), 2);
        assert_eq!(teams(&data, 0), [Some(TeamId(1)), Some(TeamId(4))]);
        assert_eq!(teams(&data, 1), [Some(TeamId(2)), Some(TeamId(3))]);
        assert!(data.matches[2].opponents.iter().all(EntrantSpot::is_tbd));

        let (data, _) = create(&format, 2);
        assert_eq!(data.matches.len(), 1);
    }

    #[test]
    fn test_single_elimination_not_enough_teams() {
        let format = SingleElimination::default();
        let entrants = crate::teams![1];

        assert_eq!(
            format.create("Main", &entrants, &mut IdGen::virtual_ids()),
            Err(Error::NotEnoughTeams { found: 1 })
        );
    }

    #[test]
    fn test_single_elimination_byes() {
        let format = SingleElimination::default();
        let (data, _) = create(&format, 5);

        assert_eq!(data.matches.len(), 7);
        assert_eq!(teams(&data, 0), [Some(TeamId(1)), None]);
        assert!(data.matches[0].opponents[1].is_empty());
        assert_eq!(teams(&data, 1), [Some(TeamId(4)), Some(TeamId(5))]);

        // Byes are advanced right away.
        assert_eq!(teams(&data, 4), [Some(TeamId(1)), None]);
        assert!(data.matches[4].opponents[1].is_tbd());
        assert_eq!(teams(&data, 5), [Some(TeamId(2)), Some(TeamId(3))]);
    }

    #[test]
    fn test_single_elimination_third_place_match() {
        let format = SingleElimination {
            third_place_match: true,
        };
        let (mut data, _) = create(&format, 4);
        assert_eq!(data.matches.len(), 4);
        assert_eq!(data.groups.len(), 2);

        win(&format, &mut data, 0, 0);
        win(&format, &mut data, 1, 1);
        assert_eq!(teams(&data, 2), [Some(TeamId(1)), Some(TeamId(3))]);
        assert_eq!(teams(&data, 3), [Some(TeamId(4)), Some(TeamId(2))]);

        // No third place match with only 2 teams.
        let (data, _) = create(&format, 2);
        assert_eq!(data.matches.len(), 1);
    }

    #[test]
    fn test_single_elimination_third_place_bye() {
        let format = SingleElimination {
            third_place_match: true,
        };
        let (mut data, entrants) = create(&format, 3);

        win(&format, &mut data, 1, 0);
        assert_eq!(teams(&data, 3), [None, Some(TeamId(3))]);
        assert!(data.matches[3].is_bye());

        win(&format, &mut data, 2, 1);
        assert!(format.is_complete(&data));

        let standings = format.standings(&data, &entrants, false);
        assert_eq!(placements(&standings), vec![(2, 1), (1, 2), (3, 3)]);
    }

    #[test]
    fn test_single_elimination_standings() {
        let format = SingleElimination::default();
        let (mut data, entrants) = create(&format, 8);

        for index in 0..4 {
            win(&format, &mut data, index, 0);
        }

        let standings = format.standings(&data, &entrants, false);
        assert_eq!(
            placements(&standings),
            vec![(5, 5), (6, 5), (7, 5), (8, 5)]
        );

        let standings = format.standings(&data, &entrants, true);
        assert_eq!(standings.len(), 8);
        assert_eq!(standings.placement(TeamId(1)), Some(1));
        assert_eq!(standings.placement(TeamId(8)), Some(5));

        win(&format, &mut data, 4, 0);
        win(&format, &mut data, 5, 1);
        win(&format, &mut data, 6, 0);

        let standings = format.standings(&data, &entrants, false);
        assert_eq!(standings.placement(TeamId(1)), Some(1));
        assert_eq!(standings.placement(TeamId(3)), Some(2));
        assert_eq!(standings.placement(TeamId(4)), Some(3));
        assert_eq!(standings.placement(TeamId(2)), Some(3));
        assert_eq!(standings.len(), 8);

        let stats = &standings.get(TeamId(1)).unwrap().stats;
        assert_eq!(stats.set_wins, 3);
        assert_eq!(stats.map_wins, 6);
        assert_eq!(stats.map_losses, 0);
    }

    #[test]
    fn test_single_elimination_standings_third_place() {
        let format = SingleElimination {
            third_place_match: true,
        };
        let (mut data, entrants) = create(&format, 4);

        win(&format, &mut data, 0, 0);
        win(&format, &mut data, 1, 0);

        let standings = format.standings(&data, &entrants, false);
        assert!(standings.is_empty());

        let standings = format.standings(&data, &entrants, true);
        assert_eq!(
            placements(&standings),
            vec![(1, 1), (2, 1), (3, 3), (4, 3)]
        );

        win(&format, &mut data, 2, 1);
        win(&format, &mut data, 3, 1);

        let standings = format.standings(&data, &entrants, false);
        assert_eq!(
            placements(&standings),
            vec![(2, 1), (1, 2), (3, 3), (4, 4)]
        );
    }
}
