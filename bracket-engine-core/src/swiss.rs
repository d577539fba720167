use std::collections::{HashMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bracket::{BracketMeta, DataBuilder, System};
use crate::round_robin::{split_groups, team_groups};
use crate::scoring;
use crate::standings::{self, Standings, Stats};
use crate::{
    BracketData, BracketKind, EntrantSpot, Entrants, Error, GroupId, IdGen, Key, Match,
    Opponent, Result, Round, RoundId, TeamId,
};

/// A swiss bracket.
///
/// Teams are split into `group_count` groups. Every group plays `round_count` rounds, each round
/// is paired from the standings once the previous round is over. Only the first round is paired
/// when the bracket is created.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Swiss {
    pub group_count: u32,
    pub round_count: u32,
}

impl Swiss {
    /// Pairs the next round of `group`.
    ///
    /// The next round is the first round without matches. Every match of all previous rounds
    /// must be over.
    pub fn advance(
        &self,
        data: &mut BracketData,
        entrants: &Entrants,
        group: Key<GroupId>,
        ids: &mut IdGen,
    ) -> Result<()> {
        let rounds = data.rounds_in_group(group);
        if rounds.is_empty() {
            return Err(Error::GroupNotFound(group));
        }

        let mut target = None;
        for round in rounds {
            let mut matches = data.matches_in_round(round.id).peekable();
            if matches.peek().is_none() {
                target = Some(round.clone());
                break;
            }

            if matches.any(|m| !m.is_bye() && !m.is_over()) {
                return Err(Error::RoundInProgress);
            }
        }

        let round = target.ok_or(Error::NoRoundsLeft)?;

        let ranked: Vec<TeamId> = self
            .rank_group(data, entrants, group, true)
            .into_iter()
            .map(|row| row.team)
            .collect();

        let mut teams: Vec<TeamId> = team_groups(data)
            .into_iter()
            .filter(|(_, g)| *g == group)
            .map(|(team, _)| team)
            .filter(|team| !ranked.contains(team))
            .collect();
        teams.sort_by(|a, b| entrants.seed_cmp(*a, *b));

        let eligible: Vec<TeamId> = ranked
            .into_iter()
            .chain(teams)
            .filter(|team| !entrants.is_dropped_out(*team))
            .collect();

        if eligible.is_empty() {
            return Err(Error::NotEnoughTeams { found: 0 });
        }

        let history = History::new(data.matches.iter().filter(|m| m.group_id == group));
        let (pairs, bye) = pair(&eligible, &history);

        log::info!(
            "Pairing round {} of swiss group {} with {} teams",
            round.number,
            group,
            eligible.len()
        );

        push_round(data, ids, &round, &pairs, bye);
        Ok(())
    }

    /// Removes all matches of `round` and every later round of `group`. The first round cannot
    /// be removed.
    pub fn unadvance(
        &self,
        data: &mut BracketData,
        group: Key<GroupId>,
        round: Key<RoundId>,
    ) -> Result<()> {
        let number = match data.round(round) {
            Some(r) if r.group_id == group => r.number,
            _ => return Err(Error::RoundNotFound(round)),
        };

        if number == 1 {
            return Err(Error::FirstRound);
        }

        let removed: HashSet<Key<RoundId>> = data
            .rounds_in_group(group)
            .into_iter()
            .filter(|r| r.number >= number)
            .map(|r| r.id)
            .collect();

        log::info!(
            "Removing rounds {}.. of swiss group {}",
            number,
            group
        );

        data.matches.retain(|m| !removed.contains(&m.round_id));
        Ok(())
    }

    /// Ranks the teams of a single group.
    fn rank_group(
        &self,
        data: &BracketData,
        entrants: &Entrants,
        group: Key<GroupId>,
        include_unfinished: bool,
    ) -> Vec<Row> {
        let matches: Vec<&Match> = data
            .matches
            .iter()
            .filter(|m| m.group_id == group)
            .collect();

        let mut records = standings::records(matches.iter().copied());

        let mut byes: HashMap<TeamId, u32> = HashMap::new();
        for m in &matches {
            if !m.is_bye() {
                continue;
            }

            if let Some(team) = m.team(0).or_else(|| m.team(1)) {
                *byes.entry(team).or_default() += 1;

                let record = records.entry(team).or_default();
                record.set_wins += 1;
                record.map_wins += scoring::bye_map_wins(data.maps_of(m));
            }
        }

        let win_rates = |team: &TeamId| match records.get(team) {
            Some(record) => (
                ratio(record.set_wins, record.set_losses),
                ratio(record.map_wins, record.map_losses),
            ),
            None => (0.0, 0.0),
        };

        let mut rows = Vec::with_capacity(records.len());
        for (team, record) in &records {
            let finished = record.played + byes.get(team).copied().unwrap_or_default();
            if finished == 0 && !include_unfinished {
                continue;
            }

            let losses_against_tied = record
                .lost_to
                .iter()
                .filter(|opponent| {
                    !entrants.is_dropped_out(**opponent)
                        && records
                            .get(opponent)
                            .map_or(false, |other| other.set_wins == record.set_wins)
                })
                .count() as u32;

            let opponents: Vec<(f64, f64)> = record.opponents().map(|o| win_rates(&o)).collect();
            let (set_rate, map_rate) = if opponents.is_empty() {
                (0.0, 0.0)
            } else {
                let len = opponents.len() as f64;
                let (sets, maps) = opponents
                    .iter()
                    .fold((0.0, 0.0), |(s, m), (set, map)| (s + set, m + map));
                (sets / len, maps / len)
            };

            let mut stats = Stats::from_record(record);
            stats.losses_against_tied = Some(losses_against_tied);
            stats.opponent_set_win_percentage = Some(set_rate);
            stats.opponent_map_win_percentage = Some(map_rate);

            rows.push(Row {
                team: *team,
                placement: 0,
                stats,
            });
        }

        let placements = standings::rank(&mut rows, |lhs, rhs| {
            let (a, b) = (&lhs.stats, &rhs.stats);

            b.set_wins
                .cmp(&a.set_wins)
                .then_with(|| a.losses_against_tied.cmp(&b.losses_against_tied))
                .then_with(|| {
                    let (a, b) = (
                        a.opponent_set_win_percentage.unwrap_or_default(),
                        b.opponent_set_win_percentage.unwrap_or_default(),
                    );
                    b.total_cmp(&a)
                })
                .then_with(|| {
                    let (a, b) = (
                        a.opponent_map_win_percentage.unwrap_or_default(),
                        b.opponent_map_win_percentage.unwrap_or_default(),
                    );
                    b.total_cmp(&a)
                })
                .then_with(|| entrants.seed_cmp(lhs.team, rhs.team))
        });

        for (row, placement) in rows.iter_mut().zip(placements) {
            row.placement = placement;
        }

        rows
    }
}

#[derive(Clone, Debug)]
struct Row {
    team: TeamId,
    placement: u32,
    stats: Stats,
}

fn ratio(wins: u32, losses: u32) -> f64 {
    match wins + losses {
        0 => 0.0,
        total => wins as f64 / total as f64,
    }
}

/// Previous pairings of a group.
#[derive(Clone, Debug, Default)]
struct History {
    played: HashSet<(TeamId, TeamId)>,
    byes: HashMap<TeamId, u32>,
}

impl History {
    fn new<'a, I>(matches: I) -> Self
    where
        I: IntoIterator<Item = &'a Match>,
    {
        let mut history = Self::default();

        for m in matches {
            match (m.team(0), m.team(1)) {
                (Some(a), Some(b)) => {
                    history.played.insert((a, b));
                    history.played.insert((b, a));
                }
                (Some(team), None) | (None, Some(team)) if m.is_bye() => {
                    *history.byes.entry(team).or_default() += 1;
                }
                _ => (),
            }
        }

        history
    }

    fn has_played(&self, a: TeamId, b: TeamId) -> bool {
        self.played.contains(&(a, b))
    }

    fn byes(&self, team: TeamId) -> u32 {
        self.byes.get(&team).copied().unwrap_or_default()
    }
}

/// Pairs `ranked` teams by closest standing, avoiding rematches where possible. With an odd
/// number of teams the team with the fewest byes gets a bye, ties go to the lowest ranked team.
fn pair(ranked: &[TeamId], history: &History) -> (Vec<(TeamId, TeamId)>, Option<TeamId>) {
    let mut teams = ranked.to_vec();

    let bye = if teams.len() % 2 == 1 {
        let index = teams
            .iter()
            .enumerate()
            .rev()
            .min_by_key(|(_, team)| history.byes(**team))
            .map(|(index, _)| index)
            .unwrap_or_default();

        Some(teams.remove(index))
    } else {
        None
    };

    let mut pairs = Vec::with_capacity(teams.len() / 2);
    while !teams.is_empty() {
        let a = teams.remove(0);

        let index = teams
            .iter()
            .position(|b| !history.has_played(a, *b))
            .unwrap_or_default();
        let b = teams.remove(index);

        pairs.push((a, b));
    }

    (pairs, bye)
}

fn push_round(
    data: &mut BracketData,
    ids: &mut IdGen,
    round: &Round,
    pairs: &[(TeamId, TeamId)],
    bye: Option<TeamId>,
) {
    let games = pairs
        .iter()
        .map(|(a, b)| {
            [
                EntrantSpot::Entrant(Opponent::new(*a)),
                EntrantSpot::Entrant(Opponent::new(*b)),
            ]
        })
        .chain(bye.map(|team| [EntrantSpot::Entrant(Opponent::new(team)), EntrantSpot::Empty]));

    for (number, opponents) in games.enumerate() {
        data.matches.push(Match {
            id: ids.r#match(),
            stage_id: round.stage_id,
            group_id: round.group_id,
            round_id: round.id,
            number: number as u32 + 1,
            opponents,
        });
    }
}

impl System for Swiss {
    fn kind(&self) -> BracketKind {
        BracketKind::Swiss
    }

    fn create(&self, name: &str, entrants: &Entrants, ids: &mut IdGen) -> Result<BracketData> {
        if entrants.len() < 2 {
            return Err(Error::NotEnoughTeams {
                found: entrants.len(),
            });
        }

        let group_count = (self.group_count as usize).clamp(1, (entrants.len() / 2).max(1));

        log::debug!(
            "Creating new Swiss bracket with {} entrants in {} groups",
            entrants.len(),
            group_count
        );

        let groups = split_groups(entrants, group_count);

        let mut builder = DataBuilder::new(name, ids);
        let mut first_rounds = Vec::with_capacity(groups.len());
        for index in 0..groups.len() {
            let group_id = builder.group(index as u32 + 1);

            for number in 1..=self.round_count {
                let round_id = builder.round(group_id, number);
                if number == 1 {
                    first_rounds.push(round_id);
                }
            }
        }
        let mut data = builder.build();

        for (mut teams, round_id) in groups.into_iter().zip(first_rounds) {
            teams.retain(|team| !team.dropped_out);
            teams.sort_by(|a, b| a.seed_cmp(b));

            let ranked: Vec<TeamId> = teams.iter().map(|team| team.id).collect();
            let (pairs, bye) = pair(&ranked, &History::default());

            if let Some(round) = data.round(round_id).cloned() {
                push_round(&mut data, ids, &round, &pairs, bye);
            }
        }

        Ok(data)
    }

    fn standings(
        &self,
        data: &BracketData,
        entrants: &Entrants,
        include_unfinished: bool,
    ) -> Standings {
        let mut builder = Standings::builder();

        for group in &data.groups {
            for row in self.rank_group(data, entrants, group.id, include_unfinished) {
                builder.entry(row.team, |e| {
                    e.group(group.id)
                        .placement(row.placement)
                        .dropped_out(entrants.is_dropped_out(row.team))
                        .stats(row.stats);
                });
            }
        }

        builder.build()
    }

    /// A swiss bracket is complete once every round of every group was paired and played.
    fn is_complete(&self, data: &BracketData) -> bool {
        !data.rounds.is_empty()
            && data
                .rounds
                .iter()
                .all(|round| data.matches_in_round(round.id).next().is_some())
            && data.matches.iter().all(|m| m.is_bye() || m.is_over())
    }

    fn retract(&self, data: &mut BracketData, index: usize) -> Result<()> {
        let m = &data.matches[index];
        let number = data.round(m.round_id).map_or(0, |round| round.number);

        let later = data.matches.iter().find(|other| {
            other.group_id == m.group_id
                && data
                    .round(other.round_id)
                    .map_or(false, |round| round.number > number)
        });

        match later {
            Some(later) => Err(Error::ResultPropagated(later.id)),
            None => Ok(()),
        }
    }

    /// The group count is the one of `data` once the groups were created, since too few
    /// entrants reduce the configured count.
    fn meta(&self, data: &BracketData) -> BracketMeta {
        let group_count = match data.groups.len() {
            0 => self.group_count,
            len => len as u32,
        };

        BracketMeta {
            group_count: Some(group_count),
            round_count: Some(self.round_count),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Swiss;
    use crate::tests::{create, win};
    use crate::{BracketData, Error, IdGen, Key, System, TeamId};

    fn pairings(data: &BracketData, round: usize) -> Vec<[Option<TeamId>; 2]> {
        let round = data.rounds[round].id;
        data.matches_in_round(round)
            .map(|m| [m.team(0), m.team(1)])
            .collect()
    }

    fn index_of(data: &BracketData, a: u32, b: u32) -> usize {
        data.matches
            .iter()
            .position(|m| m.team(0) == Some(TeamId(a)) && m.team(1) == Some(TeamId(b)))
            .unwrap()
    }

    const SWISS: Swiss = Swiss {
        group_count: 1,
        round_count: 5,
    };

    #[test]
    fn test_swiss() {
        let (data, _) = create(&SWISS, 3);

        assert_eq!(data.groups.len(), 1);
        assert_eq!(data.rounds.len(), 5);
        assert_eq!(
            pairings(&data, 0),
            vec![[Some(TeamId(1)), Some(TeamId(2))], [Some(TeamId(3)), None]]
        );
        assert!(data.matches[1].is_bye());
        assert!(pairings(&data, 1).is_empty());

        let (data, _) = create(
            &Swiss {
                group_count: 2,
                round_count: 3,
            },
            8,
        );
        assert_eq!(data.groups.len(), 2);
        assert_eq!(data.rounds.len(), 6);
        assert_eq!(data.matches.len(), 4);

        // Groups never end up with a single team.
        let format = Swiss {
            group_count: 4,
            round_count: 3,
        };
        assert_eq!(format.meta(&BracketData::default()).group_count, Some(4));

        let (data, _) = create(&format, 4);
        assert_eq!(data.groups.len(), 2);
        assert_eq!(format.meta(&data).group_count, Some(2));
        assert_eq!(format.meta(&data).round_count, Some(3));
    }

    #[test]
    fn test_swiss_bye_standings() {
        let (data, entrants) = create(&SWISS, 3);

        let standings = SWISS.standings(&data, &entrants, true);
        assert_eq!(standings.len(), 3);

        let stats = &standings.get(TeamId(3)).unwrap().stats;
        assert_eq!(stats.set_wins, 1);
        assert_eq!(stats.set_losses, 0);
        assert_eq!(stats.map_wins, 2);
        assert_eq!(stats.map_losses, 0);
        assert_eq!(stats.opponent_set_win_percentage, Some(0.0));
        assert_eq!(stats.opponent_map_win_percentage, Some(0.0));
        assert_eq!(standings.placement(TeamId(3)), Some(1));

        let standings = SWISS.standings(&data, &entrants, false);
        assert_eq!(standings.len(), 1);
        assert!(standings.get(TeamId(1)).is_none());
    }

    #[test]
    fn test_swiss_advance() {
        let (mut data, entrants) = create(&SWISS, 4);
        let group = data.groups[0].id;
        let mut ids = IdGen::virtual_ids();
        for _ in 0..data.matches.len() {
            ids.r#match();
        }

        assert_eq!(
            pairings(&data, 0),
            vec![
                [Some(TeamId(1)), Some(TeamId(2))],
                [Some(TeamId(3)), Some(TeamId(4))]
            ]
        );
        assert_eq!(
            SWISS.advance(&mut data, &entrants, group, &mut ids),
            Err(Error::RoundInProgress)
        );

        win(&SWISS, &mut data, 0, 0);
        win(&SWISS, &mut data, 1, 0);
        SWISS.advance(&mut data, &entrants, group, &mut ids).unwrap();
        assert_eq!(
            pairings(&data, 1),
            vec![
                [Some(TeamId(1)), Some(TeamId(3))],
                [Some(TeamId(2)), Some(TeamId(4))]
            ]
        );

        // 1 is the only team without a loss, 1 and 4 have not met yet.
        let a = index_of(&data, 1, 3);
        let b = index_of(&data, 2, 4);
        win(&SWISS, &mut data, a, 0);
        win(&SWISS, &mut data, b, 0);
        SWISS.advance(&mut data, &entrants, group, &mut ids).unwrap();
        assert_eq!(
            pairings(&data, 2),
            vec![
                [Some(TeamId(1)), Some(TeamId(4))],
                [Some(TeamId(2)), Some(TeamId(3))]
            ]
        );

        let standings = SWISS.standings(&data, &entrants, false);
        let stats = &standings.get(TeamId(3)).unwrap().stats;
        assert_eq!(stats.opponent_set_win_percentage, Some(0.5));
        assert_eq!(stats.losses_against_tied, Some(0));
    }

    #[test]
    fn test_swiss_advance_bye() {
        let (mut data, entrants) = create(&SWISS, 3);
        let group = data.groups[0].id;
        let mut ids = IdGen::virtual_ids();
        for _ in 0..data.matches.len() {
            ids.r#match();
        }

        win(&SWISS, &mut data, 0, 0);
        SWISS.advance(&mut data, &entrants, group, &mut ids).unwrap();

        // Team 3 already had a bye, team 2 is ranked below team 1.
        assert_eq!(
            pairings(&data, 1),
            vec![[Some(TeamId(1)), Some(TeamId(3))], [Some(TeamId(2)), None]]
        );
    }

    #[test]
    fn test_swiss_advance_dropped_out() {
        let (mut data, mut entrants) = create(&SWISS, 3);
        let group = data.groups[0].id;
        let mut ids = IdGen::virtual_ids();
        for _ in 0..data.matches.len() {
            ids.r#match();
        }

        win(&SWISS, &mut data, 0, 0);
        entrants.drop_out(TeamId(2));
        SWISS.advance(&mut data, &entrants, group, &mut ids).unwrap();

        assert_eq!(pairings(&data, 1), vec![[Some(TeamId(1)), Some(TeamId(3))]]);

        let standings = SWISS.standings(&data, &entrants, true);
        assert!(standings.get(TeamId(2)).unwrap().dropped_out);
    }

    #[test]
    fn test_swiss_unadvance() {
        let (mut data, entrants) = create(&SWISS, 4);
        let group = data.groups[0].id;
        let mut ids = IdGen::virtual_ids();
        for _ in 0..data.matches.len() {
            ids.r#match();
        }

        win(&SWISS, &mut data, 0, 0);
        win(&SWISS, &mut data, 1, 0);
        SWISS.advance(&mut data, &entrants, group, &mut ids).unwrap();
        assert_eq!(data.matches.len(), 4);

        assert_eq!(
            SWISS.retract(&mut data, 0),
            Err(Error::ResultPropagated(data.matches[2].id))
        );

        let first = data.rounds[0].id;
        let second = data.rounds[1].id;
        assert_eq!(
            SWISS.unadvance(&mut data, group, first),
            Err(Error::FirstRound)
        );
        assert_eq!(
            SWISS.unadvance(&mut data, group, Key::Virtual(99)),
            Err(Error::RoundNotFound(Key::Virtual(99)))
        );

        SWISS.unadvance(&mut data, group, second).unwrap();
        assert_eq!(data.matches.len(), 2);
        assert!(SWISS.retract(&mut data, 0).is_ok());

        SWISS.advance(&mut data, &entrants, group, &mut ids).unwrap();
        assert_eq!(pairings(&data, 1).len(), 2);
    }

    #[test]
    fn test_swiss_is_complete() {
        let format = Swiss {
            group_count: 1,
            round_count: 2,
        };
        let (mut data, entrants) = create(&format, 2);
        let group = data.groups[0].id;
        let mut ids = IdGen::virtual_ids();
        ids.r#match();

        win(&format, &mut data, 0, 0);
        assert!(!format.is_complete(&data));

        format.advance(&mut data, &entrants, group, &mut ids).unwrap();
        assert!(!format.is_complete(&data));
        assert_eq!(
            format.advance(&mut data, &entrants, group, &mut ids),
            Err(Error::RoundInProgress)
        );

        // The only possible pairing is a rematch.
        win(&format, &mut data, 1, 1);
        assert!(format.is_complete(&data));
        assert_eq!(
            format.advance(&mut data, &entrants, group, &mut ids),
            Err(Error::NoRoundsLeft)
        );

        let standings = format.standings(&data, &entrants, false);
        let stats = &standings.get(TeamId(2)).unwrap().stats;
        assert_eq!(stats.losses_against_tied, Some(1));
        assert_eq!(stats.opponent_set_win_percentage, Some(0.5));
        assert_eq!(standings.placement(TeamId(1)), Some(1));
        assert_eq!(standings.placement(TeamId(2)), Some(2));
    }
}
