use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bracket::{BracketMeta, DataBuilder, System};
use crate::standings::{self, Standings, Stats};
use crate::{
    BracketData, BracketKind, EntrantSpot, Entrants, Error, GroupId, IdGen, Key, Opponent,
    Result, Team, TeamId,
};

/// A round robin bracket.
///
/// Teams are split into groups of at most `teams_per_group` teams. Within a group every team
/// plays every other team once.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RoundRobin {
    pub teams_per_group: u32,
}

impl RoundRobin {
    /// Returns the number of groups for `teams` teams. Every group has at least two teams.
    pub(crate) fn group_count(teams: usize, per_group: u32) -> usize {
        let per_group = per_group.max(2) as usize;
        let count = (teams + per_group - 1) / per_group;
        count.min(teams / 2).max(1)
    }

    /// Returns the index of entrant of the at the given `index` in a circle of length `n` at
    /// the given `round`.
    #[inline]
    fn circle_entrant(n: usize, round: usize, index: usize) -> usize {
        debug_assert!(n % 2 == 0);

        if index == 0 {
            return 0;
        }

        match index as isize - round as isize {
            res if res <= 0 => n - (res.unsigned_abs()) - 1,
            res => res as usize,
        }
    }
}

/// Splits `entrants` into `count` groups, dealing teams out in seeding order.
pub(crate) fn split_groups(entrants: &Entrants, count: usize) -> Vec<Vec<&Team>> {
    let mut groups = vec![Vec::new(); count];
    for (index, team) in entrants.iter().enumerate() {
        groups[index % count].push(team);
    }

    groups
}

impl System for RoundRobin {
    fn kind(&self) -> BracketKind {
        BracketKind::RoundRobin
    }

    fn create(&self, name: &str, entrants: &Entrants, ids: &mut IdGen) -> Result<BracketData> {
        if entrants.len() < 2 {
            return Err(Error::NotEnoughTeams {
                found: entrants.len(),
            });
        }

        let group_count = Self::group_count(entrants.len(), self.teams_per_group);

        log::debug!(
            "Creating new RoundRobin bracket with {} entrants in {} groups",
            entrants.len(),
            group_count
        );

        let mut builder = DataBuilder::new(name, ids);

        for (index, teams) in split_groups(entrants, group_count).into_iter().enumerate() {
            let group_id = builder.group(index as u32 + 1);

            // Odd groups get a placeholder team, its opponent has no match in that round.
            let n = teams.len() + teams.len() % 2;

            for round in 0..n - 1 {
                let round_id = builder.round(group_id, round as u32 + 1);

                let mut number = 1;
                for index in 0..n / 2 {
                    let a = Self::circle_entrant(n, round, index);
                    let b = Self::circle_entrant(n, round, n - index - 1);

                    if let (Some(a), Some(b)) = (teams.get(a), teams.get(b)) {
                        builder.r#match(
                            group_id,
                            round_id,
                            number,
                            [
                                EntrantSpot::Entrant(Opponent::new(a.id)),
                                EntrantSpot::Entrant(Opponent::new(b.id)),
                            ],
                        );
                        number += 1;
                    }
                }
            }
        }

        Ok(builder.build())
    }

    fn standings(
        &self,
        data: &BracketData,
        entrants: &Entrants,
        include_unfinished: bool,
    ) -> Standings {
        let mut builder = Standings::builder();

        for group in &data.groups {
            let matches: Vec<_> = data
                .matches
                .iter()
                .filter(|m| m.group_id == group.id)
                .collect();

            if !include_unfinished && matches.iter().any(|m| !m.is_bye() && !m.is_over()) {
                continue;
            }

            let records = standings::records(matches.iter().copied());

            let mut rows: Vec<(TeamId, Stats)> = records
                .iter()
                .map(|(team, record)| {
                    let wins_against_tied = record
                        .beaten
                        .iter()
                        .filter(|opponent| {
                            records
                                .get(opponent)
                                .map_or(false, |other| other.set_wins == record.set_wins)
                        })
                        .count() as u32;

                    let mut stats = Stats::from_record(record);
                    stats.points = Some(record.points);
                    stats.wins_against_tied = Some(wins_against_tied);
                    (*team, stats)
                })
                .collect();

            let placements = standings::rank(&mut rows, |(a, lhs), (b, rhs)| {
                rhs.set_wins
                    .cmp(&lhs.set_wins)
                    .then_with(|| rhs.wins_against_tied.cmp(&lhs.wins_against_tied))
                    .then_with(|| rhs.points.cmp(&lhs.points))
                    .then_with(|| entrants.seed_cmp(*a, *b))
            });

            for ((team, stats), placement) in rows.into_iter().zip(placements) {
                builder.entry(team, |e| {
                    e.group(group.id)
                        .placement(placement)
                        .dropped_out(entrants.is_dropped_out(team))
                        .stats(stats);
                });
            }
        }

        builder.build()
    }

    fn meta(&self, _data: &BracketData) -> BracketMeta {
        BracketMeta {
            teams_per_group: Some(self.teams_per_group),
            ..Default::default()
        }
    }
}

/// Returns the group of every team appearing in `data`.
pub(crate) fn team_groups(data: &BracketData) -> HashMap<TeamId, Key<GroupId>> {
    let mut groups = HashMap::new();
    for m in &data.matches {
        for index in 0..2 {
            if let Some(team) = m.team(index) {
                groups.insert(team, m.group_id);
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{team_groups, RoundRobin};
    use crate::tests::{create, win};
    use crate::{BracketMeta, Key, System, TeamId};

    #[test]
    fn test_circle_entrant() {
        let entrants = 10;
        let mut round = 0;

        macro_rules! test {
            ($($in:expr => $out:expr),*,) => {
                $(
                    assert_eq!(RoundRobin::circle_entrant(entrants, round, $in), $out);
                )*
            };
        }

        test! {
            0 => 0,
            1 => 1,
            5 => 5,
            9 => 9,
        };

        round += 1;
        test! {
            0 => 0,
            1 => 9,
            2 => 1,
            9 => 8,
        };

        round += 1;
        test! {
            0 => 0,
            1 => 8,
            2 => 9,
            3 => 1,
        };
    }

    #[test]
    fn test_group_count() {
        assert_eq!(RoundRobin::group_count(8, 4), 2);
        assert_eq!(RoundRobin::group_count(9, 4), 3);
        assert_eq!(RoundRobin::group_count(4, 4), 1);
        assert_eq!(RoundRobin::group_count(3, 2), 1);
        assert_eq!(RoundRobin::group_count(2, 6), 1);
    }

    #[test]
    fn test_round_robin() {
        let format = RoundRobin { teams_per_group: 4 };

        for n in 2..=8 {
            let (data, _) = create(&format, n);

            let mut pairs = HashSet::new();
            for m in &data.matches {
                let (a, b) = (m.team(0).unwrap(), m.team(1).unwrap());
                assert_ne!(a, b);
                assert!(pairs.insert((a.min(b), a.max(b))));
            }

            // Every team plays every other team of its group exactly once.
            let groups = team_groups(&data);
            let expected: usize = data
                .groups
                .iter()
                .map(|group| {
                    let k = groups.values().filter(|g| **g == group.id).count();
                    k * (k - 1) / 2
                })
                .sum();
            assert_eq!(data.matches.len(), expected);
        }

        let (data, _) = create(&format, 3);
        assert_eq!(data.rounds.len(), 3);
        assert_eq!(data.matches.len(), 3);

        let (data, _) = create(&format, 8);
        assert_eq!(data.groups.len(), 2);
        let groups = team_groups(&data);
        assert_eq!(groups[&TeamId(1)], groups[&TeamId(3)]);
        assert_ne!(groups[&TeamId(1)], groups[&TeamId(2)]);
    }

    #[test]
    fn test_round_robin_standings() {
        let format = RoundRobin { teams_per_group: 4 };
        let (mut data, entrants) = create(&format, 3);

        for index in 0..data.matches.len() {
            // The lower team id wins.
            let m = &data.matches[index];
            let slot = if m.team(0) < m.team(1) { 0 } else { 1 };
            win(&format, &mut data, index, slot);

            if index == 0 {
                assert!(format.standings(&data, &entrants, false).is_empty());
                assert_eq!(format.standings(&data, &entrants, true).len(), 3);
            }
        }

        let standings = format.standings(&data, &entrants, false);
        let placements: Vec<(u32, u32)> = standings
            .iter()
            .map(|s| (s.team.0, s.placement))
            .collect();
        assert_eq!(placements, vec![(1, 1), (2, 2), (3, 3)]);

        let stats = &standings.get(TeamId(2)).unwrap().stats;
        assert_eq!(stats.set_wins, 1);
        assert_eq!(stats.set_losses, 1);
        assert_eq!(stats.points, Some(0));
        assert_eq!(stats.wins_against_tied, Some(0));
        assert!(stats.losses_against_tied.is_none());
    }

    #[test]
    fn test_round_robin_standings_cycle() {
        let format = RoundRobin { teams_per_group: 4 };
        let (mut data, entrants) = create(&format, 3);

        // 1 beats 2, 2 beats 3, 3 beats 1.
        for index in 0..data.matches.len() {
            let m = &data.matches[index];
            let (a, b) = (m.team(0).unwrap().0, m.team(1).unwrap().0);
            let first_wins = matches!((a, b), (1, 2) | (2, 3) | (3, 1));
            win(&format, &mut data, index, if first_wins { 0 } else { 1 });
        }

        let standings = format.standings(&data, &entrants, false);
        for standing in &standings {
            assert_eq!(standing.stats.set_wins, 1);
            assert_eq!(standing.stats.wins_against_tied, Some(1));
        }

        // Decided by seed.
        let teams: Vec<u32> = standings.iter().map(|s| s.team.0).collect();
        assert_eq!(teams, vec![1, 2, 3]);
        assert_eq!(standings.placement(TeamId(3)), Some(3));
    }

    #[test]
    fn test_round_robin_standings_groups() {
        let format = RoundRobin { teams_per_group: 2 };
        let (mut data, entrants) = create(&format, 4);
        assert_eq!(data.groups.len(), 2);

        win(&format, &mut data, 0, 0);
        win(&format, &mut data, 1, 0);

        let standings = format.standings(&data, &entrants, false);
        let rows: Vec<(u32, u32, Option<Key<crate::GroupId>>)> = standings
            .iter()
            .map(|s| (s.team.0, s.placement, s.group_id))
            .collect();
        assert_eq!(
            rows,
            vec![
                (1, 1, Some(Key::Virtual(0))),
                (2, 1, Some(Key::Virtual(1))),
                (3, 2, Some(Key::Virtual(0))),
                (4, 2, Some(Key::Virtual(1))),
            ]
        );
        assert_eq!(
            format.meta(&data),
            BracketMeta {
                teams_per_group: Some(2),
                ..Default::default()
            }
        );
    }
}
