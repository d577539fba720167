//! # Standings
//!
//! Standings are always computed from the current match state and never stored.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::iter::FusedIterator;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{GroupId, Key, Match, TeamId};

/// Statistics of a team within a bracket. Format specific values are `None` for formats that do
/// not track them.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Stats {
    pub set_wins: u32,
    pub set_losses: u32,
    pub map_wins: u32,
    pub map_losses: u32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub points: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub wins_against_tied: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub losses_against_tied: Option<u32>,
    /// A fraction between `0.0` and `1.0`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub opponent_set_win_percentage: Option<f64>,
    /// A fraction between `0.0` and `1.0`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub opponent_map_win_percentage: Option<f64>,
}

impl Stats {
    pub(crate) fn from_record(record: &Record) -> Self {
        Self {
            set_wins: record.set_wins,
            set_losses: record.set_losses,
            map_wins: record.map_wins,
            map_losses: record.map_losses,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Standing {
    pub team: TeamId,
    /// The group the placement is relative to. `None` for formats without groups.
    pub group_id: Option<Key<GroupId>>,
    pub placement: u32,
    pub dropped_out: bool,
    pub stats: Stats,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Standings {
    entries: Vec<Standing>,
}

impl Standings {
    #[inline]
    pub fn builder() -> Builder {
        Builder::new()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self,
            next: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, team: TeamId) -> Option<&Standing> {
        self.entries.iter().find(|entry| entry.team == team)
    }

    /// Returns the placement of `team`, if it has a standing.
    pub fn placement(&self, team: TeamId) -> Option<u32> {
        self.get(team).map(|entry| entry.placement)
    }
}

impl<'a> IntoIterator for &'a Standings {
    type Item = &'a Standing;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Builder {
    entries: Vec<EntryBuilder>,
}

impl Builder {
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entry<F>(&mut self, team: TeamId, f: F) -> &mut Self
    where
        F: FnOnce(&mut EntryBuilder),
    {
        let mut builder = EntryBuilder::new(team);
        f(&mut builder);
        self.entries.push(builder);
        self
    }

    /// Builds the [`Standings`], ordered by placement and group. Entries without stats are
    /// skipped.
    pub fn build(self) -> Standings {
        let mut entries: Vec<Standing> = self
            .entries
            .into_iter()
            .filter_map(|entry| match entry.stats {
                Some(stats) => Some(Standing {
                    team: entry.team,
                    group_id: entry.group_id,
                    placement: entry.placement,
                    dropped_out: entry.dropped_out,
                    stats,
                }),
                None => {
                    log::error!("Missing stats for team {} in standings", entry.team);
                    None
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            a.placement
                .cmp(&b.placement)
                .then_with(|| a.group_id.cmp(&b.group_id))
        });

        Standings { entries }
    }
}

#[derive(Clone, Debug)]
pub struct EntryBuilder {
    team: TeamId,
    group_id: Option<Key<GroupId>>,
    placement: u32,
    dropped_out: bool,
    stats: Option<Stats>,
}

impl EntryBuilder {
    #[inline]
    fn new(team: TeamId) -> Self {
        Self {
            team,
            group_id: None,
            placement: 1,
            dropped_out: false,
            stats: None,
        }
    }

    #[inline]
    pub fn group(&mut self, group_id: Key<GroupId>) -> &mut Self {
        self.group_id = Some(group_id);
        self
    }

    #[inline]
    pub fn placement(&mut self, placement: u32) -> &mut Self {
        self.placement = placement;
        self
    }

    #[inline]
    pub fn dropped_out(&mut self, dropped_out: bool) -> &mut Self {
        self.dropped_out = dropped_out;
        self
    }

    #[inline]
    pub fn stats(&mut self, stats: Stats) -> &mut Self {
        self.stats = Some(stats);
        self
    }
}

#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: &'a Standings,
    next: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Standing;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.entries.get(self.next)?;
        self.next += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.inner.entries.len() - self.next
    }
}

impl<'a> FusedIterator for Iter<'a> {}

/// The results of a single team over a set of matches.
#[derive(Clone, Debug, Default)]
pub(crate) struct Record {
    pub set_wins: u32,
    pub set_losses: u32,
    pub map_wins: u32,
    pub map_losses: u32,
    pub points: u32,
    /// Finished matches with an opponent.
    pub played: u32,
    pub beaten: Vec<TeamId>,
    pub lost_to: Vec<TeamId>,
}

impl Record {
    pub fn opponents(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.beaten.iter().chain(self.lost_to.iter()).copied()
    }
}

/// Collects the records of every team appearing in `matches`. Only finished matches with two
/// opponents are counted.
pub(crate) fn records<'a, I>(matches: I) -> HashMap<TeamId, Record>
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut records: HashMap<TeamId, Record> = HashMap::new();

    for m in matches {
        for index in 0..2 {
            if let Some(team) = m.team(index) {
                records.entry(team).or_default();
            }
        }

        let winner = match m.winner() {
            Some(winner) if !m.is_bye() => winner,
            _ => continue,
        };

        let (w, l) = match (
            m.opponents[winner].entrant(),
            m.opponents[1 - winner].entrant(),
        ) {
            (Some(w), Some(l)) => (w, l),
            _ => continue,
        };

        let record = records.entry(w.id).or_default();
        record.set_wins += 1;
        record.map_wins += w.score;
        record.map_losses += l.score;
        record.points += w.points;
        record.played += 1;
        record.beaten.push(l.id);

        let record = records.entry(l.id).or_default();
        record.set_losses += 1;
        record.map_wins += l.score;
        record.map_losses += w.score;
        record.points += l.points;
        record.played += 1;
        record.lost_to.push(w.id);
    }

    records
}

/// Sorts `rows` by `cmp` and returns the 1-based placement of every row. Rows comparing equal
/// share a placement, the following placement is skipped.
pub(crate) fn rank<T, F>(rows: &mut [T], mut cmp: F) -> Vec<u32>
where
    F: FnMut(&T, &T) -> Ordering,
{
    rows.sort_by(&mut cmp);

    let mut placements: Vec<u32> = Vec::with_capacity(rows.len());
    for index in 0..rows.len() {
        let placement = if index > 0 && cmp(&rows[index - 1], &rows[index]) == Ordering::Equal {
            placements[index - 1]
        } else {
            index as u32 + 1
        };

        placements.push(placement);
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::{rank, records, Standings, Stats};
    use crate::{EntrantSpot, Key, Match, Opponent, Outcome, TeamId};

    fn finished(a: u32, b: u32, scores: [u32; 2]) -> Match {
        let opponent = |id, score: u32, win| {
            EntrantSpot::Entrant(Opponent {
                id: TeamId(id),
                score,
                points: 0,
                result: Some(if win { Outcome::Win } else { Outcome::Loss }),
            })
        };

        Match {
            id: Key::Virtual(0),
            stage_id: Key::Virtual(0),
            group_id: Key::Virtual(0),
            round_id: Key::Virtual(0),
            number: 1,
            opponents: [
                opponent(a, scores[0], scores[0] > scores[1]),
                opponent(b, scores[1], scores[1] > scores[0]),
            ],
        }
    }

    #[test]
    fn test_builder() {
        let mut builder = Standings::builder();
        builder
            .entry(TeamId(1), |e| {
                e.placement(2).stats(Stats::default());
            })
            .entry(TeamId(2), |e| {
                e.placement(1).dropped_out(true).stats(Stats::default());
            })
            .entry(TeamId(3), |e| {
                e.placement(1);
            });

        let standings = builder.build();
        assert_eq!(standings.len(), 2);

        let teams: Vec<TeamId> = standings.iter().map(|s| s.team).collect();
        assert_eq!(teams, vec![TeamId(2), TeamId(1)]);
        assert!(standings.get(TeamId(2)).unwrap().dropped_out);
        assert_eq!(standings.placement(TeamId(3)), None);
    }

    #[test]
    fn test_records() {
        let mut bye = finished(1, 4, [0, 0]);
        bye.opponents[1] = EntrantSpot::Empty;

        let matches = vec![finished(1, 2, [2, 1]), finished(3, 1, [2, 0]), bye];
        let records = records(&matches);

        let record = &records[&TeamId(1)];
        assert_eq!(record.set_wins, 1);
        assert_eq!(record.set_losses, 1);
        assert_eq!(record.map_wins, 2);
        assert_eq!(record.map_losses, 3);
        assert_eq!(record.beaten, vec![TeamId(2)]);
        assert_eq!(record.lost_to, vec![TeamId(3)]);
        assert_eq!(record.played, 2);
        assert_eq!(records[&TeamId(2)].map_wins, 1);
    }

    #[test]
    fn test_rank() {
        let mut rows = vec![3, 5, 3, 1];
        let placements = rank(&mut rows, |a, b| b.cmp(a));
        assert_eq!(rows, vec![5, 3, 3, 1]);
        assert_eq!(placements, vec![1, 2, 2, 4]);
    }
}
