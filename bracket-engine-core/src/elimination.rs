//! Match links shared by the elimination formats.
//!
//! Elimination brackets never store explicit links between matches. The following match of a
//! winner or loser is computed from the position of a match: the number of its group, round and
//! the match itself.
use std::collections::HashMap;

use crate::{BracketData, EntrantSpot, Error, Opponent, Result, TeamId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Position {
    pub group: u32,
    pub round: u32,
    pub number: u32,
}

impl Position {
    #[inline]
    pub const fn new(group: u32, round: u32, number: u32) -> Self {
        Self {
            group,
            round,
            number,
        }
    }
}

/// A spot in the match at `position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Slot {
    pub position: Position,
    pub spot: usize,
}

impl Slot {
    #[inline]
    pub const fn new(group: u32, round: u32, number: u32, spot: usize) -> Self {
        Self {
            position: Position::new(group, round, number),
            spot,
        }
    }

    /// Returns the slot in round `round` of `group` fed by match `number` of the previous round,
    /// where every two matches feed a single match.
    #[inline]
    pub const fn halved(group: u32, round: u32, number: u32) -> Self {
        Self::new(group, round, (number + 1) / 2, ((number - 1) % 2) as usize)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NextMatches {
    pub winner: Option<Slot>,
    pub loser: Option<Slot>,
}

impl NextMatches {
    #[inline]
    pub const fn new(winner: Option<Slot>, loser: Option<Slot>) -> Self {
        Self { winner, loser }
    }
}

/// The positions of all matches of a bracket.
#[derive(Clone, Debug)]
pub(crate) struct Layout {
    positions: Vec<Position>,
    indices: HashMap<Position, usize>,
    rounds: HashMap<u32, u32>,
}

impl Layout {
    pub fn new(data: &BracketData) -> Self {
        let mut positions = Vec::with_capacity(data.matches.len());
        let mut indices = HashMap::with_capacity(data.matches.len());
        let mut rounds: HashMap<u32, u32> = HashMap::new();

        for (index, m) in data.matches.iter().enumerate() {
            let group = data.group(m.group_id).map_or(0, |group| group.number);
            let round = data.round(m.round_id).map_or(0, |round| round.number);

            let position = Position::new(group, round, m.number);
            positions.push(position);
            indices.insert(position, index);

            let count = rounds.entry(group).or_default();
            *count = (*count).max(round);
        }

        Self {
            positions,
            indices,
            rounds,
        }
    }

    #[inline]
    pub fn position(&self, index: usize) -> Position {
        self.positions[index]
    }

    #[inline]
    pub fn index(&self, position: Position) -> Option<usize> {
        self.indices.get(&position).copied()
    }

    /// Returns the number of rounds of the group with the given number.
    #[inline]
    pub fn round_count(&self, group: u32) -> u32 {
        self.rounds.get(&group).copied().unwrap_or_default()
    }
}

pub(crate) trait Links {
    /// Returns where the winner and loser of the match at `position` go. `winner` is the spot of
    /// the winning opponent, `None` for byes.
    fn next_matches(&self, layout: &Layout, position: Position, winner: Option<usize>)
        -> NextMatches;
}

/// Returns the teams leaving the match at `index` as winner and loser, or `None` if the match is
/// not decided. A bye with a single opponent advances that opponent.
fn outcome(data: &BracketData, index: usize) -> Option<(EntrantSpot<TeamId>, EntrantSpot<TeamId>)> {
    let m = &data.matches[index];

    match m.winner() {
        Some(winner) => Some((
            EntrantSpot::new(m.team(winner)),
            EntrantSpot::new(m.team(1 - winner)),
        )),
        None if is_settled_bye(data, index) => {
            let winner = m.team(0).or_else(|| m.team(1));
            Some((EntrantSpot::new(winner), EntrantSpot::Empty))
        }
        None => None,
    }
}

fn is_settled_bye(data: &BracketData, index: usize) -> bool {
    let m = &data.matches[index];
    m.is_bye() && !m.opponents.iter().any(EntrantSpot::is_tbd)
}

/// Moves the winner and loser of the match at `index` into the following matches. Byes created
/// on the way are advanced as well.
pub(crate) fn propagate<L>(links: &L, data: &mut BracketData, index: usize)
where
    L: Links,
{
    let layout = Layout::new(data);
    let mut queue = vec![index];

    while let Some(index) = queue.pop() {
        let (winner, loser) = match outcome(data, index) {
            Some(outcome) => outcome,
            None => continue,
        };

        let next = links.next_matches(&layout, layout.position(index), data.matches[index].winner());
        for (slot, team) in [(next.winner, winner), (next.loser, loser)] {
            let slot = match slot {
                Some(slot) => slot,
                None => continue,
            };

            if let Some(target) = layout.index(slot.position) {
                data.matches[target].opponents[slot.spot] = team.map(Opponent::new);

                if is_settled_bye(data, target) {
                    queue.push(target);
                }
            }
        }
    }
}

/// Advances every bye of freshly created bracket data.
pub(crate) fn settle_byes<L>(links: &L, data: &mut BracketData)
where
    L: Links,
{
    for index in 0..data.matches.len() {
        if is_settled_bye(data, index) {
            propagate(links, data, index);
        }
    }
}

/// Removes the teams that left the match at `index` from the following matches. Fails if any
/// following match was already decided.
pub(crate) fn retract<L>(links: &L, data: &mut BracketData, index: usize) -> Result<()>
where
    L: Links,
{
    let layout = Layout::new(data);
    retract_inner(links, &layout, data, index)
}

fn retract_inner<L>(links: &L, layout: &Layout, data: &mut BracketData, index: usize) -> Result<()>
where
    L: Links,
{
    let next = links.next_matches(layout, layout.position(index), data.matches[index].winner());

    for slot in [next.winner, next.loser].into_iter().flatten() {
        let target = match layout.index(slot.position) {
            Some(target) => target,
            None => continue,
        };

        if data.matches[target].is_over() {
            return Err(Error::ResultPropagated(data.matches[target].id));
        }

        if is_settled_bye(data, target) {
            retract_inner(links, layout, data, target)?;
        }

        data.matches[target].opponents[slot.spot] = EntrantSpot::TBD;
    }

    Ok(())
}

/// Returns the seeding order of the first round of an elimination bracket with `size` spots,
/// as 0-based seeds. The best seeds meet as late as possible.
pub(crate) fn seed_order(size: usize) -> Vec<usize> {
    let mut order = vec![0];

    while order.len() < size {
        let len = order.len() * 2;
        order = order
            .into_iter()
            .flat_map(|seed| [seed, len - 1 - seed])
            .collect();
    }

    order
}
