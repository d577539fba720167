//! # Destinations
//!
//! Resolves the bracket a team moves on to after finishing a bracket. The destination is derived
//! from the team's placement and the [`Source`]s of the later brackets, unless an organizer set
//! an [`Override`] for the team.
//!
//! [`Source`]: crate::progression::Source
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::progression::BracketProgression;
use crate::TeamId;

/// Where a team goes after finishing a bracket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i64", into = "i64"))]
pub enum Destination {
    /// The bracket with the given index.
    Bracket(usize),
    /// The team leaves the tournament. Encoded as `-1` on the wire.
    Eliminated,
}

impl Destination {
    /// Returns the bracket index, if the team is not eliminated.
    #[inline]
    pub fn bracket_idx(self) -> Option<usize> {
        match self {
            Self::Bracket(idx) => Some(idx),
            Self::Eliminated => None,
        }
    }
}

impl From<Option<usize>> for Destination {
    #[inline]
    fn from(idx: Option<usize>) -> Self {
        match idx {
            Some(idx) => Self::Bracket(idx),
            None => Self::Eliminated,
        }
    }
}

impl From<Destination> for i64 {
    fn from(destination: Destination) -> Self {
        match destination {
            Destination::Bracket(idx) => idx as i64,
            Destination::Eliminated => -1,
        }
    }
}

impl TryFrom<i64> for Destination {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Eliminated),
            value if value >= 0 => Ok(Self::Bracket(value as usize)),
            value => Err(format!("invalid destination bracket index {}", value)),
        }
    }
}

/// An organizer decision sending a team to a specific destination, regardless of its placement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Override {
    pub tournament_team_id: TeamId,
    pub source_bracket_idx: usize,
    #[cfg_attr(feature = "serde", serde(rename = "destinationBracketIdx"))]
    pub destination: Destination,
}

/// All overrides of a tournament. At most one override exists per team and source bracket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Overrides(Vec<Override>);

impl Overrides {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, team: TeamId, source_bracket_idx: usize) -> Option<&Override> {
        self.0.iter().find(|o| {
            o.tournament_team_id == team && o.source_bracket_idx == source_bracket_idx
        })
    }

    /// Returns a copy with `o` added, replacing an existing override for the same team and
    /// source bracket.
    pub fn with(&self, o: Override) -> Self {
        let mut overrides = self.without(o.tournament_team_id, o.source_bracket_idx);
        overrides.0.push(o);
        overrides
    }

    /// Returns a copy without the override for `team` and `source_bracket_idx`.
    pub fn without(&self, team: TeamId, source_bracket_idx: usize) -> Self {
        Self(
            self.0
                .iter()
                .filter(|o| {
                    !(o.tournament_team_id == team && o.source_bracket_idx == source_bracket_idx)
                })
                .copied()
                .collect(),
        )
    }

    /// Splits off all overrides with the given source bracket. Returns the remaining overrides
    /// and the removed ones.
    pub fn without_source(&self, source_bracket_idx: usize) -> (Self, Vec<Override>) {
        let (removed, kept) = self
            .0
            .iter()
            .partition(|o| o.source_bracket_idx == source_bracket_idx);
        (Self(kept), removed)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Override> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Override> for Overrides {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Override>,
    {
        iter.into_iter()
            .fold(Self::new(), |overrides, o| overrides.with(o))
    }
}

/// Returns the bracket that teams with `placement` in bracket `source_bracket_idx` move on to.
/// Returns `None` if no later bracket takes that placement.
pub fn destination_by_placement(
    source_bracket_idx: usize,
    placement: u32,
    progression: &BracketProgression,
) -> Option<usize> {
    progression.iter().find_map(|(idx, bracket)| {
        let source = bracket.source.as_ref()?;

        if source.bracket_idx == source_bracket_idx && source.placements.contains(placement) {
            Some(idx)
        } else {
            None
        }
    })
}

/// Returns the indices of all brackets that take teams from bracket `bracket_idx`, in ascending
/// order.
pub fn destinations_from_bracket_idx(
    bracket_idx: usize,
    progression: &BracketProgression,
) -> Vec<usize> {
    progression
        .iter()
        .filter(|(_, bracket)| {
            bracket
                .source
                .as_ref()
                .map_or(false, |source| source.bracket_idx == bracket_idx)
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Resolves the destination of `team` after bracket `source_bracket_idx`. An override always
/// takes precedence over the `placement`. A team without placement and without override is
/// eliminated.
pub fn resolve(
    team: TeamId,
    source_bracket_idx: usize,
    placement: Option<u32>,
    progression: &BracketProgression,
    overrides: &Overrides,
) -> Destination {
    if let Some(o) = overrides.get(team, source_bracket_idx) {
        return o.destination;
    }

    placement
        .and_then(|placement| destination_by_placement(source_bracket_idx, placement, progression))
        .into()
}
