//! # bracket-engine-core
//!
//! This crate contains all the items required to run a multi-stage tournament: an ordered list
//! of brackets where the standings of one bracket feed the teams into the next ones. It ships
//! four builtin formats: [`SingleElimination`], [`DoubleElimination`], [`RoundRobin`] and
//! [`Swiss`].
//!
//! Important types:
//! - [`Tournament`]: The aggregate holding teams, brackets and progression overrides. All
//! mutating operations go through it.
//! - [`BracketProgression`]: A validated list of bracket definitions.
//! - [`Bracket`]: A single bracket, either in preview or started.
//! - [`System`]: A trait describing a bracket format. Implemented by every builtin format and
//! dispatched through [`BracketFormat`].
//! - [`BracketData`]: The stages, groups, rounds and matches of a bracket.
//! - [`EntrantSpot`]: A *spot* within a match, which can contain an opponent, be permanently
//! empty (a bye) or still be undecided.
//! - [`Standings`]: The placements and statistics of the teams of a bracket.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to almost all types.
//!
//! [`BracketProgression`]: progression::BracketProgression
//! [`Standings`]: standings::Standings
pub mod completion;
pub mod config;
pub mod destination;
pub mod id;
pub mod options;
pub mod progression;
pub mod scoring;
pub mod standings;
pub mod tournament;

mod action;
mod bracket;
mod double_elimination;
mod elimination;
mod round_robin;
#[cfg(feature = "serde")]
mod serde_impl;
mod single_elimination;
mod swiss;
mod utils;

pub use action::Action;
pub use bracket::{Bracket, BracketFormat, BracketMeta, BracketView, System};
pub use config::EngineConfig;
pub use double_elimination::DoubleElimination;
pub use id::{GroupId, IdGen, Key, MatchId, RoundId, StageId, TeamId};
pub use options::{BracketKind, BracketSettings};
pub use round_robin::RoundRobin;
pub use single_elimination::SingleElimination;
pub use swiss::Swiss;
pub use tournament::Tournament;
pub use utils::group_number_to_letters;

use progression::ValidationError;

use thiserror::Error;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Deref;
use std::result;
use std::vec::IntoIter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("bracket #{0} does not exist")]
    BracketNotFound(usize),
    #[error("team {0} does not exist")]
    TeamNotFound(TeamId),
    #[error("match {0} does not exist")]
    MatchNotFound(Key<MatchId>),
    #[error("group {0} does not exist")]
    GroupNotFound(Key<GroupId>),
    #[error("round {0} does not exist")]
    RoundNotFound(Key<RoundId>),
    #[error("bracket #{0} has already started")]
    BracketStarted(usize),
    #[error("bracket #{0} has not started yet")]
    BracketNotStarted(usize),
    #[error("bracket #{0} is not complete")]
    BracketNotComplete(usize),
    #[error("bracket #{0} feeds a bracket that has already started")]
    DownstreamStarted(usize),
    #[error("bracket #{destination} is not a destination of bracket #{from}")]
    InvalidDestination { from: usize, destination: usize },
    #[error("a bracket needs at least 2 teams, found {found}")]
    NotEnoughTeams { found: usize },
    #[error("{0} brackets do not support this operation")]
    Unsupported(BracketKind),
    #[error("a previous round still has matches in progress")]
    RoundInProgress,
    #[error("all rounds have already been started")]
    NoRoundsLeft,
    #[error("the first round cannot be unadvanced")]
    FirstRound,
    #[error("match {0} does not have two opponents yet")]
    MatchNotReady(Key<MatchId>),
    #[error("match {0} is already finished")]
    MatchFinished(Key<MatchId>),
    #[error("match {0} is not finished")]
    MatchNotFinished(Key<MatchId>),
    #[error("the result of match {0} was already used by a later match")]
    ResultPropagated(Key<MatchId>),
    #[error("invalid score {scores:?} for {maps}")]
    InvalidScore { scores: [u32; 2], maps: RoundMaps },
    #[error("round {0} has no map settings")]
    RoundNotConfigured(Key<RoundId>),
    #[error("invalid entrant: match {id} refers to team {team} which is not part of the bracket")]
    InvalidEntrant { id: Key<MatchId>, team: TeamId },
}

/// A team signed up to the tournament.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dropped_out: bool,
    /// The bracket this team enters first. `None` means the first bracket.
    #[cfg_attr(feature = "serde", serde(default))]
    pub starting_bracket_idx: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub prefers_not_to_host: bool,
}

impl Team {
    /// Creates a new team with default flags.
    pub fn new<S>(id: TeamId, name: S, seed: Option<u32>) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            seed,
            dropped_out: false,
            starting_bracket_idx: None,
            prefers_not_to_host: false,
        }
    }

    /// Orders two teams by their seed. Unseeded teams come last, remaining ties are broken by
    /// id.
    pub fn seed_cmp(&self, other: &Self) -> Ordering {
        match (self.seed, other.seed) {
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.id.cmp(&other.id))
    }
}

/// The teams of a bracket in seeding order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Entrants {
    entrants: Vec<Team>,
}

impl Entrants {
    /// Creates a new empty `Entrants` list.
    #[inline]
    pub fn new() -> Self {
        Self {
            entrants: Vec::new(),
        }
    }

    /// Returns the team with the given `id`.
    pub fn get(&self, id: TeamId) -> Option<&Team> {
        self.entrants.iter().find(|team| team.id == id)
    }

    /// Returns the seeding position of the team with the given `id`.
    pub fn position(&self, id: TeamId) -> Option<usize> {
        self.entrants.iter().position(|team| team.id == id)
    }

    #[inline]
    pub fn contains(&self, id: TeamId) -> bool {
        self.position(id).is_some()
    }

    /// Returns `true` if the team has dropped out. Unknown teams are not dropped out.
    pub fn is_dropped_out(&self, id: TeamId) -> bool {
        self.get(id).map_or(false, |team| team.dropped_out)
    }

    /// Compares two teams by their seed, falling back to the seeding position within the
    /// bracket.
    pub(crate) fn seed_cmp(&self, lhs: TeamId, rhs: TeamId) -> Ordering {
        match (self.get(lhs), self.get(rhs)) {
            (Some(a), Some(b)) => a.seed_cmp(b),
            _ => self.position(lhs).cmp(&self.position(rhs)),
        }
        .then_with(|| self.position(lhs).cmp(&self.position(rhs)))
    }

    pub(crate) fn drop_out(&mut self, id: TeamId) -> bool {
        match self.entrants.iter_mut().find(|team| team.id == id) {
            Some(team) => {
                team.dropped_out = true;
                true
            }
            None => false,
        }
    }
}

impl FromIterator<Team> for Entrants {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Team>,
    {
        Self {
            entrants: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Entrants {
    type Item = Team;
    type IntoIter = IntoIter<Team>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.entrants.into_iter()
    }
}

impl Deref for Entrants {
    type Target = [Team];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.entrants
    }
}

impl From<Vec<Team>> for Entrants {
    #[inline]
    fn from(entrants: Vec<Team>) -> Self {
        Self { entrants }
    }
}

/// A spot for an opponent in a [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntrantSpot<T> {
    /// The spot is taken.
    Entrant(T),
    /// The spot is permanently empty. A match with an empty spot is a *bye*.
    Empty,
    /// The spot is yet to be decided by an earlier match.
    TBD,
}

impl<T> EntrantSpot<T> {
    /// Creates a new `EntrantSpot` from an [`Option`]. A `Some(T)` value will translate into
    /// a `Entrant(T)` value, a `None` value will translate into a `Empty` value.
    pub fn new(entrant: Option<T>) -> Self {
        match entrant {
            Some(entrant) => Self::Entrant(entrant),
            None => Self::Empty,
        }
    }

    /// Returns `true` if the `EntrantSpot` is [`Entrant`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use bracket_engine_core::EntrantSpot;
    /// let spot = EntrantSpot::Entrant(());
    /// assert!(spot.is_entrant());
    /// ```
    /// [`Entrant`]: Self::Entrant
    pub fn is_entrant(&self) -> bool {
        matches!(self, Self::Entrant(_))
    }

    /// Returns `true` if the `EntrantSpot` is [`Empty`].
    ///
    /// [`Empty`]: Self::Empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` if the `EntrantSpot` is [`TBD`].
    ///
    /// [`TBD`]: Self::TBD
    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::TBD)
    }

    /// Converts from `&EntrantSpot<T>` to `EntrantSpot<&T>`.
    pub fn as_ref(&self) -> EntrantSpot<&T> {
        match self {
            Self::Entrant(entrant) => EntrantSpot::Entrant(entrant),
            Self::Empty => EntrantSpot::Empty,
            Self::TBD => EntrantSpot::TBD,
        }
    }

    /// Converts from `&mut EntrantSpot<T>` to `EntrantSpot<&mut T>`.
    pub fn as_mut(&mut self) -> EntrantSpot<&mut T> {
        match self {
            Self::Entrant(entrant) => EntrantSpot::Entrant(entrant),
            Self::Empty => EntrantSpot::Empty,
            Self::TBD => EntrantSpot::TBD,
        }
    }

    /// Returns the entrant, if the spot is taken.
    pub fn entrant(self) -> Option<T> {
        match self {
            Self::Entrant(entrant) => Some(entrant),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> EntrantSpot<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Entrant(entrant) => EntrantSpot::Entrant(f(entrant)),
            Self::Empty => EntrantSpot::Empty,
            Self::TBD => EntrantSpot::TBD,
        }
    }
}

impl<T> Default for EntrantSpot<T> {
    #[inline]
    fn default() -> Self {
        Self::TBD
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Outcome {
    Win,
    Loss,
}

/// A team taking part in a [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Opponent {
    pub id: TeamId,
    /// The number of maps won.
    pub score: u32,
    pub points: u32,
    pub result: Option<Outcome>,
}

impl Opponent {
    /// Creates a new `Opponent` without any score.
    #[inline]
    pub const fn new(id: TeamId) -> Self {
        Self {
            id,
            score: 0,
            points: 0,
            result: None,
        }
    }

    #[inline]
    pub fn is_winner(&self) -> bool {
        self.result == Some(Outcome::Win)
    }
}

/// A single set between two opponents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: Key<MatchId>,
    pub stage_id: Key<StageId>,
    pub group_id: Key<GroupId>,
    pub round_id: Key<RoundId>,
    /// The 1-based number of the match within its round.
    pub number: u32,
    pub opponents: [EntrantSpot<Opponent>; 2],
}

impl Match {
    /// Returns the team in spot `index`, if it is taken.
    pub fn team(&self, index: usize) -> Option<TeamId> {
        self.opponents[index].as_ref().entrant().map(|opponent| opponent.id)
    }

    /// Returns `true` if `team` is one of the opponents.
    pub fn contains(&self, team: TeamId) -> bool {
        self.team(0) == Some(team) || self.team(1) == Some(team)
    }

    /// Returns the index of the spot holding the winner.
    pub fn winner(&self) -> Option<usize> {
        self.opponents.iter().position(|spot| match spot {
            EntrantSpot::Entrant(opponent) => opponent.is_winner(),
            _ => false,
        })
    }

    /// Returns `true` if one of the opponents has won the match.
    #[inline]
    pub fn is_over(&self) -> bool {
        self.winner().is_some()
    }

    /// Returns `true` if one of the spots is permanently empty.
    #[inline]
    pub fn is_bye(&self) -> bool {
        self.opponents.iter().any(EntrantSpot::is_empty)
    }

    /// Returns `true` if both opponents are known and the match has no winner yet.
    pub fn is_ongoing(&self) -> bool {
        self.opponents.iter().all(EntrantSpot::is_entrant) && !self.is_over()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MapCountType {
    /// The set ends once a team won the majority of maps.
    BestOf,
    /// Every map is played.
    PlayAll,
}

/// The maps played in every set of a round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundMaps {
    pub count: u32,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: MapCountType,
}

impl RoundMaps {
    #[inline]
    pub const fn best_of(count: u32) -> Self {
        Self {
            count,
            kind: MapCountType::BestOf,
        }
    }

    #[inline]
    pub const fn play_all(count: u32) -> Self {
        Self {
            count,
            kind: MapCountType::PlayAll,
        }
    }
}

impl std::fmt::Display for RoundMaps {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.kind {
            MapCountType::BestOf => write!(f, "best of {}", self.count),
            MapCountType::PlayAll => write!(f, "play all {}", self.count),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Round {
    pub id: Key<RoundId>,
    pub stage_id: Key<StageId>,
    pub group_id: Key<GroupId>,
    pub number: u32,
    /// `None` until the bracket is started.
    pub maps: Option<RoundMaps>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Group {
    pub id: Key<GroupId>,
    pub stage_id: Key<StageId>,
    pub number: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stage {
    pub id: Key<StageId>,
    pub name: String,
    pub number: u32,
}

/// All stages, groups, rounds and matches of a bracket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketData {
    #[cfg_attr(feature = "serde", serde(rename = "stage"))]
    pub stages: Vec<Stage>,
    #[cfg_attr(feature = "serde", serde(rename = "group"))]
    pub groups: Vec<Group>,
    #[cfg_attr(feature = "serde", serde(rename = "round"))]
    pub rounds: Vec<Round>,
    #[cfg_attr(feature = "serde", serde(rename = "match"))]
    pub matches: Vec<Match>,
}

impl BracketData {
    /// Returns `true` if the bracket holds no data at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn group(&self, id: Key<GroupId>) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn round(&self, id: Key<RoundId>) -> Option<&Round> {
        self.rounds.iter().find(|round| round.id == id)
    }

    pub fn match_index(&self, id: Key<MatchId>) -> Option<usize> {
        self.matches.iter().position(|m| m.id == id)
    }

    /// Returns the rounds of a group ordered by their number.
    pub fn rounds_in_group(&self, group: Key<GroupId>) -> Vec<&Round> {
        let mut rounds: Vec<&Round> = self
            .rounds
            .iter()
            .filter(|round| round.group_id == group)
            .collect();
        rounds.sort_by_key(|round| round.number);
        rounds
    }

    pub fn matches_in_round(&self, round: Key<RoundId>) -> impl Iterator<Item = &Match> + '_ {
        self.matches.iter().filter(move |m| m.round_id == round)
    }

    /// Returns the maps of the round `m` is played in.
    pub fn maps_of(&self, m: &Match) -> Option<RoundMaps> {
        self.round(m.round_id).and_then(|round| round.maps)
    }

    /// Applies `maps` to every round.
    pub fn set_maps(&mut self, maps: RoundMaps) {
        for round in &mut self.rounds {
            round.maps = Some(maps);
        }
    }

    /// Replaces every [`Key::Virtual`] id with a newly allocated id from `ids` and rewrites all
    /// references accordingly.
    pub fn promote(&mut self, ids: &mut IdGen) {
        let mut stages = HashMap::new();
        for stage in &mut self.stages {
            let id = promote_key(&mut stages, stage.id, || ids.stage());
            stage.id = id;
        }

        let mut groups = HashMap::new();
        for group in &mut self.groups {
            group.id = promote_key(&mut groups, group.id, || ids.group());
            group.stage_id = stages.get(&group.stage_id).copied().unwrap_or(group.stage_id);
        }

        let mut rounds = HashMap::new();
        for round in &mut self.rounds {
            round.id = promote_key(&mut rounds, round.id, || ids.round());
            round.stage_id = stages.get(&round.stage_id).copied().unwrap_or(round.stage_id);
            round.group_id = groups.get(&round.group_id).copied().unwrap_or(round.group_id);
        }

        for m in &mut self.matches {
            if m.id.is_virtual() {
                m.id = ids.r#match();
            }
            m.stage_id = stages.get(&m.stage_id).copied().unwrap_or(m.stage_id);
            m.group_id = groups.get(&m.group_id).copied().unwrap_or(m.group_id);
            m.round_id = rounds.get(&m.round_id).copied().unwrap_or(m.round_id);
        }
    }
}

fn promote_key<T, F>(map: &mut HashMap<Key<T>, Key<T>>, key: Key<T>, next: F) -> Key<T>
where
    T: Copy + Eq + std::hash::Hash,
    F: FnOnce() -> Key<T>,
{
    if key.is_real() {
        return key;
    }

    let id = next();
    map.insert(key, id);
    id
}

#[cfg(test)]
macro_rules! teams {
    ($($x:expr),* $(,)?) => {
        $crate::Entrants::from(vec![$(
            $crate::Team::new($crate::TeamId($x), format!("Team {}", $x), Some($x)),
        )*])
    };
}

#[cfg(test)]
pub(crate) use teams;
