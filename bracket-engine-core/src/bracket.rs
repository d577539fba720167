use crate::completion;
use crate::scoring;
use crate::standings::Standings;
use crate::{
    BracketData, BracketKind, DoubleElimination, Entrants, EntrantSpot, Error, Group, GroupId,
    IdGen, Key, Match, MatchId, Opponent, Outcome, Result, Round, RoundId, RoundMaps, RoundRobin,
    SingleElimination, Stage, StageId, Swiss, Team, TeamId,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A bracket format.
pub trait System {
    fn kind(&self) -> BracketKind;

    /// Creates the data of a new bracket named `name` for `entrants` in seeding order.
    fn create(&self, name: &str, entrants: &Entrants, ids: &mut IdGen) -> Result<BracketData>;

    /// Computes the standings from the current match state. Teams without any decided match are
    /// only included if `include_unfinished` is `true`.
    fn standings(
        &self,
        data: &BracketData,
        entrants: &Entrants,
        include_unfinished: bool,
    ) -> Standings;

    /// Returns `true` if no match of the bracket can be played anymore.
    fn is_complete(&self, data: &BracketData) -> bool {
        completion::every_match_is_over(&data.matches)
    }

    /// Called after the match at `index` was decided.
    fn propagate(&self, _data: &mut BracketData, _index: usize) {}

    /// Called before the result of the match at `index` is removed. Fails if the result can no
    /// longer be removed.
    fn retract(&self, _data: &mut BracketData, _index: usize) -> Result<()> {
        Ok(())
    }

    /// Returns the settings shown next to the bracket `data`.
    fn meta(&self, _data: &BracketData) -> BracketMeta {
        BracketMeta::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", content = "settings", rename_all = "snake_case")
)]
pub enum BracketFormat {
    SingleElimination(SingleElimination),
    DoubleElimination(DoubleElimination),
    RoundRobin(RoundRobin),
    Swiss(Swiss),
}

impl System for BracketFormat {
    fn kind(&self) -> BracketKind {
        match self {
            Self::SingleElimination(f) => f.kind(),
            Self::DoubleElimination(f) => f.kind(),
            Self::RoundRobin(f) => f.kind(),
            Self::Swiss(f) => f.kind(),
        }
    }

    fn create(&self, name: &str, entrants: &Entrants, ids: &mut IdGen) -> Result<BracketData> {
        match self {
            Self::SingleElimination(f) => f.create(name, entrants, ids),
            Self::DoubleElimination(f) => f.create(name, entrants, ids),
            Self::RoundRobin(f) => f.create(name, entrants, ids),
            Self::Swiss(f) => f.create(name, entrants, ids),
        }
    }

    fn standings(
        &self,
        data: &BracketData,
        entrants: &Entrants,
        include_unfinished: bool,
    ) -> Standings {
        match self {
            Self::SingleElimination(f) => f.standings(data, entrants, include_unfinished),
            Self::DoubleElimination(f) => f.standings(data, entrants, include_unfinished),
            Self::RoundRobin(f) => f.standings(data, entrants, include_unfinished),
            Self::Swiss(f) => f.standings(data, entrants, include_unfinished),
        }
    }

    fn is_complete(&self, data: &BracketData) -> bool {
        match self {
            Self::SingleElimination(f) => f.is_complete(data),
            Self::DoubleElimination(f) => f.is_complete(data),
            Self::RoundRobin(f) => f.is_complete(data),
            Self::Swiss(f) => f.is_complete(data),
        }
    }

    fn propagate(&self, data: &mut BracketData, index: usize) {
        match self {
            Self::SingleElimination(f) => f.propagate(data, index),
            Self::DoubleElimination(f) => f.propagate(data, index),
            Self::RoundRobin(f) => f.propagate(data, index),
            Self::Swiss(f) => f.propagate(data, index),
        }
    }

    fn retract(&self, data: &mut BracketData, index: usize) -> Result<()> {
        match self {
            Self::SingleElimination(f) => f.retract(data, index),
            Self::DoubleElimination(f) => f.retract(data, index),
            Self::RoundRobin(f) => f.retract(data, index),
            Self::Swiss(f) => f.retract(data, index),
        }
    }

    fn meta(&self, data: &BracketData) -> BracketMeta {
        match self {
            Self::SingleElimination(f) => f.meta(data),
            Self::DoubleElimination(f) => f.meta(data),
            Self::RoundRobin(f) => f.meta(data),
            Self::Swiss(f) => f.meta(data),
        }
    }
}

/// Format settings exposed next to the bracket data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BracketMeta {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub teams_per_group: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub group_count: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub round_count: Option<u32>,
}

/// The read view of a bracket.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketView {
    pub data: BracketData,
    pub meta: BracketMeta,
}

/// Builds new [`BracketData`] with ids from an [`IdGen`].
pub(crate) struct DataBuilder<'a> {
    ids: &'a mut IdGen,
    data: BracketData,
    stage_id: Key<StageId>,
}

impl<'a> DataBuilder<'a> {
    pub fn new(name: &str, ids: &'a mut IdGen) -> Self {
        let stage_id = ids.stage();

        Self {
            ids,
            data: BracketData {
                stages: vec![Stage {
                    id: stage_id,
                    name: name.to_owned(),
                    number: 1,
                }],
                ..Default::default()
            },
            stage_id,
        }
    }

    pub fn group(&mut self, number: u32) -> Key<GroupId> {
        let id = self.ids.group();
        self.data.groups.push(Group {
            id,
            stage_id: self.stage_id,
            number,
        });
        id
    }

    pub fn round(&mut self, group_id: Key<GroupId>, number: u32) -> Key<RoundId> {
        let id = self.ids.round();
        self.data.rounds.push(Round {
            id,
            stage_id: self.stage_id,
            group_id,
            number,
            maps: None,
        });
        id
    }

    pub fn r#match(
        &mut self,
        group_id: Key<GroupId>,
        round_id: Key<RoundId>,
        number: u32,
        opponents: [EntrantSpot<Opponent>; 2],
    ) -> &mut Self {
        let id = self.ids.r#match();
        self.data.matches.push(Match {
            id,
            stage_id: self.stage_id,
            group_id,
            round_id,
            number,
            opponents,
        });
        self
    }

    #[inline]
    pub fn build(self) -> BracketData {
        self.data
    }
}

/// A single bracket of a tournament.
#[derive(Clone, Debug, PartialEq)]
pub struct Bracket {
    idx: usize,
    name: String,
    format: BracketFormat,
    preview: bool,
    entrants: Entrants,
    data: BracketData,
}

impl Bracket {
    /// Creates a new bracket in preview.
    pub(crate) fn new(idx: usize, name: String, format: BracketFormat) -> Self {
        Self {
            idx,
            name,
            format,
            preview: true,
            entrants: Entrants::new(),
            data: BracketData::default(),
        }
    }

    /// Restores a started bracket.
    pub(crate) fn resume(&mut self, entrants: Entrants, data: BracketData) -> Result<()> {
        for m in &data.matches {
            for index in 0..2 {
                if let Some(team) = m.team(index) {
                    if !entrants.contains(team) {
                        return Err(Error::InvalidEntrant { id: m.id, team });
                    }
                }
            }
        }

        self.entrants = entrants;
        self.data = data;
        self.preview = false;
        Ok(())
    }

    #[inline]
    pub fn idx(&self) -> usize {
        self.idx
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn format(&self) -> &BracketFormat {
        &self.format
    }

    #[inline]
    pub fn kind(&self) -> BracketKind {
        self.format.kind()
    }

    #[inline]
    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Returns `true` if the bracket data carries persisted ids.
    #[inline]
    pub fn has_started(&self) -> bool {
        completion::bracket_has_started(&self.data)
    }

    #[inline]
    pub fn entrants(&self) -> &Entrants {
        &self.entrants
    }

    #[inline]
    pub fn data(&self) -> &BracketData {
        &self.data
    }

    pub fn view(&self) -> BracketView {
        BracketView {
            data: self.data.clone(),
            meta: self.format.meta(&self.data),
        }
    }

    /// Returns the current standings. A bracket in preview has no standings.
    pub fn current_standings(&self, include_unfinished: bool) -> Standings {
        if self.preview {
            return Standings::default();
        }

        self.format
            .standings(&self.data, &self.entrants, include_unfinished)
    }

    /// Returns the standings of all teams with at least one decided match.
    #[inline]
    pub fn standings(&self) -> Standings {
        self.current_standings(false)
    }

    pub fn is_complete(&self) -> bool {
        !self.preview && self.format.is_complete(&self.data)
    }

    pub fn team_by_id(&self, id: TeamId) -> Result<&Team> {
        self.entrants.get(id).ok_or(Error::TeamNotFound(id))
    }

    pub fn match_by_id(&self, id: Key<MatchId>) -> Result<&Match> {
        self.data
            .matches
            .iter()
            .find(|m| m.id == id)
            .ok_or(Error::MatchNotFound(id))
    }

    /// Resolves a group key to the key currently used by the bracket data. A virtual key refers
    /// to the group at that position.
    pub fn resolve_group(&self, key: Key<GroupId>) -> Result<Key<GroupId>> {
        let group = match key {
            Key::Virtual(index) => self.data.groups.get(index as usize),
            Key::Real(_) => self.data.group(key),
        };

        group.map(|group| group.id).ok_or(Error::GroupNotFound(key))
    }

    /// Creates the bracket data for `entrants` without storing it.
    pub fn preview_data(&self, entrants: &Entrants) -> Result<BracketData> {
        self.format
            .create(&self.name, entrants, &mut IdGen::virtual_ids())
    }

    pub(crate) fn start(&mut self, entrants: Entrants, maps: RoundMaps, ids: &mut IdGen) -> Result<()> {
        if !self.preview {
            return Err(Error::BracketStarted(self.idx));
        }

        let mut data = self.preview_data(&entrants)?;
        data.promote(ids);
        data.set_maps(maps);

        log::info!(
            "Starting bracket #{} ({}) with {} teams",
            self.idx,
            self.format.kind(),
            entrants.len()
        );

        self.entrants = entrants;
        self.data = data;
        self.preview = false;
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        log::info!("Resetting bracket #{}", self.idx);

        self.entrants = Entrants::new();
        self.data = BracketData::default();
        self.preview = true;
    }

    fn started(&self) -> Result<()> {
        if self.preview {
            Err(Error::BracketNotStarted(self.idx))
        } else {
            Ok(())
        }
    }

    /// Reports the map `scores` of a match. A decided set is finished and its teams move on.
    pub(crate) fn report_result(
        &mut self,
        id: Key<MatchId>,
        scores: [u32; 2],
        points: Option<[u32; 2]>,
    ) -> Result<()> {
        self.started()?;

        let index = self.data.match_index(id).ok_or(Error::MatchNotFound(id))?;
        let m = &self.data.matches[index];
        if m.is_over() {
            return Err(Error::MatchFinished(id));
        }
        if !m.is_ongoing() {
            return Err(Error::MatchNotReady(id));
        }

        let maps = self
            .data
            .maps_of(m)
            .ok_or(Error::RoundNotConfigured(m.round_id))?;

        if !is_valid_score(scores, maps) {
            return Err(Error::InvalidScore { scores, maps });
        }

        let points = points.unwrap_or_default();
        let winner = if scoring::is_set_over_by_score(scores, maps) {
            match (scores[0].cmp(&scores[1])).then(points[0].cmp(&points[1])) {
                std::cmp::Ordering::Greater => Some(0),
                std::cmp::Ordering::Less => Some(1),
                std::cmp::Ordering::Equal => return Err(Error::InvalidScore { scores, maps }),
            }
        } else {
            None
        };

        let m = &mut self.data.matches[index];
        for (spot, opponent) in m.opponents.iter_mut().enumerate() {
            if let EntrantSpot::Entrant(opponent) = opponent {
                opponent.score = scores[spot];
                opponent.points = points[spot];
                opponent.result = winner.map(|winner| {
                    if winner == spot {
                        Outcome::Win
                    } else {
                        Outcome::Loss
                    }
                });
            }
        }

        if winner.is_some() {
            log::debug!("Match {} of bracket #{} is over", id, self.idx);
            self.format.propagate(&mut self.data, index);
        }

        Ok(())
    }

    /// Removes the result of a finished match.
    pub(crate) fn reopen_match(&mut self, id: Key<MatchId>) -> Result<()> {
        self.started()?;

        let index = self.data.match_index(id).ok_or(Error::MatchNotFound(id))?;
        if !self.data.matches[index].is_over() {
            return Err(Error::MatchNotFinished(id));
        }

        let mut data = self.data.clone();
        self.format.retract(&mut data, index)?;

        for opponent in data.matches[index].opponents.iter_mut() {
            if let EntrantSpot::Entrant(opponent) = opponent {
                *opponent = Opponent::new(opponent.id);
            }
        }

        self.data = data;
        Ok(())
    }

    /// Pairs the next round of a swiss group.
    pub(crate) fn advance(&mut self, group: Key<GroupId>, ids: &mut IdGen) -> Result<()> {
        self.started()?;

        let group = self.resolve_group(group)?;
        match &self.format {
            BracketFormat::Swiss(swiss) => swiss.advance(&mut self.data, &self.entrants, group, ids),
            format => Err(Error::Unsupported(format.kind())),
        }
    }

    /// Removes the pairings of `round` and all later rounds of a swiss group.
    pub(crate) fn unadvance(&mut self, group: Key<GroupId>, round: Key<RoundId>) -> Result<()> {
        self.started()?;

        let group = self.resolve_group(group)?;
        match &self.format {
            BracketFormat::Swiss(swiss) => swiss.unadvance(&mut self.data, group, round),
            format => Err(Error::Unsupported(format.kind())),
        }
    }

    /// Marks `team` as dropped out. Returns `false` if the team is not part of the bracket.
    pub(crate) fn drop_out(&mut self, team: TeamId) -> bool {
        self.entrants.drop_out(team)
    }
}

fn is_valid_score(scores: [u32; 2], maps: RoundMaps) -> bool {
    match maps.kind {
        crate::MapCountType::BestOf => {
            let needed = (maps.count + 1) / 2;
            scores[0] <= needed && scores[1] <= needed && !(scores[0] == needed && scores[1] == needed)
        }
        crate::MapCountType::PlayAll => scores[0] + scores[1] <= maps.count,
    }
}

#[cfg(test)]
mod tests {
    use super::{Bracket, BracketFormat};
    use crate::{
        Error, IdGen, Key, MatchId, RoundMaps, SingleElimination, Swiss, System,
    };

    fn started(format: BracketFormat, n: u32) -> Bracket {
        let mut bracket = Bracket::new(0, String::from("Main"), format);
        let entrants = crate::teams![1, 2, 3, 4, 5, 6, 7, 8];
        let entrants = entrants.iter().take(n as usize).cloned().collect();
        bracket
            .start(entrants, RoundMaps::best_of(3), &mut IdGen::after([]))
            .unwrap();
        bracket
    }

    #[test]
    fn test_preview() {
        let bracket = Bracket::new(
            0,
            String::from("Main"),
            BracketFormat::SingleElimination(SingleElimination::default()),
        );

        assert!(bracket.is_preview());
        assert!(!bracket.is_complete());
        assert!(bracket.current_standings(true).is_empty());

        let data = bracket.preview_data(&crate::teams![1, 2, 3, 4]).unwrap();
        assert_eq!(data.matches.len(), 3);
        assert_eq!(data.matches[0].id, Key::Virtual(0));
    }

    #[test]
    fn test_start() {
        let bracket = started(
            BracketFormat::SingleElimination(SingleElimination::default()),
            4,
        );

        assert!(!bracket.is_preview());
        assert!(bracket.has_started());
        assert_eq!(bracket.data().matches[0].id, Key::Real(MatchId(1)));
        assert_eq!(
            bracket.data().rounds[0].maps,
            Some(RoundMaps::best_of(3))
        );
    }

    #[test]
    fn test_report_result() {
        let mut bracket = started(
            BracketFormat::SingleElimination(SingleElimination::default()),
            4,
        );
        let first = bracket.data().matches[0].id;
        let last = bracket.data().matches[2].id;

        assert_eq!(
            bracket.report_result(last, [2, 0], None),
            Err(Error::MatchNotReady(last))
        );
        assert!(matches!(
            bracket.report_result(first, [3, 0], None),
            Err(Error::InvalidScore { .. })
        ));

        bracket.report_result(first, [1, 0], None).unwrap();
        assert!(!bracket.data().matches[0].is_over());

        bracket.report_result(first, [2, 1], None).unwrap();
        assert!(bracket.data().matches[0].is_over());
        assert_eq!(
            bracket.report_result(first, [2, 0], None),
            Err(Error::MatchFinished(first))
        );
        assert_eq!(bracket.data().matches[2].team(0), Some(crate::TeamId(1)));
    }

    #[test]
    fn test_reopen_match() {
        let mut bracket = started(
            BracketFormat::SingleElimination(SingleElimination::default()),
            4,
        );
        let ids: Vec<_> = bracket.data().matches.iter().map(|m| m.id).collect();

        assert_eq!(
            bracket.reopen_match(ids[0]),
            Err(Error::MatchNotFinished(ids[0]))
        );

        bracket.report_result(ids[0], [2, 0], None).unwrap();
        bracket.report_result(ids[1], [0, 2], None).unwrap();
        bracket.reopen_match(ids[0]).unwrap();
        assert!(bracket.data().matches[2].opponents[0].is_tbd());
        assert!(bracket.data().matches[2].opponents[1].is_entrant());

        bracket.report_result(ids[0], [2, 0], None).unwrap();
        bracket.report_result(ids[2], [2, 0], None).unwrap();
        assert!(bracket.is_complete());
        assert_eq!(
            bracket.reopen_match(ids[0]),
            Err(Error::ResultPropagated(ids[2]))
        );

        bracket.reopen_match(ids[2]).unwrap();
        assert!(!bracket.is_complete());
    }

    #[test]
    fn test_advance_unsupported() {
        let mut bracket = started(
            BracketFormat::SingleElimination(SingleElimination::default()),
            4,
        );
        let group = bracket.data().groups[0].id;

        assert_eq!(
            bracket.advance(group, &mut IdGen::after([])),
            Err(Error::Unsupported(crate::BracketKind::SingleElimination))
        );
    }

    #[test]
    fn test_resolve_group() {
        let bracket = started(
            BracketFormat::Swiss(Swiss {
                group_count: 2,
                round_count: 3,
            }),
            8,
        );

        let second = bracket.data().groups[1].id;
        assert_eq!(bracket.resolve_group(Key::Virtual(1)), Ok(second));
        assert_eq!(bracket.resolve_group(second), Ok(second));
        assert!(bracket.resolve_group(Key::Virtual(2)).is_err());
        assert_eq!(bracket.format().kind(), crate::BracketKind::Swiss);
    }
}
