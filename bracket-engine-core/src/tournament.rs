//! # Tournament
//!
//! The [`Tournament`] owns the teams, the validated progression, one [`Bracket`] per progression
//! entry and the organizer's progression [`Override`]s. Every mutation goes through it so that
//! cross bracket rules (upstream completion, downstream brackets already started) hold.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::destination::{self, Destination, Override, Overrides};
use crate::progression::{self, BracketConfig, BracketProgression};
use crate::standings::Standings;
use crate::{
    Action, Bracket, BracketData, BracketView, EngineConfig, Entrants, Error, GroupId, IdGen, Key,
    MatchId, Result, RoundId, RoundMaps, System, Team, TeamId,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Tournament {
    config: EngineConfig,
    invitational: bool,
    progression: BracketProgression,
    teams: Vec<Team>,
    brackets: Vec<Bracket>,
    overrides: Overrides,
}

impl Tournament {
    /// Creates a new tournament with all brackets in preview.
    pub fn new(
        config: EngineConfig,
        invitational: bool,
        brackets: Vec<BracketConfig>,
        teams: Vec<Team>,
    ) -> Result<Self> {
        config.validate()?;
        let progression = progression::validate(&brackets, &config, invitational)?;

        let brackets = progression
            .iter()
            .map(|(idx, bracket)| {
                Bracket::new(
                    idx,
                    bracket.config.name.trim().to_owned(),
                    bracket
                        .config
                        .settings
                        .format(bracket.config.kind, &config),
                )
            })
            .collect();

        Ok(Self {
            config,
            invitational,
            progression,
            teams,
            brackets,
            overrides: Overrides::new(),
        })
    }

    /// Restores a tournament from a [`Snapshot`].
    pub fn resume(config: EngineConfig, snapshot: Snapshot) -> Result<Self> {
        let mut tournament = Self::new(
            config,
            snapshot.invitational,
            snapshot.progression,
            snapshot.teams,
        )?;

        for (idx, bracket) in snapshot.brackets.into_iter().enumerate() {
            if bracket.data.is_empty() {
                continue;
            }

            let entrants = bracket
                .entrants
                .iter()
                .map(|id| tournament.team(*id).cloned())
                .collect::<Result<Vec<Team>>>()?;

            tournament
                .brackets
                .get_mut(idx)
                .ok_or(Error::BracketNotFound(idx))?
                .resume(seeded(entrants), bracket.data)?;
        }

        tournament.overrides = snapshot.overrides;
        Ok(tournament)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            invitational: self.invitational,
            progression: self.progression.configs(),
            teams: self.teams.clone(),
            brackets: self
                .brackets
                .iter()
                .map(|bracket| BracketSnapshot {
                    entrants: bracket.entrants().iter().map(|team| team.id).collect(),
                    data: bracket.data().clone(),
                })
                .collect(),
            overrides: self.overrides.clone(),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn is_invitational(&self) -> bool {
        self.invitational
    }

    #[inline]
    pub fn progression(&self) -> &BracketProgression {
        &self.progression
    }

    #[inline]
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: TeamId) -> Result<&Team> {
        self.teams
            .iter()
            .find(|team| team.id == id)
            .ok_or(Error::TeamNotFound(id))
    }

    #[inline]
    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn bracket(&self, idx: usize) -> Result<&Bracket> {
        self.brackets.get(idx).ok_or(Error::BracketNotFound(idx))
    }

    fn bracket_mut(&mut self, idx: usize) -> Result<&mut Bracket> {
        self.brackets.get_mut(idx).ok_or(Error::BracketNotFound(idx))
    }

    #[inline]
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Returns the teams that enter bracket `idx`, in seeding order.
    ///
    /// A bracket with a source takes the teams whose destination from the source bracket is
    /// `idx`, ordered by their placement. The source bracket must be complete unless
    /// `prospective` is set, in which case the current standings are used. Other brackets take
    /// the teams starting in them. Dropped out teams never enter a bracket.
    fn entrants_of(&self, idx: usize, prospective: bool) -> Result<Entrants> {
        let bracket = self
            .progression
            .get(idx)
            .ok_or(Error::BracketNotFound(idx))?;

        let teams: Vec<Team> = match &bracket.source {
            Some(source) => {
                let upstream = self.bracket(source.bracket_idx)?;
                if !prospective && !upstream.is_complete() {
                    return Err(Error::BracketNotComplete(source.bracket_idx));
                }

                let standings = upstream.current_standings(prospective);

                let mut teams: Vec<&Team> = standings
                    .iter()
                    .filter_map(|standing| upstream.entrants().get(standing.team))
                    .collect();
                for team in upstream.entrants().iter() {
                    if standings.get(team.id).is_none() {
                        teams.push(team);
                    }
                }

                teams
                    .into_iter()
                    .filter(|team| {
                        destination::resolve(
                            team.id,
                            source.bracket_idx,
                            standings.placement(team.id),
                            &self.progression,
                            &self.overrides,
                        ) == Destination::Bracket(idx)
                    })
                    .filter_map(|team| self.team(team.id).ok())
                    .filter(|team| !team.dropped_out)
                    .cloned()
                    .collect()
            }
            None => {
                let mut teams: Vec<Team> = self
                    .teams
                    .iter()
                    .filter(|team| !team.dropped_out && team.starting_bracket_idx.unwrap_or(0) == idx)
                    .cloned()
                    .collect();
                teams.sort_by(Team::seed_cmp);
                teams
            }
        };

        Ok(seeded(teams))
    }

    /// Returns the data bracket `idx` would have if it was started now. The data only carries
    /// virtual ids.
    pub fn preview_bracket(&self, idx: usize) -> Result<BracketData> {
        let bracket = self.bracket(idx)?;
        if !bracket.is_preview() {
            return Err(Error::BracketStarted(idx));
        }

        bracket.preview_data(&self.entrants_of(idx, true)?)
    }

    /// Starts bracket `idx`, using `maps` for every round or the configured default.
    pub fn start_bracket(&mut self, idx: usize, maps: Option<RoundMaps>) -> Result<()> {
        if !self.bracket(idx)?.is_preview() {
            return Err(Error::BracketStarted(idx));
        }

        let entrants = self.entrants_of(idx, false)?;
        let maps = maps.unwrap_or(self.config.maps);
        let mut ids = self.ids();

        self.bracket_mut(idx)?.start(entrants, maps, &mut ids)
    }

    pub fn report_result(
        &mut self,
        idx: usize,
        id: Key<MatchId>,
        scores: [u32; 2],
        points: Option<[u32; 2]>,
    ) -> Result<()> {
        self.downstream_in_preview(idx)?;
        self.bracket_mut(idx)?.report_result(id, scores, points)
    }

    pub fn reopen_match(&mut self, idx: usize, id: Key<MatchId>) -> Result<()> {
        self.downstream_in_preview(idx)?;
        self.bracket_mut(idx)?.reopen_match(id)
    }

    /// Pairs the next round of a swiss group.
    pub fn advance(&mut self, idx: usize, group: Key<GroupId>) -> Result<()> {
        let mut ids = self.ids();
        self.bracket_mut(idx)?.advance(group, &mut ids)
    }

    /// Removes `round` and all later rounds of a swiss group.
    pub fn unadvance(&mut self, idx: usize, group: Key<GroupId>, round: Key<RoundId>) -> Result<()> {
        self.bracket_mut(idx)?.unadvance(group, round)
    }

    /// Sends a team to a specific destination after its source bracket, regardless of its
    /// placement. Replaces an existing override for the same team and source bracket.
    pub fn override_progression(&mut self, o: Override) -> Result<()> {
        let source = self.bracket(o.source_bracket_idx)?;
        self.team(o.tournament_team_id)?;

        if !source.is_complete() {
            return Err(Error::BracketNotComplete(o.source_bracket_idx));
        }

        if !source.entrants().contains(o.tournament_team_id) {
            return Err(Error::TeamNotFound(o.tournament_team_id));
        }

        if let Destination::Bracket(destination) = o.destination {
            let destinations =
                destination::destinations_from_bracket_idx(o.source_bracket_idx, &self.progression);

            if !destinations.contains(&destination) {
                return Err(Error::InvalidDestination {
                    from: o.source_bracket_idx,
                    destination,
                });
            }
        }

        // The team must not have entered a bracket it is moved away from.
        let current = self.destination(o.tournament_team_id, o.source_bracket_idx)?;
        for destination in [current, Some(o.destination)].into_iter().flatten() {
            if let Destination::Bracket(idx) = destination {
                if !self.bracket(idx)?.is_preview() {
                    return Err(Error::BracketStarted(idx));
                }
            }
        }

        log::info!(
            "Overriding progression of team {} from bracket #{} to {:?}",
            o.tournament_team_id,
            o.source_bracket_idx,
            o.destination
        );

        self.overrides = self.overrides.with(o);
        Ok(())
    }

    /// Removes the override of `team` for bracket `source_bracket_idx`. Does nothing if there is
    /// none.
    pub fn clear_override(&mut self, team: TeamId, source_bracket_idx: usize) -> Result<()> {
        self.bracket(source_bracket_idx)?;

        let o = match self.overrides.get(team, source_bracket_idx) {
            Some(o) => *o,
            None => {
                log::debug!(
                    "No progression override of team {} from bracket #{}",
                    team,
                    source_bracket_idx
                );
                return Ok(());
            }
        };

        if let Destination::Bracket(idx) = o.destination {
            if !self.bracket(idx)?.is_preview() {
                return Err(Error::BracketStarted(idx));
            }
        }

        log::info!(
            "Clearing progression override of team {} from bracket #{}",
            team,
            source_bracket_idx
        );

        self.overrides = self.overrides.without(team, source_bracket_idx);
        Ok(())
    }

    /// Moves bracket `idx` back into preview. All progression overrides with bracket `idx` as
    /// source are invalidated and returned.
    pub fn reset_bracket(&mut self, idx: usize) -> Result<Vec<Override>> {
        self.bracket(idx)?;
        self.downstream_in_preview(idx)?;

        self.bracket_mut(idx)?.reset();

        let (overrides, removed) = self.overrides.without_source(idx);
        for o in &removed {
            log::info!(
                "Invalidated progression override of team {} from bracket #{}",
                o.tournament_team_id,
                o.source_bracket_idx
            );
        }

        self.overrides = overrides;
        Ok(removed)
    }

    /// Marks `team` as dropped out of the tournament and of every bracket it plays in.
    pub fn drop_team_out(&mut self, team: TeamId) -> Result<()> {
        let entry = self
            .teams
            .iter_mut()
            .find(|entry| entry.id == team)
            .ok_or(Error::TeamNotFound(team))?;
        entry.dropped_out = true;

        let brackets = self
            .brackets
            .iter_mut()
            .map(|bracket| bracket.drop_out(team))
            .filter(|dropped| *dropped)
            .count();

        log::info!("Team {} dropped out, playing in {} brackets", team, brackets);
        Ok(())
    }

    /// Returns where `team` goes after bracket `source_bracket_idx`. An override is always
    /// returned. Otherwise the destination is `None` until the bracket is complete.
    pub fn destination(&self, team: TeamId, source_bracket_idx: usize) -> Result<Option<Destination>> {
        let bracket = self.bracket(source_bracket_idx)?;
        self.team(team)?;

        if let Some(o) = self.overrides.get(team, source_bracket_idx) {
            return Ok(Some(o.destination));
        }

        if !bracket.is_complete() {
            return Ok(None);
        }

        if !bracket.entrants().contains(team) {
            return Err(Error::TeamNotFound(team));
        }

        Ok(Some(destination::resolve(
            team,
            source_bracket_idx,
            bracket.standings().placement(team),
            &self.progression,
            &self.overrides,
        )))
    }

    /// Returns the read view of bracket `idx`. A bracket in preview shows its prospective data
    /// while enough teams are known, and no data otherwise.
    pub fn bracket_view(&self, idx: usize) -> Result<BracketView> {
        let bracket = self.bracket(idx)?;
        let mut view = bracket.view();

        if bracket.is_preview() {
            view.data = self.preview_bracket(idx).unwrap_or_default();
            view.meta = bracket.format().meta(&view.data);
        }

        Ok(view)
    }

    pub fn standings(&self, idx: usize, include_unfinished: bool) -> Result<Standings> {
        Ok(self.bracket(idx)?.current_standings(include_unfinished))
    }

    /// Returns `true` if every bracket was started and is complete.
    pub fn all_brackets_over(&self) -> bool {
        self.brackets.iter().all(Bracket::is_complete)
    }

    pub fn apply(&mut self, action: Action) -> Result<()> {
        log::debug!("Applying {:?}", action);

        match action {
            Action::StartBracket { bracket_idx, maps } => self.start_bracket(bracket_idx, maps),
            Action::ReportScore {
                bracket_idx,
                match_id,
                scores,
                points,
            } => self.report_result(bracket_idx, match_id, scores, points),
            Action::ReopenMatch {
                bracket_idx,
                match_id,
            } => self.reopen_match(bracket_idx, match_id),
            Action::AdvanceBracket {
                bracket_idx,
                group_id,
            } => self.advance(bracket_idx, group_id),
            Action::UnadvanceBracket {
                bracket_idx,
                group_id,
                round_id,
            } => self.unadvance(bracket_idx, group_id, round_id),
            Action::OverrideBracketProgression(o) => self.override_progression(o),
            Action::ClearBracketProgressionOverride {
                tournament_team_id,
                source_bracket_idx,
            } => self.clear_override(tournament_team_id, source_bracket_idx),
            Action::ResetBracket { bracket_idx } => self.reset_bracket(bracket_idx).map(|_| ()),
            Action::DropTeamOut { tournament_team_id } => self.drop_team_out(tournament_team_id),
        }
    }

    /// Fails if a bracket fed by bracket `idx` was already started.
    fn downstream_in_preview(&self, idx: usize) -> Result<()> {
        let started = destination::destinations_from_bracket_idx(idx, &self.progression)
            .into_iter()
            .find(|destination| {
                self.brackets
                    .get(*destination)
                    .map_or(false, |bracket| !bracket.is_preview())
            });

        match started {
            Some(destination) => {
                log::warn!(
                    "Rejecting change to bracket #{}, bracket #{} was already started",
                    idx,
                    destination
                );
                Err(Error::DownstreamStarted(idx))
            }
            None => Ok(()),
        }
    }

    fn ids(&self) -> IdGen {
        IdGen::after(self.brackets.iter().map(Bracket::data))
    }
}

/// Replaces the seeds of `teams` with their position.
fn seeded(teams: Vec<Team>) -> Entrants {
    teams
        .into_iter()
        .enumerate()
        .map(|(index, team)| Team {
            seed: Some(index as u32 + 1),
            ..team
        })
        .collect()
}

/// The persisted state of a [`Tournament`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Snapshot {
    #[cfg_attr(feature = "serde", serde(default))]
    pub invitational: bool,
    pub progression: Vec<BracketConfig>,
    pub teams: Vec<Team>,
    /// One entry per bracket. Missing entries and entries without data are in preview.
    #[cfg_attr(feature = "serde", serde(default))]
    pub brackets: Vec<BracketSnapshot>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overrides: Overrides,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketSnapshot {
    /// The team ids in seeding order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub entrants: Vec<TeamId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: BracketData,
}
