#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::destination::Override;
use crate::{GroupId, Key, MatchId, RoundId, RoundMaps, TeamId};

/// A command mutating a [`Tournament`].
///
/// [`Tournament`]: crate::Tournament
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "_action", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum Action {
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    StartBracket {
        bracket_idx: usize,
        /// The maps of every round. Uses the configured default if missing.
        #[cfg_attr(feature = "serde", serde(default))]
        maps: Option<RoundMaps>,
    },
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    ReportScore {
        bracket_idx: usize,
        match_id: Key<MatchId>,
        scores: [u32; 2],
        #[cfg_attr(feature = "serde", serde(default))]
        points: Option<[u32; 2]>,
    },
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    ReopenMatch {
        bracket_idx: usize,
        match_id: Key<MatchId>,
    },
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    AdvanceBracket {
        bracket_idx: usize,
        group_id: Key<GroupId>,
    },
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    UnadvanceBracket {
        bracket_idx: usize,
        group_id: Key<GroupId>,
        round_id: Key<RoundId>,
    },
    OverrideBracketProgression(Override),
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    ClearBracketProgressionOverride {
        tournament_team_id: TeamId,
        source_bracket_idx: usize,
    },
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    ResetBracket { bracket_idx: usize },
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    DropTeamOut { tournament_team_id: TeamId },
}

impl Action {
    /// Returns the bracket the action targets. Progression overrides target their source
    /// bracket, dropping a team out targets no single bracket.
    pub fn bracket_idx(&self) -> Option<usize> {
        match self {
            Self::StartBracket { bracket_idx, .. }
            | Self::ReportScore { bracket_idx, .. }
            | Self::ReopenMatch { bracket_idx, .. }
            | Self::AdvanceBracket { bracket_idx, .. }
            | Self::UnadvanceBracket { bracket_idx, .. }
            | Self::ResetBracket { bracket_idx } => Some(*bracket_idx),
            Self::OverrideBracketProgression(o) => Some(o.source_bracket_idx),
            Self::ClearBracketProgressionOverride {
                source_bracket_idx, ..
            } => Some(*source_bracket_idx),
            Self::DropTeamOut { .. } => None,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use serde_test::{assert_de_tokens, assert_tokens, Token};

    use super::Action;
    use crate::destination::{Destination, Override};
    use crate::{GroupId, Key, TeamId};

    #[test]
    fn test_action_serde() {
        let action = Action::ResetBracket { bracket_idx: 2 };
        assert_tokens(
            &action,
            &[
                Token::Struct {
                    name: "Action",
                    len: 2,
                },
                Token::Str("_action"),
                Token::Str("RESET_BRACKET"),
                Token::Str("bracketIdx"),
                Token::U64(2),
                Token::StructEnd,
            ],
        );

        let action = Action::AdvanceBracket {
            bracket_idx: 0,
            group_id: Key::Real(GroupId(5)),
        };
        assert_de_tokens(
            &action,
            &[
                Token::Map { len: None },
                Token::Str("_action"),
                Token::Str("ADVANCE_BRACKET"),
                Token::Str("bracketIdx"),
                Token::U64(0),
                Token::Str("groupId"),
                Token::U32(5),
                Token::MapEnd,
            ],
        );

        let action = Action::OverrideBracketProgression(Override {
            tournament_team_id: TeamId(3),
            source_bracket_idx: 0,
            destination: Destination::Eliminated,
        });
        assert_de_tokens(
            &action,
            &[
                Token::Map { len: None },
                Token::Str("_action"),
                Token::Str("OVERRIDE_BRACKET_PROGRESSION"),
                Token::Str("tournamentTeamId"),
                Token::U32(3),
                Token::Str("sourceBracketIdx"),
                Token::U64(0),
                Token::Str("destinationBracketIdx"),
                Token::I64(-1),
                Token::MapEnd,
            ],
        );
        assert_eq!(action.bracket_idx(), Some(0));
    }
}
