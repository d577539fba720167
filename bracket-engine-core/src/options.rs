//! # Bracket Options
//!
//! Some bracket formats accept additional and/or optional configuration that changes the
//! behavoir of the format. An example would be including a match for the third place in a
//! single elimination bracket, or defining the rounds played in a swiss bracket.
//!
//! [`BracketSettings`] carries these values as they were configured by the organizer. Missing
//! values are filled in from the [`EngineConfig`] when the settings are turned into a
//! [`BracketFormat`].
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    BracketFormat, DoubleElimination, EngineConfig, RoundRobin, SingleElimination, Swiss,
};

/// The accepted range of teams per round robin group.
pub const TEAMS_PER_GROUP: (u32, u32) = (2, 64);
/// The accepted range of swiss groups.
pub const SWISS_GROUP_COUNT: (u32, u32) = (1, 64);
/// The accepted range of swiss rounds.
pub const SWISS_ROUND_COUNT: (u32, u32) = (1, 64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BracketKind {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
}

impl Display for BracketKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::SingleElimination => "single elimination",
            Self::DoubleElimination => "double elimination",
            Self::RoundRobin => "round robin",
            Self::Swiss => "swiss",
        })
    }
}

/// Format specific settings of a bracket. Only the settings relevant for the bracket's
/// [`BracketKind`] are read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct BracketSettings {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub third_place_match: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub teams_per_group: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub group_count: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub round_count: Option<u32>,
}

impl BracketSettings {
    /// Returns `true` if every setting relevant for `kind` is within its accepted range.
    pub fn is_valid(&self, kind: BracketKind) -> bool {
        fn within(value: Option<u32>, (min, max): (u32, u32)) -> bool {
            value.map_or(true, |value| value >= min && value <= max)
        }

        match kind {
            BracketKind::SingleElimination | BracketKind::DoubleElimination => true,
            BracketKind::RoundRobin => within(self.teams_per_group, TEAMS_PER_GROUP),
            BracketKind::Swiss => {
                within(self.group_count, SWISS_GROUP_COUNT)
                    && within(self.round_count, SWISS_ROUND_COUNT)
            }
        }
    }

    /// Resolves the settings into a [`BracketFormat`], filling in missing values from `config`.
    pub fn format(&self, kind: BracketKind, config: &EngineConfig) -> BracketFormat {
        match kind {
            BracketKind::SingleElimination => BracketFormat::SingleElimination(SingleElimination {
                third_place_match: self.third_place_match.unwrap_or(config.third_place_match),
            }),
            BracketKind::DoubleElimination => BracketFormat::DoubleElimination(DoubleElimination),
            BracketKind::RoundRobin => BracketFormat::RoundRobin(RoundRobin {
                teams_per_group: self.teams_per_group.unwrap_or(config.teams_per_group),
            }),
            BracketKind::Swiss => BracketFormat::Swiss(Swiss {
                group_count: self.group_count.unwrap_or(config.swiss_group_count),
                round_count: self.round_count.unwrap_or(config.swiss_round_count),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BracketKind, BracketSettings};
    use crate::{BracketFormat, EngineConfig, RoundRobin, SingleElimination, Swiss};

    #[test]
    fn test_format_defaults() {
        let config = EngineConfig::default();
        let settings = BracketSettings::default();

        assert_eq!(
            settings.format(BracketKind::SingleElimination, &config),
            BracketFormat::SingleElimination(SingleElimination {
                third_place_match: false
            })
        );
        assert_eq!(
            settings.format(BracketKind::Swiss, &config),
            BracketFormat::Swiss(Swiss {
                group_count: 1,
                round_count: 5
            })
        );
    }

    #[test]
    fn test_format_explicit() {
        let config = EngineConfig::default();
        let settings = BracketSettings {
            teams_per_group: Some(3),
            ..Default::default()
        };

        assert_eq!(
            settings.format(BracketKind::RoundRobin, &config),
            BracketFormat::RoundRobin(RoundRobin { teams_per_group: 3 })
        );
    }

    #[test]
    fn test_is_valid() {
        let settings = BracketSettings {
            teams_per_group: Some(1),
            round_count: Some(0),
            ..Default::default()
        };

        assert!(!settings.is_valid(BracketKind::RoundRobin));
        assert!(!settings.is_valid(BracketKind::Swiss));
        assert!(settings.is_valid(BracketKind::SingleElimination));
    }
}
