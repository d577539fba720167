//! Engine wide limits and defaults.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::{SWISS_GROUP_COUNT, SWISS_ROUND_COUNT, TEAMS_PER_GROUP};
use crate::RoundMaps;

/// Limits and format defaults used when validating and creating brackets.
///
/// Every field falls back to its default value when it is missing from a deserialized
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// The maximum number of brackets in a progression.
    pub max_brackets: usize,
    /// The maximum length of a bracket name in characters.
    pub bracket_name_max_length: usize,
    /// Teams per group of a round robin bracket without explicit settings.
    pub teams_per_group: u32,
    pub swiss_group_count: u32,
    pub swiss_round_count: u32,
    /// Whether single elimination brackets play a third place match by default.
    pub third_place_match: bool,
    /// The maps applied to every round when a bracket is started without explicit maps.
    pub maps: RoundMaps,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_brackets: 10,
            bracket_name_max_length: 32,
            teams_per_group: 4,
            swiss_group_count: 1,
            swiss_round_count: 5,
            third_place_match: false,
            maps: RoundMaps::best_of(3),
        }
    }
}

impl EngineConfig {
    /// Checks that every limit is usable and every format default lies within the range
    /// accepted for explicit bracket settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn within(
            key: &'static str,
            value: u32,
            (min, max): (u32, u32),
        ) -> Result<(), ConfigError> {
            if value < min || value > max {
                return Err(ConfigError::OutOfRange {
                    key,
                    value,
                    min,
                    max,
                });
            }

            Ok(())
        }

        if self.max_brackets == 0 {
            return Err(ConfigError::Zero("max_brackets"));
        }

        if self.bracket_name_max_length == 0 {
            return Err(ConfigError::Zero("bracket_name_max_length"));
        }

        if self.maps.count == 0 {
            return Err(ConfigError::Zero("maps.count"));
        }

        within("teams_per_group", self.teams_per_group, TEAMS_PER_GROUP)?;
        within("swiss_group_count", self.swiss_group_count, SWISS_GROUP_COUNT)?;
        within("swiss_round_count", self.swiss_round_count, SWISS_ROUND_COUNT)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be 0")]
    Zero(&'static str),
    #[error("{key} must be between {min} and {max}, found {value}")]
    OutOfRange {
        key: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}
