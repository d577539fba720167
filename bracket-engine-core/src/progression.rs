//! # Bracket Progression
//!
//! A tournament is an ordered list of brackets. Every bracket except the first one may name a
//! single [`Source`]: an earlier bracket and the placements of that bracket whose teams move on.
//! [`validate`] checks a list of [`BracketConfig`]s and turns it into a [`BracketProgression`].
mod placements;

pub use placements::{ParseError, Placements, MAX_PLACEMENT};

use std::collections::HashMap;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BracketKind, BracketSettings, EngineConfig};

/// The definition of a bracket as configured by the organizer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BracketConfig {
    /// An opaque identifier, referenced by the sources of later brackets.
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: BracketKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub requires_check_in: bool,
    /// Unix timestamp in seconds.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub start_time: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub settings: BracketSettings,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub sources: Option<Vec<Source>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Source {
    pub bracket_id: String,
    /// A placements expression, e.g. `"1-4"`. See [`Placements`].
    pub placements: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum ValidationError {
    #[error("no brackets given")]
    NoBrackets,
    #[error("Bracket #{} has more than one source", .bracket_idx + 1)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    TooManySources { bracket_idx: usize },
    #[error("Bracket #{} refers to an unknown bracket", .bracket_idx + 1)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    UnknownSource { bracket_idx: usize },
    #[error("Bracket #{} refers to itself or a later bracket", .bracket_idx + 1)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    CyclicOrForwardReference { bracket_idx: usize },
    #[error("Bracket #{} has no source", .bracket_idx + 1)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    MissingSource { bracket_idx: usize },
    #[error("brackets {} share the same id", display_idxs(.bracket_idxs))]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    DuplicateId { bracket_idxs: Vec<usize> },
    #[error("Bracket #{} has invalid placements: {}", .bracket_idx + 1, .reason)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    InvalidPlacementFormat {
        bracket_idx: usize,
        #[cfg_attr(feature = "serde", serde(skip))]
        reason: ParseError,
    },
    #[error("brackets {} take the same placements", display_idxs(.bracket_idxs))]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    DuplicatePlacement { bracket_idxs: Vec<usize> },
    #[error("Bracket #{} has no name", .bracket_idx + 1)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    NameMissing { bracket_idx: usize },
    #[error("Bracket #{} has a name longer than {} characters", .bracket_idx + 1, .max)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    NameTooLong { bracket_idx: usize, max: usize },
    #[error("brackets {} share the same name", display_idxs(.bracket_idxs))]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    DuplicateName { bracket_idxs: Vec<usize> },
    #[error("Bracket #{} has invalid settings", .bracket_idx + 1)]
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    InvalidSettings { bracket_idx: usize },
    #[error("at most {max} brackets are allowed")]
    TooManyBrackets { max: usize },
}

impl ValidationError {
    /// Returns the indices of all brackets this error refers to.
    pub fn bracket_idxs(&self) -> Vec<usize> {
        match self {
            Self::NoBrackets | Self::TooManyBrackets { .. } => Vec::new(),
            Self::TooManySources { bracket_idx }
            | Self::UnknownSource { bracket_idx }
            | Self::CyclicOrForwardReference { bracket_idx }
            | Self::MissingSource { bracket_idx }
            | Self::InvalidPlacementFormat { bracket_idx, .. }
            | Self::NameMissing { bracket_idx }
            | Self::NameTooLong { bracket_idx, .. }
            | Self::InvalidSettings { bracket_idx } => vec![*bracket_idx],
            Self::DuplicateId { bracket_idxs }
            | Self::DuplicatePlacement { bracket_idxs }
            | Self::DuplicateName { bracket_idxs } => bracket_idxs.clone(),
        }
    }
}

fn display_idxs(idxs: &[usize]) -> String {
    idxs.iter()
        .map(|idx| format!("#{}", idx + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A validated [`Source`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSource {
    pub bracket_idx: usize,
    pub placements: Placements,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressionBracket {
    pub config: BracketConfig,
    pub source: Option<ResolvedSource>,
}

/// A validated, index-stable list of brackets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BracketProgression {
    brackets: Vec<ProgressionBracket>,
}

impl BracketProgression {
    #[inline]
    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&ProgressionBracket> {
        self.brackets.get(idx)
    }

    /// Returns an iterator over all brackets with their index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ProgressionBracket)> + '_ {
        self.brackets.iter().enumerate()
    }

    /// Returns the bracket configs in their original form.
    pub fn configs(&self) -> Vec<BracketConfig> {
        self.brackets.iter().map(|b| b.config.clone()).collect()
    }
}

/// Validates `brackets`, returning the first error in precedence order.
///
/// Brackets without a source outside of the first one are only accepted in `invitational`
/// tournaments, where teams can start in any bracket.
pub fn validate(
    brackets: &[BracketConfig],
    config: &EngineConfig,
    invitational: bool,
) -> Result<BracketProgression, ValidationError> {
    validate_all(brackets, config, invitational).map_err(|mut errors| errors.remove(0))
}

/// Validates `brackets`, returning every error found in precedence order. The returned `Vec` is
/// never empty.
pub fn validate_all(
    brackets: &[BracketConfig],
    config: &EngineConfig,
    invitational: bool,
) -> Result<BracketProgression, Vec<ValidationError>> {
    if brackets.is_empty() {
        return Err(vec![ValidationError::NoBrackets]);
    }

    let mut errors = Vec::new();

    let mut ids: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, bracket) in brackets.iter().enumerate() {
        ids.entry(bracket.id.as_str()).or_default().push(idx);
    }

    let mut duplicate_ids: Vec<Vec<usize>> =
        ids.values().filter(|idxs| idxs.len() > 1).cloned().collect();
    duplicate_ids.sort();
    errors.extend(
        duplicate_ids
            .into_iter()
            .map(|bracket_idxs| ValidationError::DuplicateId { bracket_idxs }),
    );

    // Upstream bracket index for every bracket with a valid source reference.
    let mut upstream: Vec<Option<usize>> = vec![None; brackets.len()];
    for (idx, bracket) in brackets.iter().enumerate() {
        let sources = bracket.sources.as_deref().unwrap_or_default();

        match sources {
            [] if idx > 0 && !invitational => {
                errors.push(ValidationError::MissingSource { bracket_idx: idx });
            }
            [] => (),
            [_, _, ..] => {
                errors.push(ValidationError::TooManySources { bracket_idx: idx });
            }
            [source] => match ids.get(source.bracket_id.as_str()) {
                None => errors.push(ValidationError::UnknownSource { bracket_idx: idx }),
                Some(idxs) if idxs[0] >= idx => {
                    errors.push(ValidationError::CyclicOrForwardReference { bracket_idx: idx });
                }
                Some(idxs) => upstream[idx] = Some(idxs[0]),
            },
        }
    }

    let mut placements: Vec<Option<Placements>> = vec![None; brackets.len()];
    for (idx, bracket) in brackets.iter().enumerate() {
        let source = match bracket.sources.as_deref() {
            Some([source]) => source,
            _ => continue,
        };

        match source.placements.parse::<Placements>() {
            Ok(value) => placements[idx] = Some(value),
            Err(reason) => errors.push(ValidationError::InvalidPlacementFormat {
                bracket_idx: idx,
                reason,
            }),
        }
    }

    for a in 0..brackets.len() {
        for b in a + 1..brackets.len() {
            if upstream[a].is_none() || upstream[a] != upstream[b] {
                continue;
            }

            if let (Some(lhs), Some(rhs)) = (&placements[a], &placements[b]) {
                if !lhs.is_disjoint(rhs) {
                    errors.push(ValidationError::DuplicatePlacement {
                        bracket_idxs: vec![a, b],
                    });
                }
            }
        }
    }

    let mut names: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, bracket) in brackets.iter().enumerate() {
        let name = bracket.name.trim();

        if name.is_empty() {
            errors.push(ValidationError::NameMissing { bracket_idx: idx });
        } else if name.chars().count() > config.bracket_name_max_length {
            errors.push(ValidationError::NameTooLong {
                bracket_idx: idx,
                max: config.bracket_name_max_length,
            });
        } else {
            names.entry(name).or_default().push(idx);
        }
    }

    let mut duplicate_names: Vec<Vec<usize>> = names
        .into_values()
        .filter(|idxs| idxs.len() > 1)
        .collect();
    duplicate_names.sort();
    errors.extend(
        duplicate_names
            .into_iter()
            .map(|bracket_idxs| ValidationError::DuplicateName { bracket_idxs }),
    );

    for (idx, bracket) in brackets.iter().enumerate() {
        if !bracket.settings.is_valid(bracket.kind) {
            errors.push(ValidationError::InvalidSettings { bracket_idx: idx });
        }
    }

    if brackets.len() > config.max_brackets {
        errors.push(ValidationError::TooManyBrackets {
            max: config.max_brackets,
        });
    }

    if !errors.is_empty() {
        log::debug!("Bracket progression rejected with {} errors", errors.len());
        return Err(errors);
    }

    let brackets = brackets
        .iter()
        .zip(upstream.into_iter().zip(placements))
        .map(|(config, source)| ProgressionBracket {
            config: config.clone(),
            source: match source {
                (Some(bracket_idx), Some(placements)) => Some(ResolvedSource {
                    bracket_idx,
                    placements,
                }),
                _ => None,
            },
        })
        .collect();

    Ok(BracketProgression { brackets })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{validate, validate_all, BracketConfig, Source, ValidationError};
    use crate::{BracketKind, BracketSettings, EngineConfig};

    pub(crate) fn bracket(id: &str, kind: BracketKind, source: Option<(&str, &str)>) -> BracketConfig {
        BracketConfig {
            id: id.to_owned(),
            name: format!("Bracket {}", id),
            kind,
            requires_check_in: false,
            start_time: None,
            settings: BracketSettings::default(),
            sources: source.map(|(bracket_id, placements)| {
                vec![Source {
                    bracket_id: bracket_id.to_owned(),
                    placements: placements.to_owned(),
                }]
            }),
        }
    }

    /// A swiss qualifier feeding an upper and a lower single elimination bracket.
    pub(crate) fn qualifier() -> Vec<BracketConfig> {
        vec![
            bracket("a", BracketKind::Swiss, None),
            bracket("b", BracketKind::SingleElimination, Some(("a", "1-4"))),
            bracket("c", BracketKind::SingleElimination, Some(("a", "5-8"))),
        ]
    }

    #[test]
    fn test_validate() {
        let progression = validate(&qualifier(), &EngineConfig::default(), false).unwrap();
        assert_eq!(progression.len(), 3);

        let source = progression.get(2).unwrap().source.as_ref().unwrap();
        assert_eq!(source.bracket_idx, 0);
        assert!(source.placements.contains(5));
        assert!(progression.get(0).unwrap().source.is_none());
    }

    #[test]
    fn test_validate_empty() {
        assert_eq!(
            validate(&[], &EngineConfig::default(), false),
            Err(ValidationError::NoBrackets)
        );
    }

    #[test]
    fn test_validate_sources() {
        let config = EngineConfig::default();

        let brackets = vec![
            bracket("a", BracketKind::Swiss, Some(("b", "1"))),
            bracket("b", BracketKind::SingleElimination, Some(("a", "1-4"))),
        ];
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::CyclicOrForwardReference { bracket_idx: 0 })
        );

        let brackets = vec![
            bracket("a", BracketKind::Swiss, None),
            bracket("b", BracketKind::SingleElimination, Some(("b", "1-4"))),
        ];
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::CyclicOrForwardReference { bracket_idx: 1 })
        );

        let brackets = vec![
            bracket("a", BracketKind::Swiss, None),
            bracket("b", BracketKind::SingleElimination, Some(("x", "1-4"))),
        ];
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::UnknownSource { bracket_idx: 1 })
        );

        let brackets = vec![
            bracket("a", BracketKind::Swiss, None),
            bracket("b", BracketKind::SingleElimination, None),
        ];
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::MissingSource { bracket_idx: 1 })
        );
        assert!(validate(&brackets, &config, true).is_ok());

        let mut brackets = qualifier();
        brackets[1].sources.as_mut().unwrap().push(Source {
            bracket_id: String::from("a"),
            placements: String::from("9"),
        });
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::TooManySources { bracket_idx: 1 })
        );
    }

    #[test]
    fn test_validate_placements() {
        let config = EngineConfig::default();

        let mut brackets = qualifier();
        brackets[2].sources.as_mut().unwrap()[0].placements = String::from("4-1");
        assert!(matches!(
            validate(&brackets, &config, false),
            Err(ValidationError::InvalidPlacementFormat { bracket_idx: 2, .. })
        ));

        let mut brackets = qualifier();
        brackets[2].sources.as_mut().unwrap()[0].placements = String::from("4-8");
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::DuplicatePlacement {
                bracket_idxs: vec![1, 2]
            })
        );

        // Overlapping placements from different upstream brackets are fine.
        let brackets = vec![
            bracket("a", BracketKind::Swiss, None),
            bracket("b", BracketKind::SingleElimination, Some(("a", "1-4"))),
            bracket("c", BracketKind::SingleElimination, Some(("b", "1-4"))),
        ];
        assert!(validate(&brackets, &config, false).is_ok());
    }

    #[test]
    fn test_validate_names() {
        let config = EngineConfig::default();

        let mut brackets = qualifier();
        brackets[1].name = String::from("  ");
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::NameMissing { bracket_idx: 1 })
        );

        let mut brackets = qualifier();
        brackets[0].name = "x".repeat(33);
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::NameTooLong {
                bracket_idx: 0,
                max: 32
            })
        );

        let mut brackets = qualifier();
        brackets[0].name = String::from("Playoffs");
        brackets[2].name = String::from("Playoffs");
        assert_eq!(
            validate(&brackets, &config, false),
            Err(ValidationError::DuplicateName {
                bracket_idxs: vec![0, 2]
            })
        );
    }

    #[test]
    fn test_validate_count() {
        let config = EngineConfig {
            max_brackets: 2,
            ..Default::default()
        };

        assert_eq!(
            validate(&qualifier(), &config, false),
            Err(ValidationError::TooManyBrackets { max: 2 })
        );
    }

    #[test]
    fn test_validate_precedence() {
        let config = EngineConfig {
            max_brackets: 2,
            ..Default::default()
        };

        let mut brackets = qualifier();
        brackets[1].name = String::new();
        brackets[2].sources.as_mut().unwrap()[0].placements = String::from("1");

        let errors = validate_all(&brackets, &config, false).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicatePlacement {
                    bracket_idxs: vec![1, 2]
                },
                ValidationError::NameMissing { bracket_idx: 1 },
                ValidationError::TooManyBrackets { max: 2 },
            ]
        );
        assert_eq!(errors[0].bracket_idxs(), vec![1, 2]);
        assert_eq!(
            errors[1].to_string(),
            "Bracket #2 has no name".to_owned()
        );
    }
}
