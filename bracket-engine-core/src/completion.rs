//! Completion checks on raw bracket data.
use std::collections::HashSet;

use crate::{BracketData, Match};

/// Returns `true` if every match has a winner.
///
/// Byes are skipped. An empty list is never over. Matches of a double elimination bracket (the
/// only data with exactly three distinct groups) end with the grand final reset match, which is
/// skipped when the grand final was won by the first opponent, the winner of the winners
/// bracket.
pub fn every_match_is_over(matches: &[Match]) -> bool {
    if matches.is_empty() {
        return false;
    }

    let groups: HashSet<_> = matches.iter().map(|m| m.group_id).collect();
    let is_double_elimination = groups.len() == 3;

    let mut last_winner = None;
    for (index, m) in matches.iter().enumerate() {
        let is_last = index == matches.len() - 1;
        if is_last && is_double_elimination && last_winner == Some(0) {
            continue;
        }

        if m.is_bye() {
            continue;
        }

        match m.winner() {
            Some(winner) => last_winner = Some(winner),
            None => return false,
        }
    }

    true
}

/// Returns `true` if the bracket was started, i.e. its data carries persisted ids.
pub fn bracket_has_started(data: &BracketData) -> bool {
    data.stages.first().map_or(false, |stage| stage.id.is_real())
}

/// Returns `true` if every stage of every bracket has all its matches over. See
/// [`every_match_is_over`].
pub fn all_brackets_over<'a, I>(brackets: I) -> bool
where
    I: IntoIterator<Item = &'a BracketData>,
{
    brackets.into_iter().all(|data| {
        !data.stages.is_empty()
            && data.stages.iter().all(|stage| {
                let matches: Vec<Match> = data
                    .matches
                    .iter()
                    .filter(|m| m.stage_id == stage.id)
                    .cloned()
                    .collect();

                every_match_is_over(&matches)
            })
    })
}
