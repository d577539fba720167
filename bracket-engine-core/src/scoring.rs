//! Set scoring rules.
use crate::{MapCountType, RoundMaps, Team, TeamId};

/// Returns `true` if a set with the map `scores` is decided under `maps`.
///
/// A [`MapCountType::PlayAll`] set is over once all maps have been played, a
/// [`MapCountType::BestOf`] set once a team won the majority of the maps.
pub fn is_set_over_by_score(scores: [u32; 2], maps: RoundMaps) -> bool {
    match maps.kind {
        MapCountType::PlayAll => scores[0] + scores[1] == maps.count,
        MapCountType::BestOf => {
            let needed = majority(maps.count);
            scores[0] == needed || scores[1] == needed
        }
    }
}

/// Returns `true` if a set is decided by the map `winners` played so far. Every entry is the
/// winner of a single map.
pub fn is_set_over_by_results(winners: &[TeamId], maps: RoundMaps) -> bool {
    match maps.kind {
        MapCountType::PlayAll => winners.len() as u32 == maps.count,
        MapCountType::BestOf => {
            let needed = majority(maps.count);
            winners
                .iter()
                .any(|team| winners.iter().filter(|w| *w == team).count() as u32 >= needed)
        }
    }
}

/// Returns the number of maps that are certainly played in a best of `count` set with the
/// current `scores`.
pub fn map_count_played_with_certainty(count: u32, scores: [u32; 2]) -> u32 {
    let played = scores[0] + scores[1];
    let leader = scores[0].max(scores[1]);
    played + majority(count).saturating_sub(leader)
}

/// Returns the number of maps won by a team receiving a bye.
pub fn bye_map_wins(maps: Option<RoundMaps>) -> u32 {
    maps.map_or(0, |maps| majority(maps.count))
}

/// Returns the team hosting a set between `teams`.
///
/// A team that prefers not to host never hosts against a team that does not mind. Otherwise the
/// better seeded team hosts.
pub fn resolve_hosting_team<'a>(teams: [&'a Team; 2]) -> &'a Team {
    let [a, b] = teams;

    match (a.prefers_not_to_host, b.prefers_not_to_host) {
        (true, false) => b,
        (false, true) => a,
        _ => {
            if b.seed_cmp(a).is_lt() {
                b
            } else {
                a
            }
        }
    }
}

#[inline]
fn majority(count: u32) -> u32 {
    (count + 1) / 2
}
