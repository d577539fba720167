//! serde impls for types with a wire format differing from their layout.
use std::fmt::{self, Formatter};
use std::marker::PhantomData;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    EntrantSpot, GroupId, Key, Match, MatchId, Opponent, Outcome, RoundId, StageId, TeamId,
};

const VIRTUAL: &str = "virtual";

/// A real key is encoded as the plain id, a virtual key as `{ "virtual": n }`.
impl<T> Serialize for Key<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Real(id) => id.serialize(serializer),
            Self::Virtual(index) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(VIRTUAL, index)?;
                map.end()
            }
        }
    }
}

impl<'de, T> Deserialize<'de> for Key<T>
where
    T: From<u32>,
{
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(KeyVisitor(PhantomData))
    }
}

struct KeyVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for KeyVisitor<T>
where
    T: From<u32>,
{
    type Value = Key<T>;

    #[inline]
    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("an id or a virtual id")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u32::try_from(v)
            .map(|id| Key::Real(T::from(id)))
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u32::try_from(v)
            .map(|id| Key::Real(T::from(id)))
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut index = None;
        while let Some(key) = map.next_key::<String>()? {
            if key != VIRTUAL {
                return Err(de::Error::unknown_field(&key, &[VIRTUAL]));
            }

            if index.is_some() {
                return Err(de::Error::duplicate_field(VIRTUAL));
            }

            index = Some(map.next_value::<u32>()?);
        }

        index
            .map(Key::Virtual)
            .ok_or_else(|| de::Error::missing_field(VIRTUAL))
    }
}

/// The wire layout of a [`Match`]. A missing opponent is a bye, an opponent without id is
/// still to be decided.
#[derive(Serialize, Deserialize)]
#[serde(rename = "Match", rename_all = "camelCase")]
struct RawMatch {
    id: Key<MatchId>,
    stage_id: Key<StageId>,
    group_id: Key<GroupId>,
    round_id: Key<RoundId>,
    number: u32,
    opponent1: Option<RawOpponent>,
    opponent2: Option<RawOpponent>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "Opponent")]
struct RawOpponent {
    id: Option<TeamId>,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    result: Option<Outcome>,
}

fn raw(spot: EntrantSpot<Opponent>) -> Option<RawOpponent> {
    match spot {
        EntrantSpot::Entrant(opponent) => Some(RawOpponent {
            id: Some(opponent.id),
            score: opponent.score,
            points: opponent.points,
            result: opponent.result,
        }),
        EntrantSpot::TBD => Some(RawOpponent {
            id: None,
            score: 0,
            points: 0,
            result: None,
        }),
        EntrantSpot::Empty => None,
    }
}

fn spot(raw: Option<RawOpponent>) -> EntrantSpot<Opponent> {
    match raw {
        Some(RawOpponent {
            id: Some(id),
            score,
            points,
            result,
        }) => EntrantSpot::Entrant(Opponent {
            id,
            score,
            points,
            result,
        }),
        Some(_) => EntrantSpot::TBD,
        None => EntrantSpot::Empty,
    }
}

impl Serialize for Match {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let [opponent1, opponent2] = self.opponents;

        RawMatch {
            id: self.id,
            stage_id: self.stage_id,
            group_id: self.group_id,
            round_id: self.round_id,
            number: self.number,
            opponent1: raw(opponent1),
            opponent2: raw(opponent2),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Match {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawMatch::deserialize(deserializer)?;

        Ok(Self {
            id: raw.id,
            stage_id: raw.stage_id,
            group_id: raw.group_id,
            round_id: raw.round_id,
            number: raw.number,
            opponents: [spot(raw.opponent1), spot(raw.opponent2)],
        })
    }
}
