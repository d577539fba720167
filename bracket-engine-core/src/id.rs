//! Identifiers for teams and bracket data.
//!
//! Every piece of bracket data is addressed with a [`Key`]. While a bracket is still in preview
//! its data only carries [`Key::Virtual`] ids, which are positional and start at `0` for each
//! kind. Once a bracket is started all keys are replaced by [`Key::Real`] ids which are unique
//! across the whole tournament.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::BracketData;

macro_rules! id {
    ($name:ident, $id:ty) => {
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[repr(transparent)]
        pub struct $name(pub $id);

        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl AsRef<$id> for $name {
            #[inline]
            fn as_ref(&self) -> &$id {
                &self.0
            }
        }

        impl PartialEq<$id> for $name {
            #[inline]
            fn eq(&self, other: &$id) -> bool {
                self.0 == *other
            }
        }

        impl From<$id> for $name {
            #[inline]
            fn from(id: $id) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = <$id as FromStr>::Err;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse::<$id>()?))
            }
        }
    };
}

id!(TeamId, u32);
id!(StageId, u32);
id!(GroupId, u32);
id!(RoundId, u32);
id!(MatchId, u32);

/// An id that is either a positional placeholder or a persisted id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key<T> {
    /// A placeholder id used while the bracket is in preview.
    Virtual(u32),
    /// A persisted id.
    Real(T),
}

impl<T> Key<T> {
    /// Returns `true` if this is a [`Key::Real`] id.
    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }

    /// Returns `true` if this is a [`Key::Virtual`] id.
    #[inline]
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    /// Returns the real id, if any.
    #[inline]
    pub fn real(self) -> Option<T> {
        match self {
            Self::Real(id) => Some(id),
            Self::Virtual(_) => None,
        }
    }
}

impl<T> Display for Key<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Virtual(id) => write!(f, "virtual:{}", id),
            Self::Real(id) => id.fmt(f),
        }
    }
}

impl<T> From<T> for Key<T> {
    #[inline]
    fn from(id: T) -> Self {
        Self::Real(id)
    }
}

/// Allocates ids for new bracket data.
#[derive(Clone, Debug)]
pub struct IdGen {
    real: bool,
    stage: u32,
    group: u32,
    round: u32,
    r#match: u32,
}

impl IdGen {
    /// Creates a generator handing out [`Key::Virtual`] ids, starting at `0` for every kind.
    pub const fn virtual_ids() -> Self {
        Self {
            real: false,
            stage: 0,
            group: 0,
            round: 0,
            r#match: 0,
        }
    }

    /// Creates a generator handing out [`Key::Real`] ids that do not collide with any real id
    /// already present in `brackets`. Real ids start at `1`.
    pub fn after<'a, I>(brackets: I) -> Self
    where
        I: IntoIterator<Item = &'a BracketData>,
    {
        fn next<'a, T, I>(keys: I) -> u32
        where
            T: AsRef<u32> + 'a,
            I: Iterator<Item = &'a Key<T>>,
        {
            keys.filter_map(|key| match key {
                Key::Real(id) => Some(*id.as_ref()),
                Key::Virtual(_) => None,
            })
            .max()
            .map_or(1, |id| id + 1)
        }

        let mut gen = Self {
            real: true,
            stage: 1,
            group: 1,
            round: 1,
            r#match: 1,
        };

        for data in brackets {
            gen.stage = gen.stage.max(next(data.stages.iter().map(|s| &s.id)));
            gen.group = gen.group.max(next(data.groups.iter().map(|g| &g.id)));
            gen.round = gen.round.max(next(data.rounds.iter().map(|r| &r.id)));
            gen.r#match = gen.r#match.max(next(data.matches.iter().map(|m| &m.id)));
        }

        gen
    }

    #[inline]
    pub fn is_real(&self) -> bool {
        self.real
    }

    pub fn stage(&mut self) -> Key<StageId> {
        self.key(|gen| &mut gen.stage, StageId)
    }

    pub fn group(&mut self) -> Key<GroupId> {
        self.key(|gen| &mut gen.group, GroupId)
    }

    pub fn round(&mut self) -> Key<RoundId> {
        self.key(|gen| &mut gen.round, RoundId)
    }

    pub fn r#match(&mut self) -> Key<MatchId> {
        self.key(|gen| &mut gen.r#match, MatchId)
    }

    fn key<T, F>(&mut self, counter: F, real: fn(u32) -> T) -> Key<T>
    where
        F: FnOnce(&mut Self) -> &mut u32,
    {
        let is_real = self.real;
        let counter = counter(self);
        let id = *counter;
        *counter += 1;

        if is_real {
            Key::Real(real(id))
        } else {
            Key::Virtual(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IdGen, Key, MatchId, StageId};
    use crate::{BracketData, Stage};

    #[test]
    fn test_virtual_ids() {
        let mut ids = IdGen::virtual_ids();
        assert_eq!(ids.stage(), Key::Virtual(0));
        assert_eq!(ids.r#match(), Key::Virtual(0));
        assert_eq!(ids.r#match(), Key::Virtual(1));
        assert!(!ids.is_real());
    }

    #[test]
    fn test_real_ids_after() {
        let mut ids = IdGen::after([]);
        assert_eq!(ids.stage(), Key::Real(StageId(1)));
        assert_eq!(ids.r#match(), Key::Real(MatchId(1)));

        let data = BracketData {
            stages: vec![Stage {
                id: Key::Real(StageId(7)),
                name: String::from("Main"),
                number: 1,
            }],
            ..Default::default()
        };

        let mut ids = IdGen::after([&data]);
        assert_eq!(ids.stage(), Key::Real(StageId(8)));
        assert_eq!(ids.stage(), Key::Real(StageId(9)));
        assert_eq!(ids.r#match(), Key::Real(MatchId(1)));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::Real(MatchId(3)).to_string(), "3");
        assert_eq!(Key::<MatchId>::Virtual(3).to_string(), "virtual:3");
    }
}
