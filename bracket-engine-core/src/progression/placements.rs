use std::collections::btree_set::{self, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// The highest placement accepted in a placements expression.
pub const MAX_PLACEMENT: u32 = 4096;

#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
pub enum ParseError {
    #[default]
    #[error("no placements given")]
    Empty,
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    #[error("placements start at 1")]
    NotPositive,
    #[error("placement {0} is too high")]
    TooLarge(u32),
    #[error("invalid range {0}-{1}")]
    InvalidRange(u32, u32),
    #[error("placement {0} is listed more than once")]
    Duplicate(u32),
}

/// A set of 1-based placements, parsed from a comma separated list of integers and inclusive
/// `a-b` ranges, e.g. `"1-4,7"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placements(BTreeSet<u32>);

impl Placements {
    #[inline]
    pub fn contains(&self, placement: u32) -> bool {
        self.0.contains(&placement)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, a parsed `Placements` contains at least one placement.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> btree_set::Iter<'_, u32> {
        self.0.iter()
    }

    /// Returns `true` if `self` and `other` share no placement.
    #[inline]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.0.is_disjoint(&other.0)
    }
}

impl FromStr for Placements {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn parse(s: &str) -> Result<u32, ParseError> {
            let n: u32 = s
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidNumber(s.trim().to_owned()))?;

            match n {
                0 => Err(ParseError::NotPositive),
                n if n > MAX_PLACEMENT => Err(ParseError::TooLarge(n)),
                n => Ok(n),
            }
        }

        if s.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let mut placements = BTreeSet::new();
        for part in s.split(',') {
            let (start, end) = match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse(start)?, parse(end)?);
                    if start > end {
                        return Err(ParseError::InvalidRange(start, end));
                    }

                    (start, end)
                }
                None => {
                    let n = parse(part)?;
                    (n, n)
                }
            };

            for n in start..=end {
                if !placements.insert(n) {
                    return Err(ParseError::Duplicate(n));
                }
            }
        }

        Ok(Self(placements))
    }
}

impl Display for Placements {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut iter = self.0.iter().copied().peekable();
        let mut first = true;

        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }

            if !first {
                f.write_str(",")?;
            }
            first = false;

            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseError, Placements};

    #[test]
    fn test_parse() {
        let placements: Placements = "1-4,7".parse().unwrap();
        assert_eq!(placements.len(), 5);
        assert!(placements.contains(1));
        assert!(placements.contains(4));
        assert!(!placements.contains(5));
        assert!(placements.contains(7));

        let placements: Placements = " 3 , 1 ".parse().unwrap();
        assert_eq!(placements.iter().copied().collect::<Vec<_>>(), vec![1, 3]);

        let placements: Placements = "2-2".parse().unwrap();
        assert_eq!(placements.len(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!("".parse::<Placements>(), Err(ParseError::Empty));
        assert_eq!("  ".parse::<Placements>(), Err(ParseError::Empty));
        assert_eq!(
            "1,,2".parse::<Placements>(),
            Err(ParseError::InvalidNumber(String::new()))
        );
        assert_eq!(
            "1.5".parse::<Placements>(),
            Err(ParseError::InvalidNumber(String::from("1.5")))
        );
        assert_eq!(
            "a".parse::<Placements>(),
            Err(ParseError::InvalidNumber(String::from("a")))
        );
        assert_eq!("0".parse::<Placements>(), Err(ParseError::NotPositive));
        assert!("-1".parse::<Placements>().is_err());
        assert_eq!(
            "4-2".parse::<Placements>(),
            Err(ParseError::InvalidRange(4, 2))
        );
        assert_eq!(
            "1-3,2".parse::<Placements>(),
            Err(ParseError::Duplicate(2))
        );
        assert_eq!(
            "1-99999".parse::<Placements>(),
            Err(ParseError::TooLarge(99999))
        );
    }

    #[test]
    fn test_display() {
        let placements: Placements = "7,1-4,5".parse().unwrap();
        assert_eq!(placements.to_string(), "1-5,7");

        let placements: Placements = "2,4".parse().unwrap();
        assert_eq!(placements.to_string(), "2,4");
    }

    #[test]
    fn test_is_disjoint() {
        let a: Placements = "1-4".parse().unwrap();
        let b: Placements = "5-8".parse().unwrap();
        let c: Placements = "4".parse().unwrap();
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
    }
}
