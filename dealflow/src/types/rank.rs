//! Rank values for card ordering using fractional indexing.
//!
//! A rank is a string of base-62 digits (`0-9A-Za-z`, which is also their
//! ASCII order) read as a fraction in `(0, 1)`: `"V"` is roughly one half,
//! `"0V"` is roughly 1/124. Plain byte-wise string comparison therefore
//! orders ranks, and a rank strictly between any two others always exists as
//! long as the digit string may grow. Ranks never end in the `0` digit, which
//! keeps that guarantee true on the lower side as well.
//!
//! Growth is bounded by a maximum length. Running out of room is reported as
//! [`RankError::Exhausted`]; callers re-rank the whole column with
//! [`Rank::spread`] and try again.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u16 = 62;

/// Default upper bound on the number of digits in a rank
pub const DEFAULT_MAX_RANK_LEN: usize = 24;

/// Errors from rank parsing and generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("rank must not be empty")]
    Empty,

    #[error("invalid rank '{rank}': unexpected character {ch:?}")]
    InvalidDigit { rank: String, ch: char },

    #[error("invalid rank '{rank}': must not end with '0'")]
    TrailingZero { rank: String },

    #[error("rank '{after}' is not lower than '{before}'")]
    Unordered { after: String, before: String },

    #[error("no rank of at most {max_len} digits fits between the neighbors")]
    Exhausted { max_len: usize },
}

/// Position of a card within its column. Compare with `<`/`>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rank(String);

impl Rank {
    /// Mid-range rank used for the first card of an empty column
    pub fn initial() -> Self {
        Self(char::from(DIGITS[usize::from(BASE / 2)]).to_string())
    }

    /// Parse and validate a rank string
    pub fn parse(s: &str) -> Result<Self, RankError> {
        if s.is_empty() {
            return Err(RankError::Empty);
        }
        if let Some(ch) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(RankError::InvalidDigit {
                rank: s.to_string(),
                ch,
            });
        }
        if s.ends_with('0') {
            return Err(RankError::TrailingZero {
                rank: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }

    /// A rank strictly between `after` and `before`.
    ///
    /// Either side may be open: `(None, None)` gives [`Rank::initial`],
    /// `(Some(a), None)` a rank above `a` with room left after it, and
    /// `(None, Some(b))` a rank below `b`.
    pub fn between(
        after: Option<&Rank>,
        before: Option<&Rank>,
        max_len: usize,
    ) -> Result<Rank, RankError> {
        if let (Some(a), Some(b)) = (after, before) {
            if a >= b {
                return Err(RankError::Unordered {
                    after: a.0.clone(),
                    before: b.0.clone(),
                });
            }
        }

        let lower = after.map(Rank::digits).unwrap_or_default();
        let upper = before.map(Rank::digits);
        let key = midpoint(&lower, upper.as_deref());

        if key.len() > max_len {
            return Err(RankError::Exhausted { max_len });
        }
        Ok(Self::from_digits(&key))
    }

    /// Shorthand for `between(Some(last), None, max_len)`
    pub fn after(last: &Rank, max_len: usize) -> Result<Rank, RankError> {
        Self::between(Some(last), None, max_len)
    }

    /// Shorthand for `between(None, Some(first), max_len)`
    pub fn before(first: &Rank, max_len: usize) -> Result<Rank, RankError> {
        Self::between(None, Some(first), max_len)
    }

    /// `count` increasing ranks spread evenly over the whole range, using as
    /// few digits as possible. Used to re-rank a column from scratch.
    pub fn spread(count: usize) -> Vec<Rank> {
        if count == 0 {
            return Vec::new();
        }

        let slots = count as u128 + 1;
        let mut width = 1u32;
        let mut space = u128::from(BASE);
        while space < slots {
            width += 1;
            space *= u128::from(BASE);
        }

        (1..=count as u128)
            .map(|i| {
                let value = i * space / slots;
                let mut digits: Vec<u8> = (0..width)
                    .rev()
                    .map(|pos| ((value / u128::from(BASE).pow(pos)) % u128::from(BASE)) as u8)
                    .collect();
                while digits.last() == Some(&0) {
                    digits.pop();
                }
                Self::from_digits(&digits)
            })
            .collect()
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn digits(&self) -> Vec<u8> {
        self.0.bytes().map(digit_value).collect()
    }

    fn from_digits(digits: &[u8]) -> Self {
        Self(
            digits
                .iter()
                .map(|&d| char::from(DIGITS[usize::from(d)]))
                .collect(),
        )
    }
}

/// Digit value of a validated rank byte
fn digit_value(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'A'..=b'Z' => byte - b'A' + 10,
        _ => byte - b'a' + 36,
    }
}

/// Shortest digit string strictly between `lower` and `upper` (`None` = 1.0).
///
/// Requires `lower < upper` and neither ending in digit 0; the result never
/// ends in digit 0 either.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> Vec<u8> {
    if let Some(upper) = upper {
        let mut n = 0;
        while n < upper.len() && lower.get(n).copied().unwrap_or(0) == upper[n] {
            n += 1;
        }
        if n > 0 {
            let mut out = upper[..n].to_vec();
            out.extend(midpoint(lower.get(n..).unwrap_or_default(), Some(&upper[n..])));
            return out;
        }
    }

    let lo = u16::from(lower.first().copied().unwrap_or(0));
    let hi = upper.map(|u| u16::from(u[0])).unwrap_or(BASE);

    if hi - lo > 1 {
        vec![((lo + hi) / 2) as u8]
    } else if let Some(upper) = upper.filter(|u| u.len() > 1) {
        // upper's leading digit alone is already below upper and above lower
        vec![upper[0]]
    } else {
        let mut out = vec![lo as u8];
        out.extend(midpoint(lower.get(1..).unwrap_or_default(), None));
        out
    }
}

impl Default for Rank {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Rank {
    type Error = RankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rank> for String {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl ToSql for Rank {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for Rank {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Rank::parse(s).map_err(|e| FromSqlError::Other(Box::new(e))))
    }
}
