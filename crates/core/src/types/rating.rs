//! Review star rating.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Errors that can occur when parsing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// No rating was supplied.
    #[error("rating is required")]
    Missing,
    /// The supplied value is not a whole number.
    #[error("rating must be a whole number")]
    NotAWholeNumber,
    /// The supplied value is outside 1-5.
    #[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
    OutOfRange {
        /// The rejected value.
        got: i64,
    },
}

/// A star rating from 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Get the rating as a number of stars.
    #[must_use]
    pub const fn stars(self) -> u8 {
        self.0
    }

    /// Parse a rating from loosely-typed request JSON.
    ///
    /// The review form posts either a number or a numeric string, so both are
    /// accepted. Fractional values and `null` are rejected.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` if the value is missing, not a whole number, or
    /// outside 1-5.
    pub fn from_json(value: Option<&JsonValue>) -> Result<Self, RatingError> {
        let whole = match value {
            None | Some(JsonValue::Null) => return Err(RatingError::Missing),
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => i,
                None => {
                    let f = n.as_f64().ok_or(RatingError::NotAWholeNumber)?;
                    whole_from_f64(f)?
                }
            },
            Some(JsonValue::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(RatingError::Missing);
                }
                trimmed
                    .parse::<i64>()
                    .map_err(|_| RatingError::NotAWholeNumber)?
            }
            Some(_) => return Err(RatingError::NotAWholeNumber),
        };

        Self::try_from(whole)
    }
}

#[allow(clippy::cast_possible_truncation)] // Checked against the accepted range first
fn whole_from_f64(f: f64) -> Result<i64, RatingError> {
    if f.fract() != 0.0 || !f.is_finite() {
        return Err(RatingError::NotAWholeNumber);
    }
    if f < f64::from(Rating::MIN) || f > f64::from(Rating::MAX) {
        return Err(RatingError::OutOfRange { got: f as i64 });
    }
    Ok(f as i64)
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange { got: value })
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}
