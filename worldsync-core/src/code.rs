//! Country code parsing and normalisation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalised ISO 3166-1 alpha-2 country code.
///
/// Codes are trimmed and upper-cased on construction, so `" gb "` and `"GB"`
/// compare equal.
///
/// # Examples
///
/// ```
/// use worldsync_core::CountryCode;
///
/// # fn main() -> Result<(), worldsync_core::CountryCodeError> {
/// let code = CountryCode::parse(" fr ")?;
/// assert_eq!(code.as_str(), "FR");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

/// Errors returned by [`CountryCode::parse`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CountryCodeError {
    /// The input was empty after trimming.
    #[error("country code must not be empty")]
    Empty,
    /// The input did not contain exactly two characters.
    #[error("country code {code:?} must contain exactly two letters")]
    InvalidLength {
        /// The offending input.
        code: String,
    },
    /// The input contained something other than ASCII letters.
    #[error("country code {code:?} must only contain ASCII letters")]
    NonAlphabetic {
        /// The offending input.
        code: String,
    },
}

impl CountryCode {
    /// Parse and normalise a two-letter country code.
    ///
    /// # Errors
    ///
    /// Returns [`CountryCodeError`] when the trimmed input is empty, is not
    /// two characters long, or contains non-ASCII-letter characters.
    pub fn parse(raw: &str) -> Result<Self, CountryCodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CountryCodeError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError::NonAlphabetic {
                code: trimmed.to_owned(),
            });
        }
        if trimmed.len() != 2 {
            return Err(CountryCodeError::InvalidLength {
                code: trimmed.to_owned(),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Borrow the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalise a two- or three-letter code for boundary lookups.
///
/// Returns `None` when the input is not two or three ASCII letters.
///
/// ```
/// use worldsync_core::normalise_lookup_code;
///
/// assert_eq!(normalise_lookup_code("fra").as_deref(), Some("FRA"));
/// assert_eq!(normalise_lookup_code("-99"), None);
/// ```
#[must_use]
pub fn normalise_lookup_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let valid = matches!(trimmed.len(), 2 | 3) && trimmed.chars().all(|c| c.is_ascii_alphabetic());
    valid.then(|| trimmed.to_ascii_uppercase())
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CountryCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CountryCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}
