//! Canadian postal code normalization and validation.
//!
//! Every lookup goes through [`PostalCode::parse`] so that caches, the upstream
//! service and the manual mapping tables all see the same `K1A0A6` form.

use serde::{Deserialize, Serialize};
use std::fmt;

const POSTAL_CODE_LEN: usize = 6;

/// A structurally valid, normalized postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, PostalCodeError> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(PostalCodeError::Empty);
        }
        if !validate(&normalized) {
            return Err(PostalCodeError::Malformed {
                raw: raw.to_string(),
                normalized,
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First three characters, the forward sortation area.
    pub fn forward_sortation_area(&self) -> &str {
        &self.0[..3]
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostalCodeError {
    #[error("postal code is empty")]
    Empty,
    #[error("'{raw}' is not a valid postal code (expected A1A1A1, got '{normalized}')")]
    Malformed { raw: String, normalized: String },
}

/// Uppercases and strips all whitespace, including interior spaces.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// True iff `normalized` is exactly letter-digit-letter-digit-letter-digit.
pub fn validate(normalized: &str) -> bool {
    normalized.len() == POSTAL_CODE_LEN && matches_pattern(normalized)
}

/// True when the input could still grow into a valid postal code.
pub fn looks_like_partial(input: &str) -> bool {
    let normalized = normalize(input);
    !normalized.is_empty() && normalized.len() <= POSTAL_CODE_LEN && matches_pattern(&normalized)
}

fn matches_pattern(normalized: &str) -> bool {
    normalized.chars().enumerate().all(|(index, ch)| {
        if index % 2 == 0 {
            ch.is_ascii_uppercase()
        } else {
            ch.is_ascii_digit()
        }
    })
}
