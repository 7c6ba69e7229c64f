//! Clock settings shared by every game of a match.

use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a `base+increment` time control string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeControlError {
    /// The string does not have one or two `+`-separated fields.
    #[error("Malformed time control '{0}': expected <base>[+<increment>] in seconds")]
    Malformed(String),
    /// A field is not a non-negative number of seconds.
    #[error("Invalid seconds value '{0}' in time control")]
    InvalidSeconds(String),
}

/// Base time and per-move increment, both in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeControl {
    pub base_ms: u64,
    pub increment_ms: u64,
}

impl TimeControl {
    pub const fn new(base_ms: u64, increment_ms: u64) -> Self {
        Self {
            base_ms,
            increment_ms,
        }
    }
}

fn seconds_to_ms(field: &str) -> Result<u64, TimeControlError> {
    let seconds: f64 = field
        .trim()
        .parse()
        .map_err(|_| TimeControlError::InvalidSeconds(field.to_string()))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TimeControlError::InvalidSeconds(field.to_string()));
    }
    Ok((seconds * 1000.0).round() as u64)
}

impl FromStr for TimeControl {
    type Err = TimeControlError;

    /// Parses `"8+0.08"` style strings (seconds). The increment is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('+').collect();
        match fields.as_slice() {
            [base] => Ok(Self::new(seconds_to_ms(base)?, 0)),
            [base, inc] => Ok(Self::new(seconds_to_ms(base)?, seconds_to_ms(inc)?)),
            _ => Err(TimeControlError::Malformed(s.to_string())),
        }
    }
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}+{}",
            self.base_ms as f64 / 1000.0,
            self.increment_ms as f64 / 1000.0
        )
    }
}
