//! Shared test fixtures.

use std::fmt;

/// Minimal failure type for exercising executors end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlakyError(pub &'static str);

impl fmt::Display for FlakyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlakyError: {}", self.0)
    }
}

impl std::error::Error for FlakyError {}
