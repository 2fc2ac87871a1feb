use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Message shown when a lookup was cancelled by its deadline.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// Message shown for every other failed lookup.
pub const NO_RESULTS_MESSAGE: &str = "No results found.";

/// Everything that can go wrong during a lookup.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("lookup cancelled after {0:?}")]
    Timeout(Duration),
    #[error("geocoding service answered with status {0}")]
    Status(StatusCode),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GeocodeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GeocodeError::Timeout(_))
    }

    /// Text displayed under the address field.
    ///
    /// Only timeouts get a dedicated message, everything else collapses into
    /// the generic "no results" text.
    pub fn user_message(&self) -> &'static str {
        if self.is_timeout() {
            TIMEOUT_MESSAGE
        } else {
            NO_RESULTS_MESSAGE
        }
    }
}
