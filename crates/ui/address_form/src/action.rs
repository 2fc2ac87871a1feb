use geocoding::SuggestionRecord;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::location::SelectedLocation;

/// Why a lookup produced no suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupFailure {
    TimedOut,
    Failed(String),
}

pub type LookupOutcome = Result<Vec<SuggestionRecord>, LookupFailure>;

#[derive(Debug, Clone, PartialEq, Serialize, Display, Deserialize)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Error(String),
    FocusNext,
    FocusPrev,
    /// Debounce window of the address query closed; carries the timer ticket.
    DebounceElapsed(u64),
    /// A geocoding lookup finished (or failed); `seq` identifies the request.
    LookupSettled { seq: u64, outcome: LookupOutcome },
    LocationSelected(SelectedLocation),
    LocationCleared,
    Submit,
}
