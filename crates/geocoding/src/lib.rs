//! Geocoding search client.
//!
//! Resolves free-text address queries into a short, ranked list of
//! [`SuggestionRecord`]s. The UI only ever talks to the [`Geocoder`] trait so
//! that the search field can be driven by a fake in tests and by
//! [`NominatimClient`] at runtime.
//!
//! ```ignore
//! use geocoding::{NominatimClient, search_with_timeout, DEFAULT_LIMIT, DEFAULT_TIMEOUT};
//!
//! let client = NominatimClient::new(geocoding::DEFAULT_ENDPOINT, "address-form/0.1")?;
//! let hits = search_with_timeout(&client, "Paris", DEFAULT_LIMIT, DEFAULT_TIMEOUT).await?;
//! ```

mod error;
mod nominatim;
mod suggestion;

use std::time::Duration;

use futures::future::BoxFuture;

pub use error::{GeocodeError, NO_RESULTS_MESSAGE, TIMEOUT_MESSAGE};
pub use nominatim::NominatimClient;
pub use suggestion::{RawPlace, SuggestionRecord, normalize};

/// Public Nominatim search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Number of suggestions requested per lookup.
pub const DEFAULT_LIMIT: usize = 5;

/// Upper bound for a single lookup before it is cancelled.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything able to turn a free-text query into ranked suggestions.
///
/// Implementations must be cheap to share (`Arc<dyn Geocoder>`) and the returned
/// future must be `Send` so lookups can run on spawned tokio tasks.
pub trait Geocoder: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<SuggestionRecord>, GeocodeError>>;
}

/// Run a lookup and cancel it once `timeout` has elapsed.
///
/// Dropping the inner future aborts the in-flight HTTP request; the caller only
/// sees [`GeocodeError::Timeout`].
pub async fn search_with_timeout(
    geocoder: &dyn Geocoder,
    query: &str,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<SuggestionRecord>, GeocodeError> {
    match tokio::time::timeout(timeout, geocoder.search(query, limit)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(query, ?timeout, "geocoding lookup timed out");
            Err(GeocodeError::Timeout(timeout))
        }
    }
}
