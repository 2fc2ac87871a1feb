//! HTTP client for the Nominatim `/search` endpoint.

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::{debug, trace};

use crate::{GeocodeError, Geocoder, RawPlace, SuggestionRecord, normalize};

/// Nominatim search client.
///
/// The usage policy of the public instance requires an identifying
/// `User-Agent`, hence the mandatory `user_agent` argument.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    endpoint: String,
}

impl NominatimClient {
    pub fn new(endpoint: impl Into<String>, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Single GET `?format=json&q=<query>&limit=<limit>`.
    ///
    /// The query is URL-encoded by the request builder. No timeout is set here,
    /// callers bound the lookup with [`crate::search_with_timeout`].
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SuggestionRecord>, GeocodeError> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "json"), ("q", query), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = resp.status();
        trace!(%status, "search answered");
        if !status.is_success() {
            return Err(GeocodeError::Status(status));
        }

        let body = resp.text().await?;
        let places: Vec<RawPlace> = serde_json::from_str(&body)?;
        debug!(count = places.len(), "search results");

        Ok(normalize(places))
    }
}

impl Geocoder for NominatimClient {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<SuggestionRecord>, GeocodeError>> {
        Box::pin(self.lookup(query, limit))
    }
}
