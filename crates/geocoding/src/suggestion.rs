//! Raw search results and their normalized suggestion form.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the search response as sent by the service.
///
/// Every field is optional; Nominatim sends `place_id` as a number and the
/// coordinates as strings, other deployments are less consistent, so values are
/// kept untyped until normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub place_id: Option<Value>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
    #[serde(default)]
    pub display_name: Option<Value>,
}

/// A candidate address offered to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    /// Unique within one suggestion list.
    pub key: String,
    pub label: String,
    pub value: String,
    pub lat: String,
    pub lon: String,
}

impl From<RawPlace> for SuggestionRecord {
    fn from(raw: RawPlace) -> Self {
        let lat = text_of(raw.lat);
        let lon = text_of(raw.lon);
        let key = match text_of(raw.place_id) {
            id if !id.is_empty() => id,
            _ => format!("{lat},{lon}"),
        };
        let label = text_of(raw.display_name);

        Self {
            key,
            value: label.clone(),
            label,
            lat,
            lon,
        }
    }
}

/// Convert a raw response into suggestions, preserving the service's ranking.
///
/// Keys are made unique: a repeated key gets a `#n` suffix.
pub fn normalize(places: Vec<RawPlace>) -> Vec<SuggestionRecord> {
    let mut seen = HashSet::new();

    places
        .into_iter()
        .map(SuggestionRecord::from)
        .map(|mut rec| {
            if !seen.insert(rec.key.clone()) {
                let base = rec.key.clone();
                let mut n = 2;
                while !seen.insert(format!("{base}#{n}")) {
                    n += 1;
                }
                rec.key = format!("{base}#{n}");
            }
            rec
        })
        .collect()
}

fn text_of(v: Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
