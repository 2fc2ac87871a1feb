use geocoding::SuggestionRecord;
use serde::{Deserialize, Serialize};

/// Coordinate marking "nothing selected".
pub const SENTINEL_COORD: &str = "0.0";

/// Location picked from the suggestion list.
///
/// The default value `{ "0.0", "0.0", "" }` means no selection. A real place at
/// exactly 0.0/0.0 is indistinguishable from the sentinel and is treated as
/// unselected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedLocation {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

impl Default for SelectedLocation {
    fn default() -> Self {
        Self {
            lat: SENTINEL_COORD.into(),
            lon: SENTINEL_COORD.into(),
            display_name: String::new(),
        }
    }
}

impl SelectedLocation {
    /// Missing coordinates fall back to the sentinel.
    pub fn from_suggestion(s: &SuggestionRecord) -> Self {
        let or_sentinel = |v: &str| {
            if v.is_empty() {
                SENTINEL_COORD.to_string()
            } else {
                v.to_string()
            }
        };
        Self {
            lat: or_sentinel(&s.lat),
            lon: or_sentinel(&s.lon),
            display_name: s.label.clone(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.lat != SENTINEL_COORD && self.lon != SENTINEL_COORD
    }

    /// Coordinates handed to the preview, only while a location is selected.
    pub fn preview_coords(&self) -> Option<(&str, &str)> {
        self.is_selected()
            .then(|| (self.lat.as_str(), self.lon.as_str()))
    }
}

/// Parsed, range-checked coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let ok = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        ok.then_some(Self { lat, lon })
    }

    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        let lat = lat.trim().parse().ok()?;
        let lon = lon.trim().parse().ok()?;
        Self::new(lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_the_sentinel() {
        let loc = SelectedLocation::default();
        assert_eq!(loc.lat, "0.0");
        assert_eq!(loc.lon, "0.0");
        assert_eq!(loc.display_name, "");
        assert!(!loc.is_selected());
        assert_eq!(loc.preview_coords(), None);
    }

    #[test]
    fn one_sentinel_coordinate_is_enough_to_hide_the_preview() {
        let loc = SelectedLocation {
            lat: "0.0".into(),
            lon: "2.3522".into(),
            display_name: "Somewhere on the equator".into(),
        };
        assert!(!loc.is_selected());
    }

    #[test]
    fn from_suggestion_copies_label_and_coordinates() {
        let s = SuggestionRecord {
            key: "1".into(),
            label: "Paris, France".into(),
            value: "Paris, France".into(),
            lat: "48.8566".into(),
            lon: "2.3522".into(),
        };
        let loc = SelectedLocation::from_suggestion(&s);
        assert_eq!(loc.display_name, "Paris, France");
        assert_eq!(loc.preview_coords(), Some(("48.8566", "2.3522")));
    }

    #[test]
    fn empty_coordinates_become_the_sentinel() {
        let s = SuggestionRecord {
            label: "Nowhere".into(),
            ..Default::default()
        };
        let loc = SelectedLocation::from_suggestion(&s);
        assert_eq!(loc.lat, SENTINEL_COORD);
        assert!(!loc.is_selected());
    }

    #[test]
    fn latlon_rejects_garbage_and_out_of_range() {
        assert_eq!(
            LatLon::parse("48.8566", " 2.3522 "),
            Some(LatLon { lat: 48.8566, lon: 2.3522 })
        );
        assert_eq!(LatLon::parse("north", "2.0"), None);
        assert_eq!(LatLon::parse("91", "0"), None);
        assert_eq!(LatLon::parse("0", "-180.5"), None);
        assert_eq!(LatLon::parse("NaN", "0"), None);
    }
}
