use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A point on the map in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Fixed-precision text form, e.g. `"52.520, 13.405"`
    pub fn to_coordinate_string(&self) -> String {
        format!("{:.3}, {:.3}", self.latitude, self.longitude)
    }
}

/// Persisted under `locationSettings`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPreference {
    #[serde(rename = "useCurrentLocation", default = "default_true")]
    pub use_current_location: bool,
}

impl Default for LocationPreference {
    fn default() -> Self {
        Self {
            use_current_location: true,
        }
    }
}

fn default_true() -> bool { true }

/// Persisted under `customLocation` while the user searches from a picked city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: String,
}

impl CustomLocation {
    pub fn new(point: GeoPoint, description: impl Into<String>) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            description: description.into(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// A restaurant returned by nearby search, keyed by `place_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub name: String,
    pub rating: Option<f64>,
    #[serde(rename = "ratingCount")]
    pub rating_count: u32,
    pub address: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Upstream record as received
    #[serde(rename = "rawPayload")]
    pub raw_payload: serde_json::Value,
}

/// Radius expansion limits, in meters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusPolicy {
    pub initial_meters: u32,
    pub step_meters: u32,
    pub ceiling_meters: u32,
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        Self {
            initial_meters: 1500,
            step_meters: 1500,
            ceiling_meters: 5000,
        }
    }
}

/// Everything one swipe session has discovered so far.
///
/// `seen_place_ids` always equals the set of ids in `accumulated`, and
/// `accumulated` only grows at the tail.
#[derive(Debug, Clone, Serialize)]
pub struct SearchState {
    pub center: GeoPoint,
    #[serde(rename = "radiusMeters")]
    pub radius_meters: u32,
    #[serde(skip)]
    seen_place_ids: HashSet<String>,
    accumulated: Vec<Candidate>,
}

impl SearchState {
    pub fn new(center: GeoPoint, radius_meters: u32) -> Self {
        Self {
            center,
            radius_meters,
            seen_place_ids: HashSet::new(),
            accumulated: Vec::new(),
        }
    }

    /// Append the candidates not seen before, in the order given.
    ///
    /// Returns how many were appended. Duplicates inside `batch` are
    /// dropped as well.
    pub fn absorb(&mut self, batch: Vec<Candidate>) -> usize {
        let before = self.accumulated.len();
        for candidate in batch {
            if self.seen_place_ids.insert(candidate.place_id.clone()) {
                self.accumulated.push(candidate);
            }
        }
        self.accumulated.len() - before
    }

    /// Move the radius outward; never shrinks it
    pub fn widen_to(&mut self, radius_meters: u32) {
        self.radius_meters = self.radius_meters.max(radius_meters);
    }

    pub fn accumulated(&self) -> &[Candidate] {
        &self.accumulated
    }

    pub fn has_seen(&self, place_id: &str) -> bool {
        self.seen_place_ids.contains(place_id)
    }

    pub fn seen_place_ids(&self) -> &HashSet<String> {
        &self.seen_place_ids
    }

    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Like,
    Dislike,
}

/// One entry of the session's append-only decision log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeDecision {
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub direction: SwipeDirection,
    #[serde(rename = "atIndex")]
    pub at_index: usize,
    #[serde(rename = "decidedAt")]
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

/// Reverse-geocoding result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Locality {
    /// `"City, Country"`, or `None` when geocoding produced nothing usable
    pub fn display(&self) -> Option<String> {
        let city = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let country = self.country.as_deref().map(str::trim).filter(|c| !c.is_empty());
        match (city, country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

/// City suggestion from place autocomplete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityPrediction {
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub description: String,
}

/// Extra restaurant information shown on the info screen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "priceLevel")]
    pub price_level: Option<u8>,
    #[serde(rename = "openNow")]
    pub open_now: Option<bool>,
    #[serde(rename = "weekdayText")]
    pub weekday_text: Vec<String>,
    #[serde(rename = "photoReferences")]
    pub photo_references: Vec<String>,
}
