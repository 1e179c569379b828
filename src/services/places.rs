use crate::core::DiscoveryError;
use crate::models::{Candidate, CityPrediction, GeoPoint, Locality, PlaceDetails};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default base URL for the Google Maps web services
pub const GOOGLE_MAPS_API_URL: &str = "https://maps.googleapis.com/maps/api";

/// Errors that can occur when talking to the places API
#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<PlacesError> for DiscoveryError {
    fn from(err: PlacesError) -> Self {
        match err {
            PlacesError::QuotaExceeded(_) => DiscoveryError::RateLimited,
            other => DiscoveryError::Upstream(other.to_string()),
        }
    }
}

/// Nearby restaurant search at a center point and radius.
///
/// Implementations pass results through in upstream order and never retry.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<Candidate>, DiscoveryError>;
}

/// Google Places / Geocoding API client
///
/// Covers the calls the app makes:
/// - Nearby restaurant search
/// - City autocomplete and place geometry for the location picker
/// - Restaurant details and photos
/// - Reverse geocoding of device fixes
pub struct GooglePlacesClient {
    base_url: String,
    api_key: String,
    client: Client,
}

/// Photo bytes fetched on behalf of a client
#[derive(Debug, Clone)]
pub struct PlacePhoto {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct NearbyRecord {
    place_id: String,
    name: String,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_ratings_total: Option<u32>,
    #[serde(default)]
    vicinity: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct DetailsRecord {
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    price_level: Option<u8>,
    #[serde(default)]
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    photos: Vec<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoRecord {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl GooglePlacesClient {
    /// Create a new places client
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// Search for restaurants within `radius_meters` of `center`
    pub async fn nearby_restaurants(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<Candidate>, PlacesError> {
        let json = self
            .get_json(
                "place/nearbysearch",
                &[
                    ("location", format!("{},{}", center.latitude, center.longitude)),
                    ("radius", radius_meters.to_string()),
                    ("type", "restaurant".to_string()),
                ],
            )
            .await?;

        if !has_payload(&json, "nearbysearch")? {
            return Ok(Vec::new());
        }

        let results = match json.get("results") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(results)) => results,
            Some(_) => {
                return Err(PlacesError::InvalidResponse(
                    "results is not an array".into(),
                ))
            }
        };

        let candidates = results
            .iter()
            .map(parse_candidate)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Nearby search at {} r={}m returned {} places",
            center.to_coordinate_string(),
            radius_meters,
            candidates.len()
        );

        Ok(candidates)
    }

    /// City suggestions for the location picker
    pub async fn autocomplete_cities(&self, input: &str) -> Result<Vec<CityPrediction>, PlacesError> {
        let json = self
            .get_json(
                "place/autocomplete",
                &[
                    ("input", input.to_string()),
                    ("types", "(cities)".to_string()),
                ],
            )
            .await?;

        if !has_payload(&json, "autocomplete")? {
            return Ok(Vec::new());
        }

        let predictions = json
            .get("predictions")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));

        let predictions: Vec<Prediction> = serde_json::from_value(predictions)
            .map_err(|e| PlacesError::InvalidResponse(format!("Failed to parse predictions: {}", e)))?;

        Ok(predictions
            .into_iter()
            .map(|p| CityPrediction {
                place_id: p.place_id,
                description: p.description,
            })
            .collect())
    }

    /// Coordinates of a place picked from autocomplete
    pub async fn place_location(&self, place_id: &str) -> Result<Option<GeoPoint>, PlacesError> {
        let json = self
            .get_json(
                "place/details",
                &[
                    ("place_id", place_id.to_string()),
                    ("fields", "geometry".to_string()),
                ],
            )
            .await?;

        if !has_payload(&json, "details")? {
            return Ok(None);
        }

        let point = json
            .get("result")
            .and_then(|r| r.get("geometry"))
            .cloned()
            .map(serde_json::from_value::<Geometry>)
            .transpose()
            .map_err(|e| PlacesError::InvalidResponse(format!("Failed to parse geometry: {}", e)))?
            .map(|g| GeoPoint::new(g.location.lat, g.location.lng));

        Ok(point)
    }

    /// Phone, hours, website, price level and photo references of a restaurant
    pub async fn place_details(&self, place_id: &str) -> Result<Option<PlaceDetails>, PlacesError> {
        let json = self
            .get_json(
                "place/details",
                &[
                    ("place_id", place_id.to_string()),
                    (
                        "fields",
                        "formatted_phone_number,opening_hours,website,price_level,photos".to_string(),
                    ),
                ],
            )
            .await?;

        if !has_payload(&json, "details")? {
            return Ok(None);
        }

        let Some(result) = json.get("result") else {
            return Ok(None);
        };

        let record: DetailsRecord = serde_json::from_value(result.clone())
            .map_err(|e| PlacesError::InvalidResponse(format!("Failed to parse details: {}", e)))?;

        let (open_now, weekday_text) = match record.opening_hours {
            Some(hours) => (hours.open_now, hours.weekday_text),
            None => (None, Vec::new()),
        };

        Ok(Some(PlaceDetails {
            place_id: place_id.to_string(),
            phone: record.formatted_phone_number,
            website: record.website,
            price_level: record.price_level,
            open_now,
            weekday_text,
            photo_references: record.photos.into_iter().map(|p| p.photo_reference).collect(),
        }))
    }

    /// Image bytes of a place photo scaled to `max_width` pixels.
    ///
    /// The key stays on the server; callers only ever see the reference.
    pub async fn fetch_photo(&self, photo_reference: &str, max_width: u32) -> Result<PlacePhoto, PlacesError> {
        let url = format!(
            "{}/place/photo?maxwidth={}&photoreference={}",
            self.base_url.trim_end_matches('/'),
            max_width,
            urlencoding::encode(photo_reference)
        );

        tracing::debug!("Photo request: {}", url);

        let response = self
            .client
            .get(format!("{}&key={}", url, urlencoding::encode(&self.api_key)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PlacesError::QuotaExceeded(format!("place/photo returned {}", status)));
        }
        if !status.is_success() {
            return Err(PlacesError::ApiError(format!("place/photo returned {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let data = response.bytes().await?.to_vec();

        Ok(PlacePhoto { content_type, data })
    }

    /// City and country for a coordinate
    pub async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Locality>, PlacesError> {
        let json = self
            .get_json(
                "geocode",
                &[("latlng", format!("{},{}", point.latitude, point.longitude))],
            )
            .await?;

        if !has_payload(&json, "geocode")? {
            return Ok(None);
        }

        let components = json
            .get("results")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first())
            .and_then(|r| r.get("address_components"))
            .cloned();

        let Some(components) = components else {
            return Ok(None);
        };

        let components: Vec<AddressComponent> = serde_json::from_value(components)
            .map_err(|e| PlacesError::InvalidResponse(format!("Failed to parse address: {}", e)))?;

        let find = |kind: &str| {
            components
                .iter()
                .find(|c| c.types.iter().any(|t| t == kind))
                .map(|c| c.long_name.clone())
        };

        // Same preference order as the device geocoder: city, subregion, district
        let city = find("locality")
            .or_else(|| find("administrative_area_level_2"))
            .or_else(|| find("sublocality"));

        Ok(Some(Locality {
            city,
            country: find("country"),
        }))
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, PlacesError> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!(
            "{}/{}/json?{}",
            self.base_url.trim_end_matches('/'),
            endpoint,
            query
        );

        // Logged before the key is appended
        tracing::debug!("Places request: {}", url);

        let response = self
            .client
            .get(format!("{}&key={}", url, urlencoding::encode(&self.api_key)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PlacesError::QuotaExceeded(format!("{} returned {}", endpoint, status)));
        }
        if !status.is_success() {
            return Err(PlacesError::ApiError(format!("{} returned {}", endpoint, status)));
        }

        let json: Value = response.json().await?;
        Ok(json)
    }
}

#[async_trait]
impl PlaceSearch for GooglePlacesClient {
    async fn search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        Ok(self.nearby_restaurants(center, radius_meters).await?)
    }
}

/// Interpret the API-level `status` field.
///
/// `Ok(true)` means the payload carries data, `Ok(false)` means it should be
/// read as an empty answer.
fn has_payload(json: &Value, endpoint: &str) -> Result<bool, PlacesError> {
    let status = json
        .get("status")
        .and_then(|s| s.as_str())
        .ok_or_else(|| PlacesError::InvalidResponse("Missing status field".into()))?;

    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
        "OVER_QUERY_LIMIT" => Err(PlacesError::QuotaExceeded(format!(
            "{} status OVER_QUERY_LIMIT",
            endpoint
        ))),
        other => {
            let message = json
                .get("error_message")
                .and_then(|m| m.as_str())
                .unwrap_or("");
            tracing::warn!("{} answered with status {} {}", endpoint, other, message);
            Ok(false)
        }
    }
}

fn parse_candidate(raw: &Value) -> Result<Candidate, PlacesError> {
    let record: NearbyRecord = serde_json::from_value(raw.clone())
        .map_err(|e| PlacesError::InvalidResponse(format!("Failed to parse place: {}", e)))?;

    Ok(Candidate {
        place_id: record.place_id,
        name: record.name,
        rating: record.rating,
        rating_count: record.user_ratings_total.unwrap_or(0),
        address: record
            .vicinity
            .or(record.formatted_address)
            .unwrap_or_default(),
        location: record
            .geometry
            .map(|g| GeoPoint::new(g.location.lat, g.location.lng)),
        raw_payload: raw.clone(),
    })
}
