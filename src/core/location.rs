use crate::core::DiscoveryError;
use crate::models::{CustomLocation, GeoPoint, LocationPreference};
use crate::services::{DeviceLocation, LocationStore, PermissionStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which source a search center came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Device,
    Custom,
}

/// A point read without side effects, for change detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedLocation {
    pub source: LocationSource,
    pub point: GeoPoint,
}

/// What the settings screen shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    #[serde(rename = "useCurrentLocation")]
    pub use_current_location: bool,
    pub description: String,
}

const NO_CUSTOM_LOCATION: &str = "No custom location set";
const CURRENT_LOCATION_UNAVAILABLE: &str = "Current location unavailable";

/// Decides where to search from.
///
/// The persisted preference picks between the device fix and the saved
/// custom location. The two never mix: with the preference off, a missing
/// custom location is an error rather than a silent fallback to GPS.
#[derive(Clone)]
pub struct LocationResolver {
    store: LocationStore,
    device: Arc<dyn DeviceLocation>,
}

impl LocationResolver {
    pub fn new(store: LocationStore, device: Arc<dyn DeviceLocation>) -> Self {
        Self { store, device }
    }

    /// Resolve the search center and remember it as the last known point
    pub async fn resolve(&self) -> Result<GeoPoint, DiscoveryError> {
        let preference = self.store.preference().await;

        let point = if preference.use_current_location {
            self.device_fix().await?
        } else {
            self.store
                .custom_location()
                .await
                .ok_or(DiscoveryError::NoLocationAvailable)?
                .point()
        };

        self.store.set_last_known(point).await;

        tracing::debug!(
            "Resolved search center {} (current location: {})",
            point.to_coordinate_string(),
            preference.use_current_location
        );

        Ok(point)
    }

    /// Current point of the active source, without prompting or persisting.
    ///
    /// Any failure reads as `None`.
    pub async fn observe(&self) -> Option<ObservedLocation> {
        let preference = self.store.preference().await;

        if preference.use_current_location {
            match self.device.current_position(true).await {
                Ok(point) => Some(ObservedLocation {
                    source: LocationSource::Device,
                    point,
                }),
                Err(e) => {
                    tracing::debug!("No device fix while observing location: {}", e);
                    None
                }
            }
        } else {
            self.store.custom_location().await.map(|custom| ObservedLocation {
                source: LocationSource::Custom,
                point: custom.point(),
            })
        }
    }

    /// `"City, Country"` for a point, or its coordinates when geocoding
    /// fails or finds nothing
    pub async fn describe_location(&self, point: GeoPoint) -> String {
        match self.device.reverse_geocode(point).await {
            Ok(Some(locality)) => locality
                .display()
                .unwrap_or_else(|| point.to_coordinate_string()),
            Ok(None) => point.to_coordinate_string(),
            Err(e) => {
                tracing::warn!("Reverse geocoding failed: {}", e);
                point.to_coordinate_string()
            }
        }
    }

    /// Switch to the device location.
    ///
    /// Needs permission; on success the custom location is forgotten.
    pub async fn use_current_location(&self) -> Result<LocationSummary, DiscoveryError> {
        let point = self.device_fix().await?;
        let description = self.describe_location(point).await;

        self.store.set_last_known(point).await;
        self.store.clear_custom_location().await;
        self.store
            .set_preference(LocationPreference {
                use_current_location: true,
            })
            .await;

        tracing::info!("Switched to current location: {}", description);

        Ok(LocationSummary {
            use_current_location: true,
            description,
        })
    }

    /// Switch to the saved custom location, whether or not one exists yet
    pub async fn use_custom_location(&self) -> LocationSummary {
        self.store
            .set_preference(LocationPreference {
                use_current_location: false,
            })
            .await;

        let description = match self.store.custom_location().await {
            Some(custom) if !custom.description.is_empty() => custom.description,
            Some(_) => "Custom Location".to_string(),
            None => NO_CUSTOM_LOCATION.to_string(),
        };

        LocationSummary {
            use_current_location: false,
            description,
        }
    }

    /// Save a picked city and search from it from now on
    pub async fn set_custom_location(
        &self,
        point: GeoPoint,
        description: &str,
    ) -> LocationSummary {
        let custom = CustomLocation::new(point, description);
        self.store.set_custom_location(&custom).await;
        self.store
            .set_preference(LocationPreference {
                use_current_location: false,
            })
            .await;

        tracing::info!("Custom location set to {} ({})", description, point.to_coordinate_string());

        LocationSummary {
            use_current_location: false,
            description: custom.description,
        }
    }

    /// Preference plus a description of the active source; writes nothing
    pub async fn summary(&self) -> LocationSummary {
        let preference = self.store.preference().await;

        if preference.use_current_location {
            let description = match self.observe().await {
                Some(observed) => self.describe_location(observed.point).await,
                None => CURRENT_LOCATION_UNAVAILABLE.to_string(),
            };
            LocationSummary {
                use_current_location: true,
                description,
            }
        } else {
            let description = self
                .store
                .custom_location()
                .await
                .map(|c| c.description)
                .unwrap_or_else(|| NO_CUSTOM_LOCATION.to_string());
            LocationSummary {
                use_current_location: false,
                description,
            }
        }
    }

    async fn device_fix(&self) -> Result<GeoPoint, DiscoveryError> {
        if self.device.request_permission().await == PermissionStatus::Denied {
            return Err(DiscoveryError::PermissionDenied);
        }
        self.device.current_position(true).await
    }
}
