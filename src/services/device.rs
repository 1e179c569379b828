use crate::core::DiscoveryError;
use crate::models::{GeoPoint, Locality};
use crate::services::places::GooglePlacesClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Access to the user's device position
#[async_trait]
pub trait DeviceLocation: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self, high_accuracy: bool) -> Result<GeoPoint, DiscoveryError>;

    /// `Ok(None)` when the geocoder knows nothing about the point
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Locality>, DiscoveryError>;
}

/// What the mobile client last told us about its location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    #[serde(rename = "permissionGranted")]
    pub permission_granted: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl DeviceReport {
    pub fn fix(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

/// Device location on the server side.
///
/// The phone owns GPS and the permission prompt; it reports both with its
/// requests and this type serves the most recent report. Reverse geocoding
/// goes through the places client.
pub struct ReportedDeviceLocation {
    report: RwLock<Option<DeviceReport>>,
    geocoder: Option<Arc<GooglePlacesClient>>,
}

impl ReportedDeviceLocation {
    pub fn new(geocoder: Option<Arc<GooglePlacesClient>>) -> Self {
        Self {
            report: RwLock::new(None),
            geocoder,
        }
    }

    pub async fn update(&self, report: DeviceReport) {
        *self.report.write().await = Some(report);
    }

    pub async fn latest(&self) -> Option<DeviceReport> {
        *self.report.read().await
    }
}

#[async_trait]
impl DeviceLocation for ReportedDeviceLocation {
    async fn request_permission(&self) -> PermissionStatus {
        match self.latest().await {
            Some(report) if report.permission_granted => PermissionStatus::Granted,
            _ => PermissionStatus::Denied,
        }
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<GeoPoint, DiscoveryError> {
        let report = self.latest().await.ok_or(DiscoveryError::NoLocationAvailable)?;
        if !report.permission_granted {
            return Err(DiscoveryError::PermissionDenied);
        }
        report.fix().ok_or(DiscoveryError::NoLocationAvailable)
    }

    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Locality>, DiscoveryError> {
        match &self.geocoder {
            Some(geocoder) => Ok(geocoder.reverse_geocode(point).await?),
            None => Ok(None),
        }
    }
}

/// Per-user device handles, dropped after a period of inactivity
pub struct DeviceRegistry {
    devices: moka::future::Cache<String, Arc<ReportedDeviceLocation>>,
    geocoder: Option<Arc<GooglePlacesClient>>,
}

impl DeviceRegistry {
    pub fn new(capacity: u64, idle_secs: u64, geocoder: Option<Arc<GooglePlacesClient>>) -> Self {
        let devices = moka::future::CacheBuilder::new(capacity)
            .time_to_idle(Duration::from_secs(idle_secs))
            .build();

        Self { devices, geocoder }
    }

    /// Device handle for `user_id`, created on first use
    pub async fn device(&self, user_id: &str) -> Arc<ReportedDeviceLocation> {
        let geocoder = self.geocoder.clone();
        self.devices
            .get_with(user_id.to_string(), async move {
                Arc::new(ReportedDeviceLocation::new(geocoder))
            })
            .await
    }

    /// Device handle with `report` applied when one was sent
    pub async fn device_with_report(
        &self,
        user_id: &str,
        report: Option<DeviceReport>,
    ) -> Arc<ReportedDeviceLocation> {
        let device = self.device(user_id).await;
        if let Some(report) = report {
            device.update(report).await;
        }
        device
    }
}

/// One user's device as the registry currently holds it.
///
/// Every call goes through the registry, so a long-lived session sees the
/// latest report even after the registry replaced an idle handle.
#[derive(Clone)]
pub struct RegisteredDevice {
    registry: Arc<DeviceRegistry>,
    user_id: String,
}

impl RegisteredDevice {
    pub fn new(registry: Arc<DeviceRegistry>, user_id: &str) -> Self {
        Self {
            registry,
            user_id: user_id.to_string(),
        }
    }
}

#[async_trait]
impl DeviceLocation for RegisteredDevice {
    async fn request_permission(&self) -> PermissionStatus {
        self.registry.device(&self.user_id).await.request_permission().await
    }

    async fn current_position(&self, high_accuracy: bool) -> Result<GeoPoint, DiscoveryError> {
        self.registry
            .device(&self.user_id)
            .await
            .current_position(high_accuracy)
            .await
    }

    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Locality>, DiscoveryError> {
        self.registry.device(&self.user_id).await.reverse_geocode(point).await
    }
}
