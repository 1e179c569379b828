//! Fakes for the discovery collaborators, shared by the unit tests.

use crate::core::DiscoveryError;
use crate::models::{Candidate, GeoPoint, Locality};
use crate::services::{DeviceLocation, PermissionStatus, PlaceSearch};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

pub fn candidate(place_id: &str) -> Candidate {
    Candidate {
        place_id: place_id.to_string(),
        name: format!("Restaurant {}", place_id),
        rating: Some(4.0),
        rating_count: 10,
        address: "Somewhere 1".to_string(),
        location: None,
        raw_payload: serde_json::json!({ "place_id": place_id }),
    }
}

pub fn candidates(ids: &[&str]) -> Vec<Candidate> {
    ids.iter().map(|id| candidate(id)).collect()
}

pub struct FakeDevice {
    permission: PermissionStatus,
    fix: RwLock<Option<GeoPoint>>,
    locality: Option<Locality>,
    geocode_fails: bool,
    prompts: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub fn granted(fix: GeoPoint) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fix: RwLock::new(Some(fix)),
            locality: None,
            geocode_fails: false,
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            fix: RwLock::new(None),
            locality: None,
            geocode_fails: false,
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_locality(mut self, locality: Locality) -> Self {
        self.locality = Some(locality);
        self
    }

    pub fn with_geocode_error(mut self) -> Self {
        self.geocode_fails = true;
        self
    }

    pub fn prompt_counter(&self) -> Arc<AtomicUsize> {
        self.prompts.clone()
    }

    pub async fn move_to(&self, point: GeoPoint) {
        *self.fix.write().await = Some(point);
    }
}

#[async_trait]
impl DeviceLocation for FakeDevice {
    async fn request_permission(&self) -> PermissionStatus {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.permission
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<GeoPoint, DiscoveryError> {
        if self.permission == PermissionStatus::Denied {
            return Err(DiscoveryError::PermissionDenied);
        }
        self.fix.read().await.ok_or(DiscoveryError::NoLocationAvailable)
    }

    async fn reverse_geocode(&self, _point: GeoPoint) -> Result<Option<Locality>, DiscoveryError> {
        if self.geocode_fails {
            return Err(DiscoveryError::Upstream("geocoder down".into()));
        }
        Ok(self.locality.clone())
    }
}

type Responder = dyn Fn(GeoPoint, u32) -> Result<Vec<Candidate>, DiscoveryError> + Send + Sync;

/// Places fake answering through a closure and recording every call
pub struct ScriptedPlaces {
    respond: Box<Responder>,
    calls: Mutex<Vec<(GeoPoint, u32)>>,
}

impl ScriptedPlaces {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(GeoPoint, u32) -> Result<Vec<Candidate>, DiscoveryError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Same answer at every radius
    pub fn constant(ids: &'static [&'static str]) -> Self {
        Self::new(move |_, _| Ok(candidates(ids)))
    }

    pub fn radii(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(_, r)| *r).collect()
    }

    pub fn centers(&self) -> Vec<GeoPoint> {
        self.calls.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }
}

#[async_trait]
impl PlaceSearch for ScriptedPlaces {
    async fn search(
        &self,
        center: GeoPoint,
        radius_meters: u32,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        self.calls.lock().unwrap().push((center, radius_meters));
        (self.respond)(center, radius_meters)
    }
}
