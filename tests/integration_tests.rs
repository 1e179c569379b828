// Integration tests for Swipe Dine

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use swipe_dine::core::{
    DiscoveryEngine, DiscoveryError, ExpandOutcome, LocationResolver, ResumeOutcome, SessionLiveness, SwipeSession,
    DEFAULT_MOVEMENT_TOLERANCE_DEG,
};
use swipe_dine::models::{Candidate, CustomLocation, GeoPoint, LocationPreference, Locality, RadiusPolicy, SwipeDirection};
use swipe_dine::services::{
    DeviceLocation, DeviceReport, KeyValueStore, LocationStore, MemoryStore, PermissionStatus, PlaceSearch,
    ReportedDeviceLocation,
};

fn create_candidate(id: &str) -> Candidate {
    Candidate {
        place_id: id.to_string(),
        name: format!("Restaurant {}", id),
        rating: Some(4.2),
        rating_count: 42,
        address: "Main St".to_string(),
        location: None,
        raw_payload: serde_json::json!({ "place_id": id }),
    }
}

/// Places fake that answers per radius and records the radii asked for
struct RadiusTable {
    answers: Vec<(u32, Vec<&'static str>)>,
    calls: Mutex<Vec<u32>>,
}

impl RadiusTable {
    fn new(answers: Vec<(u32, Vec<&'static str>)>) -> Self {
        Self {
            answers,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceSearch for RadiusTable {
    async fn search(&self, _center: GeoPoint, radius_meters: u32) -> Result<Vec<Candidate>, DiscoveryError> {
        self.calls.lock().unwrap().push(radius_meters);
        let ids = self
            .answers
            .iter()
            .find(|(r, _)| *r == radius_meters)
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default();
        Ok(ids.into_iter().map(create_candidate).collect())
    }
}

fn granted(lat: f64, lon: f64) -> DeviceReport {
    DeviceReport {
        permission_granted: true,
        latitude: Some(lat),
        longitude: Some(lon),
    }
}

async fn device_at(lat: f64, lon: f64) -> Arc<ReportedDeviceLocation> {
    let device = Arc::new(ReportedDeviceLocation::new(None));
    device.update(granted(lat, lon)).await;
    device
}

fn store() -> LocationStore {
    let raw: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    LocationStore::new(raw)
}

fn ids(session: &SwipeSession) -> Vec<String> {
    session
        .state()
        .accumulated()
        .iter()
        .map(|c| c.place_id.clone())
        .collect()
}

#[tokio::test]
async fn test_expand_appends_only_new_places() {
    let places = Arc::new(RadiusTable::new(vec![
        (1500, vec!["P1", "P2"]),
        (3000, vec!["P1", "P2", "P3"]),
    ]));
    let device = device_at(0.0, 0.0).await;
    let engine = DiscoveryEngine::new(LocationResolver::new(store(), device), places.clone(), RadiusPolicy::default());
    let liveness = SessionLiveness::new();

    let mut state = engine.start_session(&liveness).await.unwrap().unwrap();
    let outcome = engine.expand(&mut state, 1500, &liveness).await.unwrap();

    assert_eq!(outcome, ExpandOutcome::Grew { added: 1 });
    let ids: Vec<_> = state.accumulated().iter().map(|c| c.place_id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P2", "P3"]);
    assert_eq!(state.seen_place_ids().len(), 3);
    assert!(state.has_seen("P3"));
    assert_eq!(places.calls(), vec![1500, 3000]);
}

#[tokio::test]
async fn test_expand_exhausts_at_ceiling_without_error() {
    let same = vec!["P1", "P2"];
    let places = Arc::new(RadiusTable::new(vec![
        (1500, same.clone()),
        (3000, same.clone()),
        (4500, same.clone()),
        (5000, same.clone()),
    ]));
    let device = device_at(0.0, 0.0).await;
    let engine = DiscoveryEngine::new(LocationResolver::new(store(), device), places.clone(), RadiusPolicy::default());
    let liveness = SessionLiveness::new();

    let mut state = engine.start_session(&liveness).await.unwrap().unwrap();
    let outcome = engine.expand(&mut state, 1500, &liveness).await.unwrap();

    assert_eq!(outcome, ExpandOutcome::Exhausted);
    assert_eq!(state.len(), 2);
    assert_eq!(places.calls(), vec![1500, 3000, 4500, 5000]);
    assert!(state.radius_meters <= 5000);
}

#[tokio::test]
async fn test_default_preference_with_denied_permission() {
    let device = Arc::new(ReportedDeviceLocation::new(None));
    device
        .update(DeviceReport {
            permission_granted: false,
            latitude: None,
            longitude: None,
        })
        .await;

    let store = store();
    store
        .set_custom_location(&CustomLocation::new(GeoPoint::new(1.0, 1.0), "Somewhere"))
        .await;
    let resolver = LocationResolver::new(store.clone(), device);

    assert!(store.stored_preference().await.is_none());
    assert_eq!(resolver.resolve().await.unwrap_err(), DiscoveryError::PermissionDenied);
}

#[tokio::test]
async fn test_custom_preference_without_custom_location() {
    let store = store();
    store
        .set_preference(LocationPreference { use_current_location: false })
        .await;
    let resolver = LocationResolver::new(store, device_at(1.0, 2.0).await);

    assert_eq!(resolver.resolve().await.unwrap_err(), DiscoveryError::NoLocationAvailable);
}

#[tokio::test]
async fn test_resume_restarts_after_move() {
    let places = Arc::new(RadiusTable::new(vec![
        (1500, vec!["P1", "P2"]),
        (3000, vec!["P1", "P2", "P3"]),
    ]));
    let device = device_at(10.000, 20.000).await;
    let engine = DiscoveryEngine::new(
        LocationResolver::new(store(), device.clone()),
        places.clone(),
        RadiusPolicy::default(),
    );

    let mut session = SwipeSession::start(engine, DEFAULT_MOVEMENT_TOLERANCE_DEG).await.unwrap();
    session.decide(SwipeDirection::Like);
    session.decide(SwipeDirection::Dislike);
    session.on_exhausted().await.unwrap();
    assert_eq!(ids(&session), vec!["P1", "P2", "P3"]);

    device.update(granted(10.02, 20.000)).await;
    let outcome = session.resume().await.unwrap();

    assert_eq!(outcome, ResumeOutcome::Restarted);
    assert_eq!(ids(&session), vec!["P1", "P2"]);
    assert_eq!(session.state().radius_meters, 1500);
    assert_eq!(session.state().seen_place_ids().len(), 2);
    assert!(session.decisions().is_empty());
    assert_eq!(places.calls(), vec![1500, 3000, 1500]);
}

#[tokio::test]
async fn test_radius_never_exceeds_ceiling_with_odd_step() {
    let places = Arc::new(RadiusTable::new(vec![(1500, vec!["P1"])]));
    let device = device_at(0.0, 0.0).await;
    let engine = DiscoveryEngine::new(LocationResolver::new(store(), device), places.clone(), RadiusPolicy::default());
    let liveness = SessionLiveness::new();

    let mut state = engine.start_session(&liveness).await.unwrap().unwrap();
    let mut last = state.radius_meters;
    for _ in 0..4 {
        engine.expand(&mut state, 2000, &liveness).await.unwrap();
        assert!(state.radius_meters >= last);
        assert!(state.radius_meters <= 5000);
        last = state.radius_meters;
    }

    assert_eq!(places.calls(), vec![1500, 3500, 5000]);
}

#[tokio::test]
async fn test_accumulated_never_holds_duplicates() {
    let places = Arc::new(RadiusTable::new(vec![
        (1500, vec!["A", "B", "A"]),
        (3000, vec!["B", "C", "C", "A"]),
        (4500, vec!["D", "A", "E"]),
        (5000, vec!["E", "F"]),
    ]));
    let device = device_at(0.0, 0.0).await;
    let engine = DiscoveryEngine::new(LocationResolver::new(store(), device), places, RadiusPolicy::default());
    let liveness = SessionLiveness::new();

    let mut state = engine.start_session(&liveness).await.unwrap().unwrap();
    while let ExpandOutcome::Grew { .. } = engine.expand(&mut state, 1500, &liveness).await.unwrap() {}

    let ids: Vec<_> = state.accumulated().iter().map(|c| c.place_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D", "E", "F"]);
    assert_eq!(state.seen_place_ids().len(), ids.len());
}

#[tokio::test]
async fn test_start_session_after_location_change_discards_state() {
    let places = Arc::new(RadiusTable::new(vec![
        (1500, vec!["P1"]),
        (3000, vec!["P2"]),
    ]));
    let device = device_at(0.0, 0.0).await;
    let engine = DiscoveryEngine::new(
        LocationResolver::new(store(), device.clone()),
        places,
        RadiusPolicy::default(),
    );
    let liveness = SessionLiveness::new();

    let mut first = engine.start_session(&liveness).await.unwrap().unwrap();
    engine.expand(&mut first, 1500, &liveness).await.unwrap();
    assert_eq!(first.len(), 2);

    device.update(granted(5.0, 5.0)).await;
    let second = engine.start_session(&liveness).await.unwrap().unwrap();

    assert_eq!(second.center, GeoPoint::new(5.0, 5.0));
    assert_eq!(second.radius_meters, 1500);
    assert_eq!(second.len(), 1);
    assert!(!second.has_seen("P2"));
}

/// Geocoder that always fails, to check the description fallback end to end
struct BrokenGeocoder;

#[async_trait]
impl DeviceLocation for BrokenGeocoder {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<GeoPoint, DiscoveryError> {
        Ok(GeoPoint::new(52.52, 13.405))
    }

    async fn reverse_geocode(&self, _point: GeoPoint) -> Result<Option<Locality>, DiscoveryError> {
        Err(DiscoveryError::Upstream("timeout".into()))
    }
}

#[tokio::test]
async fn test_location_summary_falls_back_to_coordinates() {
    let resolver = LocationResolver::new(store(), Arc::new(BrokenGeocoder));
    let summary = resolver.summary().await;

    assert!(summary.use_current_location);
    assert_eq!(summary.description, "52.520, 13.405");
}

mod http {
    use super::*;
    use actix_web::{test, web, App};
    use std::time::Duration;
    use swipe_dine::routes::{self, sessions::AppState};
    use swipe_dine::services::{DeviceRegistry, GooglePlacesClient, SessionRegistry};

    fn app_state(search: Arc<RadiusTable>) -> AppState {
        app_state_with(search, "http://127.0.0.1:9", "test-key", 60)
    }

    fn app_state_with(search: Arc<RadiusTable>, places_url: &str, api_key: &str, device_idle_secs: u64) -> AppState {
        let places = Arc::new(GooglePlacesClient::new(
            places_url.to_string(),
            api_key.to_string(),
            Duration::from_secs(1),
        ));

        AppState {
            places,
            search,
            store: Arc::new(MemoryStore::new()),
            devices: Arc::new(DeviceRegistry::new(100, device_idle_secs, None)),
            sessions: SessionRegistry::new(100, 60),
            policy: RadiusPolicy::default(),
            movement_tolerance_deg: DEFAULT_MOVEMENT_TOLERANCE_DEG,
        }
    }

    #[actix_web::test]
    async fn test_swipe_flow_over_http() {
        let search = Arc::new(RadiusTable::new(vec![
            (1500, vec!["P1", "P2"]),
            (3000, vec!["P1", "P2", "P3"]),
        ]));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(search)))
                .configure(routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(serde_json::json!({
                "userId": "u1",
                "device": { "permissionGranted": true, "latitude": 10.0, "longitude": 20.0 }
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = body["sessionId"].as_str().unwrap().to_string();
        assert_eq!(body["current"]["placeId"], "P1");
        assert_eq!(body["progress"]["total"], 2);

        for direction in ["like", "dislike"] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/v1/sessions/{}/decisions", id))
                .set_json(serde_json::json!({ "direction": direction }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/more", id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"], "grew");
        assert_eq!(body["added"], 1);
        assert_eq!(body["session"]["current"]["placeId"], "P3");
        assert_eq!(body["session"]["radiusMeters"], 3000);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/sessions/{}/likes", id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["likes"].as_array().unwrap().len(), 1);
        assert_eq!(body["likes"][0]["placeId"], "P1");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/sessions/{}", id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 204);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/sessions/{}", id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
    }

    #[actix_web::test]
    async fn test_denied_permission_is_retryable_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(Arc::new(RadiusTable::new(vec![])))))
                .configure(routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(serde_json::json!({
                "userId": "u2",
                "device": { "permissionGranted": false }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 403);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "permission_denied");
        assert_eq!(body["retryable"], true);
    }

    #[actix_web::test]
    async fn test_session_sees_location_reported_after_device_idle() {
        let search = Arc::new(RadiusTable::new(vec![(1500, vec!["P1", "P2"])]));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state_with(search, "http://127.0.0.1:9", "test-key", 1)))
                .configure(routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(serde_json::json!({
                "userId": "u3",
                "device": { "permissionGranted": true, "latitude": 10.0, "longitude": 20.0 }
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = body["sessionId"].as_str().unwrap().to_string();

        // Let the device entry go idle while the session stays registered
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let req = test::TestRequest::put()
            .uri("/api/v1/users/u3/location/current")
            .set_json(serde_json::json!({
                "device": { "permissionGranted": true, "latitude": 30.0, "longitude": 40.0 }
            }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/resume", id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["outcome"], "restarted");
        assert_eq!(body["session"]["center"]["latitude"], 30.0);
        assert_eq!(body["session"]["center"]["longitude"], 40.0);
    }

    #[actix_web::test]
    async fn test_place_details_never_expose_api_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/place/details/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "status": "OK",
                    "result": { "photos": [{ "photo_reference": "ref" }] }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/place/photo")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("photoreference".into(), "ref".into()),
                mockito::Matcher::UrlEncoded("key".into(), "SECRET_SERVER_KEY".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body("jpeg-bytes")
            .create_async()
            .await;

        let state = app_state_with(Arc::new(RadiusTable::new(vec![])), &server.url(), "SECRET_SERVER_KEY", 60);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/places/p1").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("SECRET_SERVER_KEY"));

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let photo_url = json["photoUrls"][0].as_str().unwrap().to_string();
        assert_eq!(photo_url, "/api/v1/places/photos/ref?maxwidth=800");
        assert_eq!(json["photoReferences"][0], "ref");

        let req = test::TestRequest::get().uri(&photo_url).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/jpeg");
        assert_eq!(test::read_body(resp).await, "jpeg-bytes");
    }
}
