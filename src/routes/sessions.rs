use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{DiscoveryEngine, DiscoveryError, LocationResolver, SwipeSession};
use crate::models::{
    DecideRequest, DecideResponse, ErrorResponse, HealthResponse, LikesResponse, MoreResponse, RadiusPolicy,
    ResumeRequest, ResumeResponse, SessionResponse, StartSessionRequest,
};
use crate::services::{
    DeviceLocation, DeviceRegistry, GooglePlacesClient, KeyValueStore, LocationStore, PlaceSearch, RegisteredDevice,
    ScopedStore, SessionRegistry,
};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub places: Arc<GooglePlacesClient>,
    pub search: Arc<dyn PlaceSearch>,
    pub store: Arc<dyn KeyValueStore>,
    pub devices: Arc<DeviceRegistry>,
    pub sessions: SessionRegistry,
    pub policy: RadiusPolicy,
    pub movement_tolerance_deg: f64,
}

impl AppState {
    /// Location resolver bound to one user's keys and device
    pub fn resolver_for(&self, user_id: &str, device: Arc<dyn DeviceLocation>) -> LocationResolver {
        let store = ScopedStore::for_user(self.store.clone(), user_id);
        LocationResolver::new(LocationStore::new(Arc::new(store)), device)
    }

    /// Engine for a session; the device is looked up in the registry on
    /// every use so later location reports reach the session
    pub fn engine_for(&self, user_id: &str) -> DiscoveryEngine {
        let device = Arc::new(RegisteredDevice::new(self.devices.clone(), user_id));
        DiscoveryEngine::new(self.resolver_for(user_id, device), self.search.clone(), self.policy)
    }
}

/// Configure all session routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/sessions", web::post().to(start_session))
        .route("/sessions/{id}", web::get().to(get_session))
        .route("/sessions/{id}", web::delete().to(end_session))
        .route("/sessions/{id}/decisions", web::post().to(decide))
        .route("/sessions/{id}/more", web::post().to(load_more))
        .route("/sessions/{id}/resume", web::post().to(resume))
        .route("/sessions/{id}/likes", web::get().to(likes));
}

/// Map a discovery failure to a retryable error response
pub fn discovery_error_response(err: &DiscoveryError) -> HttpResponse {
    let status = match err {
        DiscoveryError::PermissionDenied => StatusCode::FORBIDDEN,
        DiscoveryError::NoLocationAvailable => StatusCode::CONFLICT,
        DiscoveryError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        DiscoveryError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
        retryable: true,
    })
}

pub fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
        retryable: false,
    })
}

fn session_not_found(id: &str) -> HttpResponse {
    error_response(StatusCode::NOT_FOUND, "session_not_found", format!("No live session {}", id))
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.sessions.count(),
        timestamp: chrono::Utc::now(),
    })
}

/// Start a session
///
/// POST /api/v1/sessions
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "device": { "permissionGranted": true, "latitude": 52.52, "longitude": 13.40 }
/// }
/// ```
async fn start_session(
    state: web::Data<AppState>,
    req: web::Json<StartSessionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let user_id = &req.user_id;
    state.devices.device_with_report(user_id, req.device).await;
    let engine = state.engine_for(user_id);

    let session = match SwipeSession::start(engine, state.movement_tolerance_deg).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Failed to start session for {}: {}", user_id, e);
            return discovery_error_response(&e);
        }
    };

    let (id, entry) = state.sessions.insert(user_id, session).await;
    let session = entry.session.lock().await;

    HttpResponse::Created().json(SessionResponse::from_session(&id, &session))
}

/// Current card and progress
///
/// GET /api/v1/sessions/{id}
async fn get_session(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let Some(entry) = state.sessions.get(&id).await else {
        return session_not_found(&id);
    };

    let session = entry.session.lock().await;
    HttpResponse::Ok().json(SessionResponse::from_session(&id, &session))
}

/// Record a swipe on the current card
///
/// POST /api/v1/sessions/{id}/decisions
///
/// Request body:
/// ```json
/// { "direction": "like|dislike" }
/// ```
async fn decide(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<DecideRequest>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(entry) = state.sessions.get(&id).await else {
        return session_not_found(&id);
    };

    let mut session = entry.session.lock().await;
    match session.decide(req.direction) {
        Some(decision) => HttpResponse::Ok().json(DecideResponse {
            decision,
            session: SessionResponse::from_session(&id, &session),
        }),
        None => error_response(
            StatusCode::CONFLICT,
            "out_of_candidates",
            "No candidate to decide on; load more first",
        ),
    }
}

/// Widen the search after the deck ran out
///
/// POST /api/v1/sessions/{id}/more
async fn load_more(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let Some(entry) = state.sessions.get(&id).await else {
        return session_not_found(&id);
    };

    let mut session = entry.session.lock().await;
    match session.on_exhausted().await {
        Ok(outcome) => HttpResponse::Ok().json(MoreResponse {
            outcome,
            session: SessionResponse::from_session(&id, &session),
        }),
        Err(e) => {
            tracing::warn!("Load more failed for session {}: {}", id, e);
            discovery_error_response(&e)
        }
    }
}

/// Location check when the swipe view regains focus
///
/// POST /api/v1/sessions/{id}/resume
async fn resume(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: Option<web::Json<ResumeRequest>>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(entry) = state.sessions.get(&id).await else {
        return session_not_found(&id);
    };

    if let Some(report) = req.and_then(|r| r.into_inner().device) {
        state.devices.device_with_report(&entry.user_id, Some(report)).await;
    }

    let mut session = entry.session.lock().await;
    match session.resume().await {
        Ok(outcome) => HttpResponse::Ok().json(ResumeResponse {
            outcome,
            session: SessionResponse::from_session(&id, &session),
        }),
        Err(e) => {
            tracing::warn!("Restart after location change failed for session {}: {}", id, e);
            discovery_error_response(&e)
        }
    }
}

/// Liked restaurants so far
///
/// GET /api/v1/sessions/{id}/likes
async fn likes(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let Some(entry) = state.sessions.get(&id).await else {
        return session_not_found(&id);
    };

    let session = entry.session.lock().await;
    HttpResponse::Ok().json(LikesResponse {
        session_id: id.clone(),
        likes: session.liked().into_iter().cloned().collect(),
    })
}

/// Abandon a session
///
/// DELETE /api/v1/sessions/{id}
///
/// Does not wait for the session lock, so an expansion in flight sees the
/// liveness flag drop and stops at its next step.
async fn end_session(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    match state.sessions.remove(&id).await {
        Some(entry) => {
            tracing::info!("Session {} for user {} ended", id, entry.user_id);
            HttpResponse::NoContent().finish()
        }
        None => session_not_found(&id),
    }
}
