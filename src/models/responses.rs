use crate::core::{ExpandOutcome, ResumeOutcome, SessionProgress, SwipeSession};
use crate::models::domain::{Candidate, GeoPoint, PlaceDetails, SwipeDecision};
use serde::{Deserialize, Serialize};

/// Snapshot of a session for the swipe view
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "roomCode")]
    pub room_code: String,
    pub center: GeoPoint,
    #[serde(rename = "radiusMeters")]
    pub radius_meters: u32,
    pub current: Option<Candidate>,
    pub progress: SessionProgress,
}

impl SessionResponse {
    pub fn from_session(session_id: &str, session: &SwipeSession) -> Self {
        Self {
            session_id: session_id.to_string(),
            room_code: session.room_code().to_string(),
            center: session.baseline(),
            radius_meters: session.state().radius_meters,
            current: session.current_candidate().cloned(),
            progress: session.progress(),
        }
    }
}

/// Response for a recorded swipe
#[derive(Debug, Clone, Serialize)]
pub struct DecideResponse {
    pub decision: SwipeDecision,
    pub session: SessionResponse,
}

/// Response for "load more"
#[derive(Debug, Clone, Serialize)]
pub struct MoreResponse {
    #[serde(flatten)]
    pub outcome: ExpandOutcome,
    pub session: SessionResponse,
}

/// Response for the resume check
#[derive(Debug, Clone, Serialize)]
pub struct ResumeResponse {
    #[serde(flatten)]
    pub outcome: ResumeOutcome,
    pub session: SessionResponse,
}

/// Liked restaurants of a session
#[derive(Debug, Clone, Serialize)]
pub struct LikesResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub likes: Vec<Candidate>,
}

/// Restaurant details with photo URLs on this API
#[derive(Debug, Clone, Serialize)]
pub struct PlaceDetailsResponse {
    #[serde(flatten)]
    pub details: PlaceDetails,
    #[serde(rename = "photoUrls")]
    pub photo_urls: Vec<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(rename = "activeSessions")]
    pub active_sessions: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// The client should offer a retry rather than an empty state
    pub retryable: bool,
}
