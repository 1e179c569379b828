use crate::core::distance::{haversine_distance, moved_beyond};
use crate::core::{DiscoveryEngine, DiscoveryError, ExpandOutcome, LocationSource, SessionLiveness};
use crate::models::{Candidate, GeoPoint, SearchState, SwipeDecision, SwipeDirection};
use serde::Serialize;

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Result of the on-resume location check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ResumeOutcome {
    Unchanged,
    /// Location moved; the session started over from the new center
    Restarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub cursor: usize,
    pub total: usize,
    pub remaining: usize,
    #[serde(rename = "radiusMeters")]
    pub radius_meters: u32,
    pub likes: usize,
}

/// One user's pass through the candidate deck
pub struct SwipeSession {
    engine: DiscoveryEngine,
    state: SearchState,
    baseline: GeoPoint,
    cursor: usize,
    decisions: Vec<SwipeDecision>,
    liveness: SessionLiveness,
    tolerance_deg: f64,
    room_code: String,
}

impl SwipeSession {
    /// Resolve a location and load the first batch of candidates
    pub async fn start(engine: DiscoveryEngine, tolerance_deg: f64) -> Result<Self, DiscoveryError> {
        let liveness = SessionLiveness::new();
        // Nobody else holds the flag yet, so the session cannot be abandoned here
        let Some(state) = engine.start_session(&liveness).await? else {
            return Err(DiscoveryError::Upstream("session abandoned while starting".into()));
        };

        Ok(Self {
            engine,
            baseline: state.center,
            state,
            cursor: 0,
            decisions: Vec::new(),
            liveness,
            tolerance_deg,
            room_code: generate_room_code(),
        })
    }

    pub fn current_candidate(&self) -> Option<&Candidate> {
        self.state.accumulated().get(self.cursor)
    }

    /// Record a swipe on the current candidate and move on.
    ///
    /// `None` when the deck is used up.
    pub fn decide(&mut self, direction: SwipeDirection) -> Option<SwipeDecision> {
        let candidate = self.state.accumulated().get(self.cursor)?;

        let decision = SwipeDecision {
            place_id: candidate.place_id.clone(),
            direction,
            at_index: self.cursor,
            decided_at: chrono::Utc::now(),
        };

        tracing::debug!("{:?}: {}", direction, candidate.name);

        self.decisions.push(decision.clone());
        self.cursor += 1;
        Some(decision)
    }

    /// Deck ran out: widen the search and append whatever is new.
    ///
    /// The cursor stays where it is, so the next candidate is the first
    /// newly appended one.
    pub async fn on_exhausted(&mut self) -> Result<ExpandOutcome, DiscoveryError> {
        let step = self.engine.policy().step_meters;
        let outcome = self.engine.expand(&mut self.state, step, &self.liveness).await?;

        tracing::info!(
            "Load more ended with {:?}: {} candidates at {}m",
            outcome,
            self.state.len(),
            self.state.radius_meters
        );

        Ok(outcome)
    }

    /// Compare the active location source with the session baseline and
    /// start over when it moved.
    ///
    /// Device fixes use the degree tolerance; a custom location counts as
    /// moved on any change. An unreadable location counts as unchanged.
    pub async fn resume(&mut self) -> Result<ResumeOutcome, DiscoveryError> {
        if !self.liveness.is_alive() {
            return Ok(ResumeOutcome::Unchanged);
        }

        let Some(observed) = self.engine.resolver().observe().await else {
            return Ok(ResumeOutcome::Unchanged);
        };

        let moved = match observed.source {
            LocationSource::Device => moved_beyond(self.baseline, observed.point, self.tolerance_deg),
            LocationSource::Custom => observed.point != self.baseline,
        };

        if !moved {
            return Ok(ResumeOutcome::Unchanged);
        }

        tracing::info!(
            "Location moved {:.2} km ({:?}), restarting session",
            haversine_distance(self.baseline, observed.point),
            observed.source
        );

        if self.restart().await? {
            Ok(ResumeOutcome::Restarted)
        } else {
            Ok(ResumeOutcome::Unchanged)
        }
    }

    /// Drop everything and search again from a freshly resolved location.
    ///
    /// The old deck stays in place if the new search fails. Returns `false`
    /// and changes nothing once the session is abandoned.
    pub async fn restart(&mut self) -> Result<bool, DiscoveryError> {
        let Some(state) = self.engine.start_session(&self.liveness).await? else {
            return Ok(false);
        };

        self.baseline = state.center;
        self.state = state;
        self.cursor = 0;
        self.decisions.clear();
        Ok(true)
    }

    /// Tear the session down; any in-flight expansion stops at its next step
    pub fn abandon(&self) {
        self.liveness.abandon();
    }

    pub fn liveness(&self) -> SessionLiveness {
        self.liveness.clone()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn baseline(&self) -> GeoPoint {
        self.baseline
    }

    pub fn decisions(&self) -> &[SwipeDecision] {
        &self.decisions
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    /// Liked candidates in the order they were swiped
    pub fn liked(&self) -> Vec<&Candidate> {
        self.decisions
            .iter()
            .filter(|d| d.direction == SwipeDirection::Like)
            .filter_map(|d| {
                self.state
                    .accumulated()
                    .iter()
                    .find(|c| c.place_id == d.place_id)
            })
            .collect()
    }

    pub fn progress(&self) -> SessionProgress {
        let total = self.state.len();
        SessionProgress {
            cursor: self.cursor,
            total,
            remaining: total.saturating_sub(self.cursor),
            radius_meters: self.state.radius_meters,
            likes: self
                .decisions
                .iter()
                .filter(|d| d.direction == SwipeDirection::Like)
                .count(),
        }
    }
}

/// Six characters from `[0-9A-Z]`, shown to the group as a label
pub fn generate_room_code() -> String {
    let base = ROOM_CODE_ALPHABET.len() as u128;
    let mut n = uuid::Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(ROOM_CODE_LEN);
    for _ in 0..ROOM_CODE_LEN {
        code.push(ROOM_CODE_ALPHABET[(n % base) as usize] as char);
        n /= base;
    }
    code
}
