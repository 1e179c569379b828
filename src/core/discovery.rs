use crate::core::{DiscoveryError, LocationResolver};
use crate::models::{RadiusPolicy, SearchState};
use crate::services::PlaceSearch;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "session still wanted" flag.
///
/// Cloned into whoever may tear the session down; the engine checks it
/// before every radius step.
#[derive(Debug, Clone)]
pub struct SessionLiveness(Arc<AtomicBool>);

impl SessionLiveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn abandon(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for SessionLiveness {
    fn default() -> Self {
        Self::new()
    }
}

/// How an expansion call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ExpandOutcome {
    /// New candidates were appended
    Grew { added: usize },
    /// Ceiling reached with nothing new
    Exhausted,
    /// Session torn down mid-chain; remaining steps skipped
    Abandoned,
}

/// Restaurant discovery orchestrator
///
/// # Radius state machine
/// `Searching(r)` issues a search at the same center with radius
/// `min(r + step, ceiling)`. New candidates end the call; none loops back
/// to `Searching` until the ceiling, where the call ends `Exhausted`.
/// Every step runs after the previous one settled.
#[derive(Clone)]
pub struct DiscoveryEngine {
    resolver: LocationResolver,
    places: Arc<dyn PlaceSearch>,
    policy: RadiusPolicy,
}

impl DiscoveryEngine {
    pub fn new(resolver: LocationResolver, places: Arc<dyn PlaceSearch>, policy: RadiusPolicy) -> Self {
        Self {
            resolver,
            places,
            policy,
        }
    }

    pub fn policy(&self) -> RadiusPolicy {
        self.policy
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// Resolve the center and run the first search into a fresh state.
    ///
    /// An empty first page continues straight into radius expansion.
    /// `None` when the session is abandoned before or during the first
    /// search; an abandoned session resolves nothing and sends no request.
    pub async fn start_session(&self, liveness: &SessionLiveness) -> Result<Option<SearchState>, DiscoveryError> {
        if !liveness.is_alive() {
            tracing::debug!("Session abandoned, not starting a search");
            return Ok(None);
        }

        let center = self.resolver.resolve().await?;
        let radius = self.policy.initial_meters.min(self.policy.ceiling_meters);

        let mut state = SearchState::new(center, radius);
        let found = self.places.search(center, radius).await?;

        if !liveness.is_alive() {
            tracing::debug!("Dropping first page for abandoned session");
            return Ok(None);
        }

        let added = state.absorb(found);

        tracing::info!(
            "Session started at {} with {} candidates (r={}m)",
            center.to_coordinate_string(),
            added,
            radius
        );

        if added == 0 {
            let outcome = self.widen(&mut state, self.policy.step_meters, liveness).await?;
            tracing::debug!("Initial search empty, expansion ended with {:?}", outcome);
            if outcome == ExpandOutcome::Abandoned {
                return Ok(None);
            }
        }

        Ok(Some(state))
    }

    /// Widen the radius by `increment` until something new turns up or the
    /// ceiling is hit.
    ///
    /// A zero `increment` uses the configured step. Errors, including
    /// rate limiting, end the chain at once.
    pub async fn expand(
        &self,
        state: &mut SearchState,
        increment: u32,
        liveness: &SessionLiveness,
    ) -> Result<ExpandOutcome, DiscoveryError> {
        let step = if increment == 0 { self.policy.step_meters } else { increment };
        self.widen(state, step, liveness).await
    }

    async fn widen(
        &self,
        state: &mut SearchState,
        step: u32,
        liveness: &SessionLiveness,
    ) -> Result<ExpandOutcome, DiscoveryError> {
        let ceiling = self.policy.ceiling_meters;

        loop {
            if !liveness.is_alive() {
                tracing::debug!("Session abandoned, stopping expansion at {}m", state.radius_meters);
                return Ok(ExpandOutcome::Abandoned);
            }

            if state.radius_meters >= ceiling {
                tracing::info!(
                    "Radius ceiling {}m reached with {} candidates",
                    ceiling,
                    state.len()
                );
                return Ok(ExpandOutcome::Exhausted);
            }

            let radius = state.radius_meters.saturating_add(step).min(ceiling);
            let found = self.places.search(state.center, radius).await?;

            // A response for a session that went away must not land in it
            if !liveness.is_alive() {
                tracing::debug!("Dropping {}m response for abandoned session", radius);
                return Ok(ExpandOutcome::Abandoned);
            }

            state.widen_to(radius);
            let added = state.absorb(found);

            if added > 0 {
                tracing::debug!("Found {} new restaurants at {}m", added, radius);
                return Ok(ExpandOutcome::Grew { added });
            }

            tracing::debug!("No new restaurants at {}m, increasing radius", radius);
        }
    }
}
