//! Swipe Dine - restaurant discovery service for the SwipeAndDine app
//!
//! This library holds the location-aware discovery engine behind the swipe
//! deck: it resolves where to search from, fetches nearby restaurants,
//! deduplicates them across fetches and widens the search radius when the
//! deck runs dry.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{DiscoveryEngine, DiscoveryError, ExpandOutcome, LocationResolver, SessionLiveness, SwipeSession};
pub use models::{Candidate, GeoPoint, RadiusPolicy, SearchState, SwipeDecision, SwipeDirection};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let state = SearchState::new(GeoPoint::new(40.7128, -74.0060), RadiusPolicy::default().initial_meters);
        assert_eq!(state.radius_meters, 1500);
        assert!(state.is_empty());
    }
}
