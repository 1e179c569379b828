// Core discovery exports
pub mod discovery;
pub mod distance;
pub mod error;
pub mod location;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use discovery::{DiscoveryEngine, ExpandOutcome, SessionLiveness};
pub use distance::{haversine_distance, moved_beyond, DEFAULT_MOVEMENT_TOLERANCE_DEG};
pub use error::DiscoveryError;
pub use location::{LocationResolver, LocationSource, LocationSummary, ObservedLocation};
pub use session::{generate_room_code, ResumeOutcome, SessionProgress, SwipeSession};
