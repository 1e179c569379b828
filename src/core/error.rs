use thiserror::Error;

/// Failures the discovery flow can surface to a session.
///
/// All of them are recoverable: the caller offers a retry instead of
/// tearing the session down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("No location available: no device fix and no custom location")]
    NoLocationAvailable,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream is rate limiting requests")]
    RateLimited,
}

impl DiscoveryError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            DiscoveryError::PermissionDenied => "permission_denied",
            DiscoveryError::NoLocationAvailable => "no_location_available",
            DiscoveryError::Upstream(_) => "upstream_error",
            DiscoveryError::RateLimited => "rate_limited",
        }
    }
}
