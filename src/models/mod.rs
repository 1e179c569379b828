// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Candidate, CityPrediction, CustomLocation, GeoPoint, LocationPreference, Locality, PlaceDetails,
    RadiusPolicy, SearchState, SwipeDecision, SwipeDirection,
};
pub use requests::{
    AutocompleteQuery, CustomLocationRequest, DecideRequest, DeviceLocationRequest, PhotoQuery, ResumeRequest,
    StartSessionRequest,
};
pub use responses::{
    DecideResponse, ErrorResponse, HealthResponse, LikesResponse, MoreResponse, PlaceDetailsResponse, ResumeResponse,
    SessionResponse,
};
