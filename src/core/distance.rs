use crate::models::GeoPoint;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude/longitude delta treated as "the user moved", about 1.1 km
pub const DEFAULT_MOVEMENT_TOLERANCE_DEG: f64 = 0.01;

/// Calculate the Haversine distance between two points in kilometers
#[inline]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Coarse movement check on raw degrees.
///
/// True when either coordinate moved strictly more than `tolerance_deg`.
/// Not geodesic: city-level granularity is all the resume check needs.
#[inline]
pub fn moved_beyond(baseline: GeoPoint, current: GeoPoint, tolerance_deg: f64) -> bool {
    (current.latitude - baseline.latitude).abs() > tolerance_deg
        || (current.longitude - baseline.longitude).abs() > tolerance_deg
}
