//! Great-circle distance and arrival-time estimation.
//!
//! This is deliberately not a routing engine: distances are haversine over an
//! idealized sphere and ETAs assume a constant travel speed, defaulted per
//! responder type and overridden by the unit's last observed speed.

use serde::Serialize;

use super::domain::{GeoPoint, Responder, ResponderType};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Estimated arrival time in whole minutes at the given speed.
pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
    (distance_km / speed_kmh * 60.0).round() as u32
}

/// Assumed travel speed per responder type, in km/h.
pub const fn default_speed_kmh(responder_type: ResponderType) -> f64 {
    match responder_type {
        ResponderType::Fire => 50.0,
        ResponderType::Medical => 60.0,
        ResponderType::Security => 30.0,
        ResponderType::Police | ResponderType::Emergency => 40.0,
    }
}

/// Speed used for a responder's ETA: the last observed speed when one was
/// reported, otherwise the per-type default.
pub fn travel_speed_kmh(responder: &Responder) -> f64 {
    responder
        .position
        .as_ref()
        .and_then(|fix| fix.speed_kmh)
        .filter(|speed| *speed > 0.0)
        .unwrap_or_else(|| default_speed_kmh(responder.responder_type))
}

/// Straight-line route summary attached to dispatch results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub average_speed_kmh: f64,
}

/// Compute the route from a responder's current position to a destination.
/// Returns `None` when the responder has never reported a position.
pub fn route_info(responder: &Responder, destination: GeoPoint) -> Option<RouteInfo> {
    let origin = responder.position.as_ref()?.point;
    let distance_km = haversine_km(origin, destination);
    let average_speed_kmh = travel_speed_kmh(responder);

    Some(RouteInfo {
        from: origin,
        to: destination,
        distance_km,
        eta_minutes: eta_minutes(distance_km, average_speed_kmh),
        average_speed_kmh,
    })
}
