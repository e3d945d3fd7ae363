//! Candidate filtering: narrow the responder population to the units
//! eligible to answer one incident.

use super::domain::{GeoPoint, IncidentPriority, IncidentType, Responder, ResponderType, ZoneId};
use super::geo::haversine_km;

/// Minimum experience, in years, required to answer a critical incident.
pub const CRITICAL_MIN_EXPERIENCE_YEARS: u32 = 2;

/// What the dispatcher is looking for, derived from the incident being
/// answered (or supplied directly by an auto-dispatch request).
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchCriteria {
    pub incident_type: IncidentType,
    pub priority: IncidentPriority,
    pub zone: Option<ZoneId>,
    pub position: Option<GeoPoint>,
}

/// An eligible responder, annotated with the distance to the incident when a
/// reference position was supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub responder: Responder,
    pub distance_km: Option<f64>,
}

/// Fixed responder-to-incident compatibility table. Police units cover
/// security incidents; emergency units cover everything.
pub fn is_compatible(responder_type: ResponderType, incident_type: IncidentType) -> bool {
    match responder_type {
        ResponderType::Fire => matches!(incident_type, IncidentType::Fire | IncidentType::Emergency),
        ResponderType::Medical => {
            matches!(incident_type, IncidentType::Medical | IncidentType::Emergency)
        }
        ResponderType::Security | ResponderType::Police => {
            matches!(incident_type, IncidentType::Security | IncidentType::Emergency)
        }
        ResponderType::Emergency => true,
    }
}

/// Whether one responder may be dispatched against the given criteria.
pub fn is_eligible(responder: &Responder, criteria: &DispatchCriteria) -> bool {
    if responder.status != super::domain::ResponderStatus::Available {
        return false;
    }

    if responder.on_break {
        return false;
    }

    if !is_compatible(responder.responder_type, criteria.incident_type) {
        return false;
    }

    // A zoned responder only answers its own zone; unzoned units roam.
    if let (Some(requested), Some(assigned)) = (&criteria.zone, &responder.assigned_zone) {
        if requested != assigned {
            return false;
        }
    }

    if criteria.priority == IncidentPriority::Critical {
        if !responder.equipment.critical_response {
            return false;
        }
        if responder.experience_years < CRITICAL_MIN_EXPERIENCE_YEARS {
            return false;
        }
    }

    true
}

/// Reduce the responder population to the eligible candidates, annotating
/// each with its distance to the reference position. An empty result is a
/// normal outcome, not an error.
pub fn eligible_candidates(
    responders: impl IntoIterator<Item = Responder>,
    criteria: &DispatchCriteria,
) -> Vec<Candidate> {
    responders
        .into_iter()
        .filter(|responder| is_eligible(responder, criteria))
        .map(|responder| {
            let distance_km = match (criteria.position, responder.position.as_ref()) {
                (Some(reference), Some(fix)) => Some(haversine_km(fix.point, reference)),
                _ => None,
            };
            Candidate {
                responder,
                distance_km,
            }
        })
        .collect()
}
