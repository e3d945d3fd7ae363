//! Explicit lifecycle state machines for responders, incidents, and
//! assignments.
//!
//! Every permitted transition is enumerated here; anything off the table is a
//! typed [`StateError`]. Responder and incident transitions append an audit
//! entry to the entity's append-only history.

use chrono::{DateTime, Utc};

use super::domain::{
    Assignment, AssignmentStatus, Incident, IncidentStatus, Responder, ResponderStatus,
    StatusChange,
};

/// Rejection raised when a requested transition is not in the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("invalid responder transition {from} -> {to}")]
    Responder {
        from: ResponderStatus,
        to: ResponderStatus,
    },
    #[error("invalid incident transition {from} -> {to}")]
    Incident {
        from: IncidentStatus,
        to: IncidentStatus,
    },
    #[error("invalid assignment transition {from} -> {to}")]
    Assignment {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },
}

/// available <-> en_route <-> on_scene <-> returning -> available, plus the
/// off-duty and maintenance round trips out of available.
pub fn responder_transition_allowed(from: ResponderStatus, to: ResponderStatus) -> bool {
    use ResponderStatus::*;

    matches!(
        (from, to),
        (Available, EnRoute)
            | (Available, OffDuty)
            | (Available, Maintenance)
            | (EnRoute, Available)
            | (EnRoute, OnScene)
            | (OnScene, EnRoute)
            | (OnScene, Returning)
            | (Returning, OnScene)
            | (Returning, Available)
            | (OffDuty, Available)
            | (Maintenance, Available)
    )
}

/// reported -> investigating -> assigned -> active -> resolved -> closed,
/// with the direct dispatch edge reported -> assigned and the unassignment
/// rollbacks assigned -> reported and active -> reported.
pub fn incident_transition_allowed(from: IncidentStatus, to: IncidentStatus) -> bool {
    use IncidentStatus::*;

    matches!(
        (from, to),
        (Reported, Investigating)
            | (Reported, Assigned)
            | (Investigating, Assigned)
            | (Assigned, Active)
            | (Assigned, Reported)
            | (Active, Reported)
            | (Active, Resolved)
            | (Resolved, Closed)
    )
}

/// Assignments leave `assigned` exactly once, to `unassigned` or `completed`.
pub fn assignment_transition_allowed(from: AssignmentStatus, to: AssignmentStatus) -> bool {
    use AssignmentStatus::*;

    matches!((from, to), (Assigned, Unassigned) | (Assigned, Completed))
}

/// Move a responder to `to`, appending the audit entry.
pub fn transition_responder(
    responder: &mut Responder,
    to: ResponderStatus,
    at: DateTime<Utc>,
    reason: &str,
) -> Result<(), StateError> {
    let from = responder.status;
    if !responder_transition_allowed(from, to) {
        return Err(StateError::Responder { from, to });
    }

    responder.status_history.push(StatusChange {
        from,
        to,
        timestamp: at,
        reason: reason.to_string(),
    });
    responder.status = to;
    Ok(())
}

/// Move an incident to `to`, appending the audit entry.
pub fn transition_incident(
    incident: &mut Incident,
    to: IncidentStatus,
    at: DateTime<Utc>,
    reason: &str,
) -> Result<(), StateError> {
    let from = incident.status;
    if !incident_transition_allowed(from, to) {
        return Err(StateError::Incident { from, to });
    }

    incident.status_history.push(StatusChange {
        from,
        to,
        timestamp: at,
        reason: reason.to_string(),
    });
    incident.status = to;
    Ok(())
}

/// Move an assignment to `to`. Progress markers on the assignment are
/// recorded separately by the orchestrator.
pub fn transition_assignment(
    assignment: &mut Assignment,
    to: AssignmentStatus,
) -> Result<(), StateError> {
    let from = assignment.status;
    if !assignment_transition_allowed(from, to) {
        return Err(StateError::Assignment { from, to });
    }

    assignment.status = to;
    Ok(())
}
