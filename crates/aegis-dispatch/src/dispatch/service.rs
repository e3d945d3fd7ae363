use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Assignment, AssignmentEvent, AssignmentId, AssignmentStatus, GeoPoint, Incident, IncidentId,
    IncidentPriority, IncidentStatus, IncidentType, PositionFix, Responder, ResponderId,
    ResponderStatus, ResponderType, ZoneId,
};
use super::filter::{eligible_candidates, is_compatible, DispatchCriteria};
use super::geo::{self, RouteInfo};
use super::scoring::select_best;
use super::state::{
    transition_assignment, transition_incident, transition_responder, StateError,
};
use super::store::{
    AlertError, AlertPublisher, CriticalDispatchAlert, DispatchStore, StoreError,
    TransactionContext,
};

/// Engine knobs, loaded from configuration by the service binary.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How many times auto-dispatch re-selects and retries after a commit
    /// conflict before giving up.
    pub max_commit_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 3,
        }
    }
}

/// Auto-dispatch request: find, score, and commit the best responder for an
/// incident.
#[derive(Debug, Clone)]
pub struct DispatchCommand {
    pub incident_id: IncidentId,
    pub location: GeoPoint,
    pub incident_type: IncidentType,
    pub priority: IncidentPriority,
    pub zone: Option<ZoneId>,
    pub auto_dispatch: bool,
}

/// Sanitized responder details returned to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponderSummary {
    pub id: ResponderId,
    pub name: String,
    #[serde(rename = "type")]
    pub responder_type: ResponderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    pub experience_years: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
}

/// Result of a committed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchTicket {
    pub assignment_id: AssignmentId,
    pub responder: ResponderSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteInfo>,
}

/// Outcome of an auto-dispatch request. An empty candidate pool is a normal
/// negative result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Dispatched(DispatchTicket),
    NoSuitableResponder,
}

/// Outcome of an unassignment request. Unassigning a pair with no active
/// assignment is a reported no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignOutcome {
    Unassigned,
    NoActiveAssignment,
}

/// Result of a position report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub position: PositionFix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
}

/// Error raised by the dispatch orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("incident {0} not found")]
    IncidentNotFound(IncidentId),
    #[error("responder {0} not found")]
    ResponderNotFound(ResponderId),
    #[error("responder {id} is not available for assignment (status {status})")]
    ResponderUnavailable {
        id: ResponderId,
        status: ResponderStatus,
    },
    #[error("responder type {responder} is not compatible with incident type {incident}")]
    TypeIncompatible {
        responder: ResponderType,
        incident: IncidentType,
    },
    #[error("incident {0} already has an assigned responder")]
    IncidentAlreadyAssigned(IncidentId),
    #[error("responder {id} is still assigned to incident {incident_id}; unassign first")]
    AssignmentStillActive {
        id: ResponderId,
        incident_id: IncidentId,
    },
    #[error("responder {id} has no active assignment; status {to} is reserved for dispatched units")]
    NoAssignmentForStatus {
        id: ResponderId,
        to: ResponderStatus,
    },
    #[error("assignment could not be committed after {attempts} attempt(s); retry the request")]
    Concurrency { attempts: u32 },
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}

static ASSIGNMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assignment_id() -> AssignmentId {
    let id = ASSIGNMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssignmentId(format!("asg-{id:06}"))
}

/// Orchestrator linking Responder, Incident, and Assignment records through
/// coordinated state transitions. Every multi-entity update runs inside one
/// transaction context so either all three records move or none do.
pub struct DispatchService<S, A> {
    store: Arc<S>,
    alerts: Arc<A>,
    config: DispatchConfig,
}

impl<S, A> DispatchService<S, A>
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(store: Arc<S>, alerts: Arc<A>) -> Self {
        Self::with_config(store, alerts, DispatchConfig::default())
    }

    pub fn with_config(store: Arc<S>, alerts: Arc<A>, config: DispatchConfig) -> Self {
        Self {
            store,
            alerts,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Auto-dispatch: filter the available population, score the pool, and
    /// commit the best match. Retries the whole selection on commit conflict
    /// because a conflict means the chosen responder was just taken.
    pub fn dispatch(&self, command: DispatchCommand) -> Result<DispatchOutcome, DispatchError> {
        let criteria = DispatchCriteria {
            incident_type: command.incident_type,
            priority: command.priority,
            zone: command.zone.clone(),
            position: Some(command.location),
        };

        let mut attempts = 0;
        while attempts <= self.config.max_commit_retries {
            attempts += 1;

            let mut txn = self.store.begin()?;
            let incident = txn
                .incident(&command.incident_id)?
                .ok_or_else(|| DispatchError::IncidentNotFound(command.incident_id.clone()))?;
            if incident.assigned_responder_id.is_some() {
                return Err(DispatchError::IncidentAlreadyAssigned(incident.id));
            }

            let pool = self.store.available_responders()?;
            let best = match select_best(&eligible_candidates(pool, &criteria), command.priority) {
                Some(best) => best,
                None => {
                    txn.abort();
                    info!(incident_id = %command.incident_id, "no suitable responder in pool");
                    return Ok(DispatchOutcome::NoSuitableResponder);
                }
            };

            // Re-read the winner inside the transaction so the commit is
            // gated on it still being available.
            let responder_id = best.candidate.responder.id.clone();
            let responder = match txn.responder(&responder_id)? {
                Some(responder) if responder.status == ResponderStatus::Available => responder,
                _ => {
                    warn!(
                        incident_id = %command.incident_id,
                        %responder_id,
                        "selected responder no longer available; re-selecting"
                    );
                    continue;
                }
            };

            match self.commit_dispatch(
                txn,
                incident,
                responder,
                command.priority,
                command.location,
                command.auto_dispatch,
            ) {
                Ok(ticket) => return Ok(DispatchOutcome::Dispatched(ticket)),
                Err(DispatchError::Store(StoreError::CommitConflict { entity })) => {
                    warn!(
                        incident_id = %command.incident_id,
                        %entity,
                        attempt = attempts,
                        "dispatch commit conflict; re-selecting"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Err(DispatchError::Concurrency { attempts })
    }

    /// Explicitly assign one responder to one incident. Conflicts surface to
    /// the caller, who decides whether to retry.
    pub fn assign(
        &self,
        responder_id: &ResponderId,
        incident_id: &IncidentId,
    ) -> Result<DispatchTicket, DispatchError> {
        let mut txn = self.store.begin()?;

        let incident = txn
            .incident(incident_id)?
            .ok_or_else(|| DispatchError::IncidentNotFound(incident_id.clone()))?;
        let responder = txn
            .responder(responder_id)?
            .ok_or_else(|| DispatchError::ResponderNotFound(responder_id.clone()))?;

        if responder.status != ResponderStatus::Available {
            return Err(DispatchError::ResponderUnavailable {
                id: responder.id,
                status: responder.status,
            });
        }
        if !is_compatible(responder.responder_type, incident.incident_type) {
            return Err(DispatchError::TypeIncompatible {
                responder: responder.responder_type,
                incident: incident.incident_type,
            });
        }
        if incident.assigned_responder_id.is_some() {
            return Err(DispatchError::IncidentAlreadyAssigned(incident.id));
        }

        let priority = incident.priority;
        let destination = incident.location.point;
        match self.commit_dispatch(txn, incident, responder, priority, destination, false) {
            Ok(ticket) => Ok(ticket),
            Err(DispatchError::Store(StoreError::CommitConflict { entity })) => {
                warn!(%incident_id, %responder_id, %entity, "explicit assignment commit conflict");
                Err(DispatchError::Concurrency { attempts: 1 })
            }
            Err(other) => Err(other),
        }
    }

    /// Reverse an active assignment: responder back to available, incident
    /// back to reported, assignment closed as unassigned.
    pub fn unassign(
        &self,
        responder_id: &ResponderId,
        incident_id: &IncidentId,
        reason: Option<String>,
    ) -> Result<UnassignOutcome, DispatchError> {
        let now = Utc::now();
        let reason = reason.unwrap_or_else(|| "manual".to_string());

        let mut txn = self.store.begin()?;
        let mut assignment = match txn.active_assignment(incident_id, responder_id)? {
            Some(assignment) => assignment,
            None => {
                txn.abort();
                return Ok(UnassignOutcome::NoActiveAssignment);
            }
        };

        let mut responder = txn
            .responder(responder_id)?
            .ok_or_else(|| DispatchError::ResponderNotFound(responder_id.clone()))?;
        let mut incident = txn
            .incident(incident_id)?
            .ok_or_else(|| DispatchError::IncidentNotFound(incident_id.clone()))?;

        // A unit pulled off a scene walks back through `returning`; the audit
        // trail keeps both legs.
        if responder.status == ResponderStatus::OnScene {
            transition_responder(&mut responder, ResponderStatus::Returning, now, &reason)?;
        }
        transition_responder(&mut responder, ResponderStatus::Available, now, &reason)?;
        responder.assigned_incident_id = None;
        responder.eta_minutes = None;

        transition_incident(&mut incident, IncidentStatus::Reported, now, &reason)?;
        incident.assigned_responder_id = None;
        incident.assignment_id = None;

        transition_assignment(&mut assignment, AssignmentStatus::Unassigned)?;
        assignment.unassigned_at = Some(now);
        assignment.unassign_reason = Some(reason.clone());

        txn.put_responder(responder);
        txn.put_incident(incident);
        txn.put_assignment(assignment);
        txn.commit()?;

        info!(%incident_id, %responder_id, %reason, "responder unassigned");
        Ok(UnassignOutcome::Unassigned)
    }

    /// Record a responder position fix, recomputing the ETA against the
    /// assigned incident when there is one.
    pub fn update_position(
        &self,
        responder_id: &ResponderId,
        fix: PositionFix,
    ) -> Result<PositionReport, DispatchError> {
        let mut txn = self.store.begin()?;
        let mut responder = txn
            .responder(responder_id)?
            .ok_or_else(|| DispatchError::ResponderNotFound(responder_id.clone()))?;

        responder.record_position(fix.clone());

        let mut eta_minutes = None;
        if let Some(incident_id) = responder.assigned_incident_id.clone() {
            if let Some(incident) = txn.incident(&incident_id)? {
                let distance_km = geo::haversine_km(fix.point, incident.location.point);
                let speed_kmh = geo::travel_speed_kmh(&responder);
                let eta = geo::eta_minutes(distance_km, speed_kmh);
                responder.eta_minutes = Some(eta);
                eta_minutes = Some(eta);

                if let Some(mut assignment) =
                    txn.active_assignment(&incident_id, responder_id)?
                {
                    assignment.location_history.push(fix.clone());
                    txn.put_assignment(assignment);
                }
            }
        }

        txn.put_responder(responder);
        txn.commit()?;

        Ok(PositionReport {
            position: fix,
            eta_minutes,
        })
    }

    /// Standalone responder status report, validated against the state
    /// machine. Arriving on scene advances the linked incident to `active`.
    /// Transitions that would orphan or fabricate an assignment are rejected;
    /// unassignment is the sanctioned path out of a dispatch.
    pub fn update_responder_status(
        &self,
        responder_id: &ResponderId,
        to: ResponderStatus,
        reason: Option<String>,
    ) -> Result<(), DispatchError> {
        let now = Utc::now();
        let reason = reason.unwrap_or_else(|| "status report".to_string());

        let mut txn = self.store.begin()?;
        let mut responder = txn
            .responder(responder_id)?
            .ok_or_else(|| DispatchError::ResponderNotFound(responder_id.clone()))?;

        match (&responder.assigned_incident_id, to) {
            (Some(incident_id), ResponderStatus::Available) => {
                return Err(DispatchError::AssignmentStillActive {
                    id: responder.id,
                    incident_id: incident_id.clone(),
                });
            }
            (None, ResponderStatus::EnRoute | ResponderStatus::OnScene) => {
                return Err(DispatchError::NoAssignmentForStatus {
                    id: responder.id,
                    to,
                });
            }
            _ => {}
        }

        let arriving =
            responder.status == ResponderStatus::EnRoute && to == ResponderStatus::OnScene;
        transition_responder(&mut responder, to, now, &reason)?;

        if arriving {
            if let Some(incident_id) = responder.assigned_incident_id.clone() {
                let mut incident = txn
                    .incident(&incident_id)?
                    .ok_or_else(|| DispatchError::IncidentNotFound(incident_id.clone()))?;
                transition_incident(&mut incident, IncidentStatus::Active, now, "responder on scene")?;
                txn.put_incident(incident);

                if let Some(mut assignment) =
                    txn.active_assignment(&incident_id, responder_id)?
                {
                    assignment.status_history.push(AssignmentEvent {
                        status: ResponderStatus::OnScene,
                        timestamp: now,
                    });
                    txn.put_assignment(assignment);
                }
            }
        }

        txn.put_responder(responder);
        txn.commit()?;

        info!(%responder_id, status = %to, "responder status updated");
        Ok(())
    }

    /// Resolve an active incident: assignment completed, responder released
    /// to return, incident marked resolved.
    pub fn resolve_incident(
        &self,
        incident_id: &IncidentId,
        reason: Option<String>,
    ) -> Result<(), DispatchError> {
        let now = Utc::now();
        let reason = reason.unwrap_or_else(|| "resolved".to_string());

        let mut txn = self.store.begin()?;
        let mut incident = txn
            .incident(incident_id)?
            .ok_or_else(|| DispatchError::IncidentNotFound(incident_id.clone()))?;

        transition_incident(&mut incident, IncidentStatus::Resolved, now, &reason)?;

        if let Some(responder_id) = incident.assigned_responder_id.take() {
            incident.assignment_id = None;

            let mut responder = txn
                .responder(&responder_id)?
                .ok_or_else(|| DispatchError::ResponderNotFound(responder_id.clone()))?;
            transition_responder(&mut responder, ResponderStatus::Returning, now, &reason)?;
            responder.assigned_incident_id = None;
            responder.eta_minutes = None;

            if let Some(mut assignment) = txn.active_assignment(incident_id, &responder_id)? {
                transition_assignment(&mut assignment, AssignmentStatus::Completed)?;
                assignment.completed_at = Some(now);
                assignment.status_history.push(AssignmentEvent {
                    status: ResponderStatus::Returning,
                    timestamp: now,
                });
                txn.put_assignment(assignment);
            }

            txn.put_responder(responder);
        }

        txn.put_incident(incident);
        txn.commit()?;

        info!(%incident_id, "incident resolved");
        Ok(())
    }

    /// Assignment log lookup for one responder, newest first.
    pub fn assignments_for(
        &self,
        responder_id: &ResponderId,
    ) -> Result<Vec<Assignment>, DispatchError> {
        Ok(self.store.assignments_for_responder(responder_id)?)
    }

    /// The shared three-entity commit: responder to en_route, incident to
    /// assigned, a fresh assignment record, all or nothing.
    fn commit_dispatch(
        &self,
        mut txn: Box<dyn TransactionContext>,
        mut incident: Incident,
        mut responder: Responder,
        priority: IncidentPriority,
        destination: GeoPoint,
        auto_dispatch: bool,
    ) -> Result<DispatchTicket, DispatchError> {
        let now = Utc::now();
        let route = geo::route_info(&responder, destination);
        let distance_km = route.as_ref().map(|route| route.distance_km);
        let eta_minutes = route.as_ref().map(|route| route.eta_minutes);

        let assignment_id = next_assignment_id();
        let incident_id = incident.id.clone();
        let responder_id = responder.id.clone();

        transition_responder(&mut responder, ResponderStatus::EnRoute, now, "dispatch")?;
        responder.assigned_incident_id = Some(incident_id.clone());
        responder.eta_minutes = eta_minutes;

        transition_incident(&mut incident, IncidentStatus::Assigned, now, "responder dispatched")?;
        incident.assigned_responder_id = Some(responder_id.clone());
        incident.assignment_id = Some(assignment_id.clone());

        let assignment = Assignment {
            id: assignment_id.clone(),
            incident_id: incident_id.clone(),
            responder_id: responder_id.clone(),
            assigned_at: now,
            status: AssignmentStatus::Assigned,
            distance_km,
            eta_minutes,
            priority,
            incident_type: incident.incident_type,
            zone_id: incident.zone_id.clone(),
            auto_dispatch,
            unassigned_at: None,
            unassign_reason: None,
            completed_at: None,
            status_history: vec![AssignmentEvent {
                status: ResponderStatus::EnRoute,
                timestamp: now,
            }],
            location_history: Vec::new(),
        };

        let summary = ResponderSummary {
            id: responder_id.clone(),
            name: responder.name.clone(),
            responder_type: responder.responder_type,
            contact: responder.contact.clone(),
            vehicle: responder.vehicle.clone(),
            experience_years: responder.experience_years,
            distance_km,
            eta_minutes,
        };
        let alert = (priority == IncidentPriority::Critical).then(|| CriticalDispatchAlert {
            incident_id: incident_id.clone(),
            responder_id: responder_id.clone(),
            incident_type: incident.incident_type,
            zone_id: incident.zone_id.clone(),
            timestamp: now,
        });

        txn.put_responder(responder);
        txn.put_incident(incident);
        txn.put_assignment(assignment);
        txn.commit()?;

        if let Some(alert) = alert {
            self.alerts.publish(alert)?;
        }

        info!(
            %incident_id,
            %responder_id,
            %assignment_id,
            ?eta_minutes,
            "responder dispatched"
        );

        Ok(DispatchTicket {
            assignment_id,
            responder: summary,
            route,
        })
    }
}
