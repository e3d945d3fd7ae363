//! HTTP surface for the dispatch engine.
//!
//! Requests are validated and converted into typed commands at this boundary;
//! the orchestrator never sees an untyped payload. Field names follow the
//! dashboard's camelCase wire convention.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    GeoPoint, IncidentId, IncidentPriority, IncidentType, PositionFix, ResponderId,
    ResponderStatus, ResponderType, ZoneId,
};
use super::geo::RouteInfo;
use super::service::{
    DispatchCommand, DispatchError, DispatchOutcome, DispatchService, DispatchTicket,
    UnassignOutcome,
};
use super::store::{AlertPublisher, DispatchStore};

/// Router builder exposing the dispatch, assignment, and lifecycle endpoints.
pub fn dispatch_router<S, A>(service: Arc<DispatchService<S, A>>) -> Router
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/dispatch", post(dispatch_handler::<S, A>))
        .route("/api/v1/assignments", post(assign_handler::<S, A>))
        .route(
            "/api/v1/assignments/unassign",
            post(unassign_handler::<S, A>),
        )
        .route(
            "/api/v1/responders/:responder_id/position",
            put(position_handler::<S, A>),
        )
        .route(
            "/api/v1/responders/:responder_id/status",
            put(status_handler::<S, A>),
        )
        .route(
            "/api/v1/incidents/:incident_id/resolve",
            post(resolve_handler::<S, A>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub incident_id: String,
    pub lat: f64,
    pub lon: f64,
    pub incident_type: IncidentType,
    #[serde(default)]
    pub priority: IncidentPriority,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub auto_dispatch: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder: Option<ResponderView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Dispatcher-facing responder block, with human-readable distance and ETA.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderView {
    pub id: ResponderId,
    pub name: String,
    #[serde(rename = "type")]
    pub responder_type: ResponderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    pub experience: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub incident_id: IncidentId,
    pub status: &'static str,
    pub priority: IncidentPriority,
    pub auto_dispatch: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub average_speed_kmh: f64,
}

impl From<RouteInfo> for RouteView {
    fn from(route: RouteInfo) -> Self {
        Self {
            from: route.from,
            to: route.to,
            distance_km: route.distance_km,
            eta_minutes: route.eta_minutes,
            average_speed_kmh: route.average_speed_kmh,
        }
    }
}

fn responder_view(ticket: &DispatchTicket) -> ResponderView {
    let summary = &ticket.responder;
    ResponderView {
        id: summary.id.clone(),
        name: summary.name.clone(),
        responder_type: summary.responder_type,
        contact: summary.contact.clone(),
        distance: summary
            .distance_km
            .map(|distance| format!("{distance:.2} km")),
        eta: summary.eta_minutes.map(|eta| format!("{eta} minutes")),
        vehicle: summary.vehicle.clone(),
        experience: summary.experience_years,
    }
}

pub(crate) async fn dispatch_handler<S, A>(
    State(service): State<Arc<DispatchService<S, A>>>,
    Json(request): Json<DispatchRequest>,
) -> Response
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    let incident_id = IncidentId(request.incident_id);
    let command = DispatchCommand {
        incident_id: incident_id.clone(),
        location: GeoPoint::new(request.lat, request.lon),
        incident_type: request.incident_type,
        priority: request.priority,
        zone: request.zone.map(ZoneId),
        auto_dispatch: request.auto_dispatch,
    };
    let priority = request.priority;
    let auto_dispatch = request.auto_dispatch;

    match service.dispatch(command) {
        Ok(DispatchOutcome::Dispatched(ticket)) => {
            let response = DispatchResponse {
                success: true,
                responder: Some(responder_view(&ticket)),
                assignment: Some(AssignmentView {
                    incident_id,
                    status: "assigned",
                    priority,
                    auto_dispatch,
                }),
                route: ticket.route.map(RouteView::from),
                message: None,
                timestamp: Utc::now(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(DispatchOutcome::NoSuitableResponder) => {
            let response = DispatchResponse {
                success: false,
                responder: None,
                assignment: None,
                route: None,
                message: Some(
                    "No suitable responders available for this incident type.".to_string(),
                ),
                timestamp: Utc::now(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub responder_id: String,
    pub incident_id: String,
}

pub(crate) async fn assign_handler<S, A>(
    State(service): State<Arc<DispatchService<S, A>>>,
    Json(request): Json<AssignRequest>,
) -> Response
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    let responder_id = ResponderId(request.responder_id);
    let incident_id = IncidentId(request.incident_id);

    match service.assign(&responder_id, &incident_id) {
        Ok(ticket) => {
            let payload = json!({
                "responderId": responder_id,
                "incidentId": incident_id,
                "eta": ticket.responder.eta_minutes,
                "assignmentId": ticket.assignment_id,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignRequest {
    pub responder_id: String,
    pub incident_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

pub(crate) async fn unassign_handler<S, A>(
    State(service): State<Arc<DispatchService<S, A>>>,
    Json(request): Json<UnassignRequest>,
) -> Response
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    let responder_id = ResponderId(request.responder_id);
    let incident_id = IncidentId(request.incident_id);

    match service.unassign(&responder_id, &incident_id, request.reason) {
        Ok(UnassignOutcome::Unassigned) => {
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Ok(UnassignOutcome::NoActiveAssignment) => {
            let payload = json!({
                "success": false,
                "error": "no active assignment for this responder and incident",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdateRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

pub(crate) async fn position_handler<S, A>(
    State(service): State<Arc<DispatchService<S, A>>>,
    Path(responder_id): Path<String>,
    Json(request): Json<PositionUpdateRequest>,
) -> Response
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    let responder_id = ResponderId(responder_id);
    let fix = PositionFix {
        point: GeoPoint::new(request.latitude, request.longitude),
        heading: request.heading,
        speed_kmh: request.speed,
        timestamp: Utc::now(),
    };

    match service.update_position(&responder_id, fix) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(&error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: ResponderStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

pub(crate) async fn status_handler<S, A>(
    State(service): State<Arc<DispatchService<S, A>>>,
    Path(responder_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    let responder_id = ResponderId(responder_id);
    match service.update_responder_status(&responder_id, request.status, request.reason) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(error) => error_response(&error),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub(crate) async fn resolve_handler<S, A>(
    State(service): State<Arc<DispatchService<S, A>>>,
    Path(incident_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Response
where
    S: DispatchStore + 'static,
    A: AlertPublisher + 'static,
{
    let incident_id = IncidentId(incident_id);
    match service.resolve_incident(&incident_id, request.reason) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(error) => error_response(&error),
    }
}

fn error_response(error: &DispatchError) -> Response {
    let status = match error {
        DispatchError::IncidentNotFound(_) | DispatchError::ResponderNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        DispatchError::ResponderUnavailable { .. }
        | DispatchError::TypeIncompatible { .. }
        | DispatchError::IncidentAlreadyAssigned(_)
        | DispatchError::AssignmentStillActive { .. }
        | DispatchError::NoAssignmentForStatus { .. }
        | DispatchError::Concurrency { .. }
        | DispatchError::State(_) => StatusCode::CONFLICT,
        DispatchError::Store(_) | DispatchError::Alert(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "success": false,
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
