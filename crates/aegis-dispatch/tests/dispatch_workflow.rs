//! Integration scenarios for the dispatch workflow.
//!
//! Scenarios exercise the public service facade and HTTP router end to end:
//! auto-dispatch selection, explicit assignment, unassignment, and the
//! responder lifecycle, without reaching into private modules.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use aegis_dispatch::dispatch::{
        AlertError, AlertPublisher, CriticalDispatchAlert, DispatchService, Equipment, GeoPoint,
        Incident, IncidentId, IncidentLocation, IncidentPriority, IncidentStatus, IncidentType,
        MemoryDispatchStore, PositionFix, Responder, ResponderId, ResponderStatus, ResponderType,
        ZoneId,
    };

    pub(super) fn fix_at(lat: f64, lng: f64) -> PositionFix {
        PositionFix {
            point: GeoPoint::new(lat, lng),
            heading: None,
            speed_kmh: None,
            timestamp: Utc::now(),
        }
    }

    pub(super) fn responder(id: &str, responder_type: ResponderType) -> Responder {
        Responder {
            id: ResponderId(id.to_string()),
            name: format!("Unit {id}"),
            responder_type,
            status: ResponderStatus::Available,
            contact: Some("+91-80-555-0100".to_string()),
            vehicle: Some("Engine 7".to_string()),
            assigned_zone: None,
            on_break: false,
            position: Some(fix_at(12.9716, 77.5946)),
            equipment: Equipment {
                critical_response: true,
                communication: true,
                medical_kit: false,
                defibrillator: false,
                battery_level: 80,
                signal_strength: 90,
            },
            experience_years: 5,
            assigned_incident_id: None,
            eta_minutes: None,
            status_history: Vec::new(),
            position_history: Vec::new(),
        }
    }

    pub(super) fn incident(id: &str, incident_type: IncidentType) -> Incident {
        Incident {
            id: IncidentId(id.to_string()),
            incident_type,
            status: IncidentStatus::Reported,
            priority: IncidentPriority::Medium,
            severity: 3,
            zone_id: ZoneId("zone-a".to_string()),
            location: IncidentLocation {
                point: GeoPoint::new(12.9716, 77.5946),
                address: Some("West concourse".to_string()),
            },
            assigned_responder_id: None,
            assignment_id: None,
            status_history: Vec::new(),
        }
    }

    #[derive(Default)]
    pub(super) struct MemoryAlerts {
        events: Mutex<Vec<CriticalDispatchAlert>>,
    }

    impl MemoryAlerts {
        pub(super) fn events(&self) -> Vec<CriticalDispatchAlert> {
            self.events.lock().expect("lock").clone()
        }
    }

    impl AlertPublisher for MemoryAlerts {
        fn publish(&self, alert: CriticalDispatchAlert) -> Result<(), AlertError> {
            self.events.lock().expect("lock").push(alert);
            Ok(())
        }
    }

    pub(super) fn build_service() -> (
        Arc<DispatchService<MemoryDispatchStore, MemoryAlerts>>,
        MemoryDispatchStore,
        Arc<MemoryAlerts>,
    ) {
        let store = MemoryDispatchStore::default();
        let alerts = Arc::new(MemoryAlerts::default());
        let service = Arc::new(DispatchService::new(Arc::new(store.clone()), alerts.clone()));
        (service, store, alerts)
    }
}

mod lifecycle {
    use super::common::*;
    use aegis_dispatch::dispatch::{
        AssignmentStatus, IncidentId, IncidentStatus, IncidentType, ResponderId, ResponderStatus,
        ResponderType,
    };

    #[test]
    fn dispatch_to_resolution_walks_the_full_loop() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));

        let responder_id = ResponderId("r-1".to_string());
        let incident_id = IncidentId("inc-1".to_string());

        let ticket = service
            .assign(&responder_id, &incident_id)
            .expect("assignment succeeds");
        service
            .update_responder_status(&responder_id, ResponderStatus::OnScene, None)
            .expect("arrival accepted");
        service
            .resolve_incident(&incident_id, Some("contained".to_string()))
            .expect("resolution succeeds");
        service
            .update_responder_status(&responder_id, ResponderStatus::Available, None)
            .expect("return accepted");

        let unit = store.responder(&responder_id).expect("responder stored");
        assert_eq!(unit.status, ResponderStatus::Available);
        assert!(unit.assigned_incident_id.is_none());

        let trail: Vec<_> = unit.status_history.iter().map(|change| change.to).collect();
        assert_eq!(
            trail,
            vec![
                ResponderStatus::EnRoute,
                ResponderStatus::OnScene,
                ResponderStatus::Returning,
                ResponderStatus::Available,
            ]
        );

        let event = store.incident(&incident_id).expect("incident stored");
        assert_eq!(event.status, IncidentStatus::Resolved);

        let record = store
            .assignment(&ticket.assignment_id)
            .expect("assignment stored");
        assert_eq!(record.status, AssignmentStatus::Completed);
    }

    #[test]
    fn unassigned_responder_is_immediately_redispatchable() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));
        store.seed_incident(incident("inc-2", IncidentType::Fire));

        let responder_id = ResponderId("r-1".to_string());
        service
            .assign(&responder_id, &IncidentId("inc-1".to_string()))
            .expect("first assignment succeeds");
        service
            .unassign(&responder_id, &IncidentId("inc-1".to_string()), None)
            .expect("unassign succeeds");
        service
            .assign(&responder_id, &IncidentId("inc-2".to_string()))
            .expect("second assignment succeeds");

        let first = store
            .incident(&IncidentId("inc-1".to_string()))
            .expect("incident stored");
        assert_eq!(first.status, IncidentStatus::Reported);
        assert!(first.assigned_responder_id.is_none());

        let second = store
            .incident(&IncidentId("inc-2".to_string()))
            .expect("incident stored");
        assert_eq!(second.status, IncidentStatus::Assigned);
    }
}

mod routing {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::common::*;
    use aegis_dispatch::dispatch::{
        dispatch_router, IncidentId, IncidentPriority, IncidentType, ResponderId, ResponderStatus,
        ResponderType,
    };

    async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        (status, payload)
    }

    fn post(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(&payload).expect("serialize payload"),
            ))
            .expect("request")
    }

    fn put(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(&payload).expect("serialize payload"),
            ))
            .expect("request")
    }

    #[tokio::test]
    async fn post_dispatch_returns_the_selected_responder() {
        let (service, store, alerts) = build_service();
        let mut veteran = responder("resp-a", ResponderType::Fire);
        veteran.experience_years = 8;
        store.seed_responder(veteran);

        let mut rookie = responder("resp-b", ResponderType::Fire);
        rookie.experience_years = 1;
        rookie.equipment.critical_response = false;
        rookie.position = Some(fix_at(12.9720, 77.5950));
        store.seed_responder(rookie);

        let mut event = incident("inc-1", IncidentType::Fire);
        event.priority = IncidentPriority::Critical;
        store.seed_incident(event);

        let router = dispatch_router(service);
        let (status, payload) = send(
            router,
            post(
                "/api/v1/dispatch",
                json!({
                    "incidentId": "inc-1",
                    "lat": 12.9716,
                    "lon": 77.5946,
                    "incidentType": "fire",
                    "priority": "critical",
                    "autoDispatch": true,
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.get("success"), Some(&json!(true)));

        let responder = payload.get("responder").expect("responder block");
        assert_eq!(responder.get("id"), Some(&json!("resp-a")));
        assert_eq!(responder.get("distance"), Some(&json!("0.00 km")));
        assert_eq!(responder.get("eta"), Some(&json!("0 minutes")));

        let assignment = payload.get("assignment").expect("assignment block");
        assert_eq!(assignment.get("incidentId"), Some(&json!("inc-1")));
        assert_eq!(assignment.get("status"), Some(&json!("assigned")));

        assert!(payload.get("route").is_some());
        assert_eq!(alerts.events().len(), 1);
    }

    #[tokio::test]
    async fn post_dispatch_reports_an_empty_pool_as_success_false() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Medical));
        store.seed_incident(incident("inc-1", IncidentType::Fire));

        let router = dispatch_router(service);
        let (status, payload) = send(
            router,
            post(
                "/api/v1/dispatch",
                json!({
                    "incidentId": "inc-1",
                    "lat": 12.9716,
                    "lon": 77.5946,
                    "incidentType": "fire",
                    "autoDispatch": true,
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.get("success"), Some(&json!(false)));
        assert!(payload
            .get("message")
            .and_then(|message| message.as_str())
            .is_some());
        assert!(payload.get("responder").is_none());
    }

    #[tokio::test]
    async fn post_assignments_rejects_a_taken_incident_with_conflict() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_responder(responder("r-2", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));

        let router = dispatch_router(service);
        let (status, payload) = send(
            router.clone(),
            post(
                "/api/v1/assignments",
                json!({ "responderId": "r-1", "incidentId": "inc-1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(payload.get("assignmentId").is_some());

        let (status, payload) = send(
            router,
            post(
                "/api/v1/assignments",
                json!({ "responderId": "r-2", "incidentId": "inc-1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(payload.get("success"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn post_assignments_returns_not_found_for_unknown_incident() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));

        let router = dispatch_router(service);
        let (status, _payload) = send(
            router,
            post(
                "/api/v1/assignments",
                json!({ "responderId": "r-1", "incidentId": "ghost" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_unassign_without_assignment_returns_not_found() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));

        let router = dispatch_router(service);
        let (status, payload) = send(
            router,
            post(
                "/api/v1/assignments/unassign",
                json!({ "responderId": "r-1", "incidentId": "inc-1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload.get("success"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn put_position_returns_the_recomputed_eta() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));
        service
            .assign(
                &ResponderId("r-1".to_string()),
                &IncidentId("inc-1".to_string()),
            )
            .expect("assignment succeeds");

        let router = dispatch_router(service);
        let (status, payload) = send(
            router,
            put(
                "/api/v1/responders/r-1/position",
                json!({
                    "latitude": 12.9731,
                    "longitude": 77.5946,
                    "speed": 5.0,
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.get("eta_minutes"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn status_and_resolve_drive_the_incident_lifecycle() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));
        service
            .assign(
                &ResponderId("r-1".to_string()),
                &IncidentId("inc-1".to_string()),
            )
            .expect("assignment succeeds");

        let router = dispatch_router(service);
        let (status, _payload) = send(
            router.clone(),
            put(
                "/api/v1/responders/r-1/status",
                json!({ "status": "on_scene" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, payload) = send(
            router.clone(),
            post("/api/v1/incidents/inc-1/resolve", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.get("success"), Some(&json!(true)));

        let unit = store
            .responder(&ResponderId("r-1".to_string()))
            .expect("responder stored");
        assert_eq!(unit.status, ResponderStatus::Returning);
    }

    #[tokio::test]
    async fn abandoning_an_assignment_via_status_is_a_conflict() {
        let (service, store, _alerts) = build_service();
        store.seed_responder(responder("r-1", ResponderType::Fire));
        store.seed_incident(incident("inc-1", IncidentType::Fire));
        service
            .assign(
                &ResponderId("r-1".to_string()),
                &IncidentId("inc-1".to_string()),
            )
            .expect("assignment succeeds");

        let router = dispatch_router(service);
        let (status, payload) = send(
            router,
            put(
                "/api/v1/responders/r-1/status",
                json!({ "status": "available" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(payload.get("success"), Some(&json!(false)));
    }
}
