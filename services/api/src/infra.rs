use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::warn;

use aegis_dispatch::dispatch::{
    AlertError, AlertPublisher, CriticalDispatchAlert, Equipment, GeoPoint, Incident, IncidentId,
    IncidentLocation, IncidentPriority, IncidentStatus, IncidentType, MemoryDispatchStore,
    PositionFix, Responder, ResponderId, ResponderStatus, ResponderType, ZoneId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Alert channel standing in for the control-room push pipeline: critical
/// dispatches are logged at warn level and retained for inspection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<CriticalDispatchAlert>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: CriticalDispatchAlert) -> Result<(), AlertError> {
        warn!(
            incident_id = %alert.incident_id,
            responder_id = %alert.responder_id,
            incident_type = %alert.incident_type,
            zone = %alert.zone_id,
            "critical incident dispatched"
        );
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(alert);
        Ok(())
    }
}

impl InMemoryAlertPublisher {
    pub(crate) fn events(&self) -> Vec<CriticalDispatchAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

fn unit(
    id: &str,
    name: &str,
    responder_type: ResponderType,
    lat: f64,
    lng: f64,
    experience_years: u32,
    critical_response: bool,
    zone: Option<&str>,
) -> Responder {
    Responder {
        id: ResponderId(id.to_string()),
        name: name.to_string(),
        responder_type,
        status: ResponderStatus::Available,
        contact: None,
        vehicle: None,
        assigned_zone: zone.map(|zone| ZoneId(zone.to_string())),
        on_break: false,
        position: Some(PositionFix {
            point: GeoPoint::new(lat, lng),
            heading: None,
            speed_kmh: None,
            timestamp: Utc::now(),
        }),
        equipment: Equipment {
            critical_response,
            communication: true,
            medical_kit: matches!(responder_type, ResponderType::Medical),
            defibrillator: matches!(responder_type, ResponderType::Medical),
            battery_level: 90,
            signal_strength: 85,
        },
        experience_years,
        assigned_incident_id: None,
        eta_minutes: None,
        status_history: Vec::new(),
        position_history: Vec::new(),
    }
}

/// Seed the venue fleet. Responder provisioning is an external concern in
/// production; the in-memory deployment starts from this roster.
pub(crate) fn seed_fleet(store: &MemoryDispatchStore) {
    let roster = [
        unit("resp-001", "Engine 1", ResponderType::Fire, 12.9716, 77.5946, 8, true, None),
        unit("resp-002", "Engine 2", ResponderType::Fire, 12.9752, 77.5990, 3, true, Some("zone-north")),
        unit("resp-003", "Medic 1", ResponderType::Medical, 12.9698, 77.5921, 6, true, None),
        unit("resp-004", "Medic 2", ResponderType::Medical, 12.9731, 77.5964, 2, false, None),
        unit("resp-005", "Patrol 1", ResponderType::Security, 12.9709, 77.5953, 4, false, Some("zone-west")),
        unit("resp-006", "Patrol 2", ResponderType::Police, 12.9740, 77.5938, 7, true, None),
        unit("resp-007", "Rescue 1", ResponderType::Emergency, 12.9725, 77.5975, 10, true, None),
    ];

    for responder in roster {
        store.seed_responder(responder);
    }
}

pub(crate) fn sample_incident(
    id: &str,
    incident_type: IncidentType,
    priority: IncidentPriority,
    lat: f64,
    lng: f64,
) -> Incident {
    Incident {
        id: IncidentId(id.to_string()),
        incident_type,
        status: IncidentStatus::Reported,
        priority,
        severity: match priority {
            IncidentPriority::Critical => 5,
            IncidentPriority::High => 4,
            _ => 3,
        },
        zone_id: ZoneId("zone-west".to_string()),
        location: IncidentLocation {
            point: GeoPoint::new(lat, lng),
            address: Some("West concourse, gate 4".to_string()),
        },
        assigned_responder_id: None,
        assignment_id: None,
        status_history: Vec::new(),
    }
}

/// Seed a couple of open incidents so the HTTP surface is exercisable out of
/// the box.
pub(crate) fn seed_incidents(store: &MemoryDispatchStore) {
    store.seed_incident(sample_incident(
        "inc-001",
        IncidentType::Medical,
        IncidentPriority::High,
        12.9722,
        77.5955,
    ));
    store.seed_incident(sample_incident(
        "inc-002",
        IncidentType::Security,
        IncidentPriority::Medium,
        12.9705,
        77.5940,
    ));
}
