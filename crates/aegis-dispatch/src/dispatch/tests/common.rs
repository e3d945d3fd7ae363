use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::dispatch::domain::{
    Equipment, GeoPoint, Incident, IncidentId, IncidentLocation, IncidentPriority, IncidentStatus,
    IncidentType, PositionFix, Responder, ResponderId, ResponderStatus, ResponderType, ZoneId,
};
use crate::dispatch::service::{DispatchCommand, DispatchService};
use crate::dispatch::store::memory::MemoryDispatchStore;
use crate::dispatch::store::{AlertError, AlertPublisher, CriticalDispatchAlert};

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
            point: GeoPoint::new(12.9717, 77.5947),
            address: Some("West concourse".to_string()),
        },
        assigned_responder_id: None,
        assignment_id: None,
        status_history: Vec::new(),
    }
}

pub(super) fn command(incident_id: &str, incident_type: IncidentType) -> DispatchCommand {
    DispatchCommand {
        incident_id: IncidentId(incident_id.to_string()),
        location: GeoPoint::new(12.9717, 77.5947),
        incident_type,
        priority: IncidentPriority::Medium,
        zone: None,
        auto_dispatch: true,
    }
}

#[derive(Default)]
pub(super) struct MemoryAlerts {
    events: Mutex<Vec<CriticalDispatchAlert>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<CriticalDispatchAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: CriticalDispatchAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) fn build_service() -> (
    DispatchService<MemoryDispatchStore, MemoryAlerts>,
    MemoryDispatchStore,
    Arc<MemoryAlerts>,
) {
    let store = MemoryDispatchStore::default();
    let alerts = Arc::new(MemoryAlerts::default());
    let service = DispatchService::new(Arc::new(store.clone()), alerts.clone());
    (service, store, alerts)
}
