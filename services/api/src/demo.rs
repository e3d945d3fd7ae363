use std::sync::Arc;

use chrono::Utc;
use clap::Args;

use aegis_dispatch::dispatch::{
    DispatchCommand, DispatchOutcome, DispatchService, GeoPoint, IncidentPriority, IncidentType,
    MemoryDispatchStore, PositionFix, ResponderStatus,
};
use aegis_dispatch::error::AppError;

use crate::infra::{sample_incident, seed_fleet, InMemoryAlertPublisher};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Incident type to raise (fire, medical, security, emergency)
    #[arg(long, default_value = "fire", value_parser = parse_incident_type)]
    pub(crate) incident_type: IncidentType,
    /// Incident priority (low, medium, high, critical)
    #[arg(long, default_value = "critical", value_parser = parse_priority)]
    pub(crate) priority: IncidentPriority,
    /// Stop after the dispatch decision instead of walking the full lifecycle
    #[arg(long)]
    pub(crate) skip_lifecycle: bool,
}

fn parse_incident_type(raw: &str) -> Result<IncidentType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "fire" => Ok(IncidentType::Fire),
        "medical" => Ok(IncidentType::Medical),
        "security" => Ok(IncidentType::Security),
        "emergency" => Ok(IncidentType::Emergency),
        other => Err(format!(
            "unknown incident type '{other}' (expected fire, medical, security, or emergency)"
        )),
    }
}

fn parse_priority(raw: &str) -> Result<IncidentPriority, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(IncidentPriority::Low),
        "medium" => Ok(IncidentPriority::Medium),
        "high" => Ok(IncidentPriority::High),
        "critical" => Ok(IncidentPriority::Critical),
        other => Err(format!(
            "unknown priority '{other}' (expected low, medium, high, or critical)"
        )),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let incident_type = args.incident_type;
    let priority = args.priority;

    println!("Responder dispatch demo");

    let store = Arc::new(MemoryDispatchStore::default());
    seed_fleet(&store);
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let service = DispatchService::new(store.clone(), alerts.clone());

    let incident_point = GeoPoint::new(12.9722, 77.5955);
    let incident = sample_incident(
        "inc-demo",
        incident_type,
        priority,
        incident_point.lat,
        incident_point.lng,
    );
    let incident_id = incident.id.clone();
    store.seed_incident(incident);

    println!(
        "- Raised {priority} {incident_type} incident {incident_id} at the west concourse"
    );

    let outcome = service.dispatch(DispatchCommand {
        incident_id: incident_id.clone(),
        location: incident_point,
        incident_type,
        priority,
        zone: None,
        auto_dispatch: true,
    })?;

    let ticket = match outcome {
        DispatchOutcome::Dispatched(ticket) => ticket,
        DispatchOutcome::NoSuitableResponder => {
            println!("  No suitable responder in the fleet for this incident.");
            return Ok(());
        }
    };

    println!(
        "- Dispatched {} ({}) with {} years of experience",
        ticket.responder.name, ticket.responder.id, ticket.responder.experience_years
    );
    if let Some(route) = &ticket.route {
        println!(
            "  Route: {:.2} km at {:.0} km/h -> ETA {} minute(s)",
            route.distance_km, route.average_speed_kmh, route.eta_minutes
        );
    }
    for alert in alerts.events() {
        println!(
            "  Control-room alert: critical {} incident {} assigned to {}",
            alert.incident_type, alert.incident_id, alert.responder_id
        );
    }

    if args.skip_lifecycle {
        return Ok(());
    }

    let responder_id = ticket.responder.id.clone();

    // Halfway fix: the unit reports progress and the ETA tightens.
    let report = service.update_position(
        &responder_id,
        PositionFix {
            point: GeoPoint::new(12.9719, 77.5950),
            heading: Some(45.0),
            speed_kmh: Some(30.0),
            timestamp: Utc::now(),
        },
    )?;
    if let Some(eta) = report.eta_minutes {
        println!("- Position update received; revised ETA {eta} minute(s)");
    }

    service.update_responder_status(&responder_id, ResponderStatus::OnScene, None)?;
    println!("- {responder_id} arrived on scene; incident is active");

    service.resolve_incident(&incident_id, Some("handled by demo crew".to_string()))?;
    println!("- Incident {incident_id} resolved; unit returning to station");

    service.update_responder_status(&responder_id, ResponderStatus::Available, None)?;
    println!("- {responder_id} back in the available pool");

    println!("\nAssignment log for {responder_id}:");
    for assignment in service.assignments_for(&responder_id)? {
        println!(
            "  - {} | incident {} | {} | assigned {}",
            assignment.id,
            assignment.incident_id,
            assignment.status,
            assignment.assigned_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
