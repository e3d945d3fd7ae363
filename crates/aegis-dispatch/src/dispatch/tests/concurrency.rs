use std::sync::Arc;
use std::thread;

use super::common::{build_service, command, incident, responder};
use crate::dispatch::domain::{
    AssignmentStatus, IncidentId, IncidentType, ResponderId, ResponderStatus, ResponderType,
};
use crate::dispatch::service::{DispatchError, DispatchOutcome};
use crate::dispatch::store::DispatchStore;

#[test]
fn racing_explicit_assignments_commit_exactly_once() {
    let (service, store, _alerts) = build_service();
    store.seed_responder(responder("r-1", ResponderType::Fire));
    store.seed_incident(incident("inc-1", IncidentType::Fire));
    store.seed_incident(incident("inc-2", IncidentType::Fire));

    let service = Arc::new(service);
    let responder_id = ResponderId("r-1".to_string());

    let handles: Vec<_> = ["inc-1", "inc-2"]
        .into_iter()
        .map(|incident_id| {
            let service = Arc::clone(&service);
            let responder_id = responder_id.clone();
            let incident_id = IncidentId(incident_id.to_string());
            thread::spawn(move || service.assign(&responder_id, &incident_id))
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("assignment thread panicked"))
        .collect();

    let committed = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(committed, 1, "one responder cannot serve two incidents");

    for result in &results {
        if let Err(error) = result {
            assert!(
                matches!(
                    error,
                    DispatchError::ResponderUnavailable { .. }
                        | DispatchError::Concurrency { .. }
                ),
                "loser saw {error}"
            );
        }
    }

    // Exactly one incident holds the responder; the other is untouched.
    let assigned: Vec<_> = ["inc-1", "inc-2"]
        .into_iter()
        .filter(|id| {
            store
                .incident(&IncidentId(id.to_string()))
                .expect("incident stored")
                .assigned_responder_id
                .is_some()
        })
        .collect();
    assert_eq!(assigned.len(), 1);

    let unit = store.responder(&responder_id).expect("responder stored");
    assert_eq!(unit.status, ResponderStatus::EnRoute);
    assert_eq!(unit.status_history.len(), 1);
}

#[test]
fn racing_auto_dispatches_take_distinct_responders() {
    let (service, store, _alerts) = build_service();
    store.seed_responder(responder("r-1", ResponderType::Fire));
    store.seed_responder(responder("r-2", ResponderType::Fire));
    store.seed_incident(incident("inc-1", IncidentType::Fire));
    store.seed_incident(incident("inc-2", IncidentType::Fire));

    let service = Arc::new(service);
    let handles: Vec<_> = ["inc-1", "inc-2"]
        .into_iter()
        .map(|incident_id| {
            let service = Arc::clone(&service);
            let request = command(incident_id, IncidentType::Fire);
            thread::spawn(move || service.dispatch(request))
        })
        .collect();

    let mut dispatched = Vec::new();
    for handle in handles {
        match handle.join().expect("dispatch thread panicked") {
            Ok(DispatchOutcome::Dispatched(ticket)) => dispatched.push(ticket),
            Ok(DispatchOutcome::NoSuitableResponder) => {
                panic!("two units were available for two incidents")
            }
            // Retry budget exhaustion is tolerated under contention, but a
            // partial commit never is.
            Err(DispatchError::Concurrency { .. }) => {}
            Err(other) => panic!("unexpected dispatch error: {other}"),
        }
    }

    // No responder serves two incidents.
    let mut taken: Vec<_> = dispatched
        .iter()
        .map(|ticket| ticket.responder.id.clone())
        .collect();
    taken.sort();
    taken.dedup();
    assert_eq!(taken.len(), dispatched.len());

    // Every en_route responder is backed by exactly one assigned incident
    // and one open assignment record.
    for id in ["r-1", "r-2"] {
        let unit = store
            .responder(&ResponderId(id.to_string()))
            .expect("responder stored");
        match unit.status {
            ResponderStatus::EnRoute => {
                let incident_id = unit
                    .assigned_incident_id
                    .clone()
                    .expect("en_route unit has an incident");
                let event = store.incident(&incident_id).expect("incident stored");
                assert_eq!(event.assigned_responder_id, Some(unit.id.clone()));

                let open: Vec<_> = store
                    .assignments_for_responder(&unit.id)
                    .expect("lookup succeeds")
                    .into_iter()
                    .filter(|record| record.status == AssignmentStatus::Assigned)
                    .collect();
                assert_eq!(open.len(), 1);
                assert_eq!(open[0].incident_id, incident_id);
            }
            ResponderStatus::Available => {
                assert!(unit.assigned_incident_id.is_none());
            }
            other => panic!("unexpected post-race status {other}"),
        }
    }
}

#[test]
fn commit_conflict_retries_are_bounded() {
    let (service, store, _alerts) = build_service();
    store.seed_responder(responder("r-1", ResponderType::Fire));
    store.seed_incident(incident("inc-1", IncidentType::Fire));
    store.seed_incident(incident("inc-2", IncidentType::Fire));

    // Burn the only responder, then auto-dispatch the second incident: the
    // pool is empty, which must be a clean negative rather than a spin.
    service
        .assign(
            &ResponderId("r-1".to_string()),
            &IncidentId("inc-1".to_string()),
        )
        .expect("assignment succeeds");

    let outcome = service
        .dispatch(command("inc-2", IncidentType::Fire))
        .expect("dispatch reports the empty pool");
    assert_eq!(outcome, DispatchOutcome::NoSuitableResponder);
}
