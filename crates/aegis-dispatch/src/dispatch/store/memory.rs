//! Versioned in-memory store with optimistic transactions.
//!
//! Every record carries a version counter. A transaction remembers the
//! version of everything it read and stages its writes; commit takes the
//! store lock once, verifies no read record has moved, and applies the whole
//! batch. Two racing dispatches for the same responder therefore cannot both
//! commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{DispatchStore, StoreError, TransactionContext};
use crate::dispatch::domain::{
    Assignment, AssignmentId, AssignmentStatus, Incident, IncidentId, Responder, ResponderId,
    ResponderStatus,
};

#[derive(Debug, Clone)]
struct Versioned<T> {
    record: T,
    version: u64,
}

#[derive(Debug, Default)]
struct Shelves {
    responders: HashMap<ResponderId, Versioned<Responder>>,
    incidents: HashMap<IncidentId, Versioned<Incident>>,
    assignments: HashMap<AssignmentId, Versioned<Assignment>>,
}

/// In-memory implementation of [`DispatchStore`].
#[derive(Default, Clone)]
pub struct MemoryDispatchStore {
    shelves: Arc<Mutex<Shelves>>,
}

impl MemoryDispatchStore {
    /// Insert or replace a responder record outside any transaction.
    /// Provisioning is an external concern; tests and demos seed through
    /// this.
    pub fn seed_responder(&self, responder: Responder) {
        let mut shelves = self.shelves.lock().expect("store mutex poisoned");
        let version = shelves
            .responders
            .get(&responder.id)
            .map_or(0, |existing| existing.version)
            + 1;
        shelves.responders.insert(
            responder.id.clone(),
            Versioned {
                record: responder,
                version,
            },
        );
    }

    /// Insert or replace an incident record outside any transaction.
    pub fn seed_incident(&self, incident: Incident) {
        let mut shelves = self.shelves.lock().expect("store mutex poisoned");
        let version = shelves
            .incidents
            .get(&incident.id)
            .map_or(0, |existing| existing.version)
            + 1;
        shelves.incidents.insert(
            incident.id.clone(),
            Versioned {
                record: incident,
                version,
            },
        );
    }

    /// Snapshot read of one responder, for assertions and views.
    pub fn responder(&self, id: &ResponderId) -> Option<Responder> {
        let shelves = self.shelves.lock().expect("store mutex poisoned");
        shelves
            .responders
            .get(id)
            .map(|versioned| versioned.record.clone())
    }

    /// Snapshot read of one incident, for assertions and views.
    pub fn incident(&self, id: &IncidentId) -> Option<Incident> {
        let shelves = self.shelves.lock().expect("store mutex poisoned");
        shelves
            .incidents
            .get(id)
            .map(|versioned| versioned.record.clone())
    }

    /// Snapshot read of one assignment, for assertions and views.
    pub fn assignment(&self, id: &AssignmentId) -> Option<Assignment> {
        let shelves = self.shelves.lock().expect("store mutex poisoned");
        shelves
            .assignments
            .get(id)
            .map(|versioned| versioned.record.clone())
    }
}

impl DispatchStore for MemoryDispatchStore {
    fn begin(&self) -> Result<Box<dyn TransactionContext>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            shelves: Arc::clone(&self.shelves),
            reads: Vec::new(),
            writes: Vec::new(),
        }))
    }

    fn available_responders(&self) -> Result<Vec<Responder>, StoreError> {
        let shelves = self.shelves.lock().expect("store mutex poisoned");
        Ok(shelves
            .responders
            .values()
            .filter(|versioned| versioned.record.status == ResponderStatus::Available)
            .map(|versioned| versioned.record.clone())
            .collect())
    }

    fn assignments_for_responder(
        &self,
        responder_id: &ResponderId,
    ) -> Result<Vec<Assignment>, StoreError> {
        let shelves = self.shelves.lock().expect("store mutex poisoned");
        let mut assignments: Vec<Assignment> = shelves
            .assignments
            .values()
            .filter(|versioned| versioned.record.responder_id == *responder_id)
            .map(|versioned| versioned.record.clone())
            .collect();
        assignments.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(assignments)
    }
}

#[derive(Debug)]
enum ReadMark {
    Responder(ResponderId, u64),
    Incident(IncidentId, u64),
    Assignment(AssignmentId, u64),
}

#[derive(Debug)]
enum StagedWrite {
    Responder(Responder),
    Incident(Incident),
    Assignment(Assignment),
}

struct MemoryTransaction {
    shelves: Arc<Mutex<Shelves>>,
    reads: Vec<ReadMark>,
    writes: Vec<StagedWrite>,
}

impl TransactionContext for MemoryTransaction {
    fn responder(&mut self, id: &ResponderId) -> Result<Option<Responder>, StoreError> {
        // Reads observe this transaction's own staged writes.
        for write in self.writes.iter().rev() {
            if let StagedWrite::Responder(responder) = write {
                if responder.id == *id {
                    return Ok(Some(responder.clone()));
                }
            }
        }

        let shelves = self.shelves.lock().expect("store mutex poisoned");
        let versioned = shelves.responders.get(id);
        self.reads.push(ReadMark::Responder(
            id.clone(),
            versioned.map_or(0, |v| v.version),
        ));
        Ok(versioned.map(|v| v.record.clone()))
    }

    fn incident(&mut self, id: &IncidentId) -> Result<Option<Incident>, StoreError> {
        for write in self.writes.iter().rev() {
            if let StagedWrite::Incident(incident) = write {
                if incident.id == *id {
                    return Ok(Some(incident.clone()));
                }
            }
        }

        let shelves = self.shelves.lock().expect("store mutex poisoned");
        let versioned = shelves.incidents.get(id);
        self.reads.push(ReadMark::Incident(
            id.clone(),
            versioned.map_or(0, |v| v.version),
        ));
        Ok(versioned.map(|v| v.record.clone()))
    }

    fn active_assignment(
        &mut self,
        incident_id: &IncidentId,
        responder_id: &ResponderId,
    ) -> Result<Option<Assignment>, StoreError> {
        for write in self.writes.iter().rev() {
            if let StagedWrite::Assignment(assignment) = write {
                if assignment.incident_id == *incident_id
                    && assignment.responder_id == *responder_id
                    && assignment.status == AssignmentStatus::Assigned
                {
                    return Ok(Some(assignment.clone()));
                }
            }
        }

        let shelves = self.shelves.lock().expect("store mutex poisoned");
        let found = shelves.assignments.values().find(|versioned| {
            versioned.record.incident_id == *incident_id
                && versioned.record.responder_id == *responder_id
                && versioned.record.status == AssignmentStatus::Assigned
        });

        if let Some(versioned) = found {
            self.reads.push(ReadMark::Assignment(
                versioned.record.id.clone(),
                versioned.version,
            ));
        }
        Ok(found.map(|versioned| versioned.record.clone()))
    }

    fn put_responder(&mut self, responder: Responder) {
        self.writes.push(StagedWrite::Responder(responder));
    }

    fn put_incident(&mut self, incident: Incident) {
        self.writes.push(StagedWrite::Incident(incident));
    }

    fn put_assignment(&mut self, assignment: Assignment) {
        self.writes.push(StagedWrite::Assignment(assignment));
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut shelves = self.shelves.lock().expect("store mutex poisoned");

        for read in &self.reads {
            let (entity, observed, current) = match read {
                ReadMark::Responder(id, version) => (
                    format!("responder {id}"),
                    *version,
                    shelves.responders.get(id).map_or(0, |v| v.version),
                ),
                ReadMark::Incident(id, version) => (
                    format!("incident {id}"),
                    *version,
                    shelves.incidents.get(id).map_or(0, |v| v.version),
                ),
                ReadMark::Assignment(id, version) => (
                    format!("assignment {id}"),
                    *version,
                    shelves.assignments.get(id).map_or(0, |v| v.version),
                ),
            };

            if observed != current {
                return Err(StoreError::CommitConflict { entity });
            }
        }

        for write in self.writes {
            match write {
                StagedWrite::Responder(responder) => {
                    let version = shelves
                        .responders
                        .get(&responder.id)
                        .map_or(0, |v| v.version)
                        + 1;
                    shelves.responders.insert(
                        responder.id.clone(),
                        Versioned {
                            record: responder,
                            version,
                        },
                    );
                }
                StagedWrite::Incident(incident) => {
                    let version = shelves.incidents.get(&incident.id).map_or(0, |v| v.version) + 1;
                    shelves.incidents.insert(
                        incident.id.clone(),
                        Versioned {
                            record: incident,
                            version,
                        },
                    );
                }
                StagedWrite::Assignment(assignment) => {
                    let version = shelves
                        .assignments
                        .get(&assignment.id)
                        .map_or(0, |v| v.version)
                        + 1;
                    shelves.assignments.insert(
                        assignment.id.clone(),
                        Versioned {
                            record: assignment,
                            version,
                        },
                    );
                }
            }
        }

        Ok(())
    }
}
