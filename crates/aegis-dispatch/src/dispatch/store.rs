//! Collaborator seams for the dispatch engine: the record store the
//! orchestrator commits through, and the alert channel critical dispatches
//! publish to. Injected at construction so tests run against deterministic
//! in-memory doubles.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Assignment, Incident, IncidentId, IncidentType, Responder, ResponderId, ZoneId,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record read inside the transaction changed before commit. Safe to
    /// retry from the top.
    #[error("commit conflict: {entity} changed since it was read")]
    CommitConflict { entity: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A unit of work spanning the responder, incident, and assignment records.
///
/// Reads register the observed record versions; staged writes only land when
/// `commit` finds every read version unchanged. Dropping the context without
/// committing discards the staged writes.
pub trait TransactionContext {
    fn responder(&mut self, id: &ResponderId) -> Result<Option<Responder>, StoreError>;
    fn incident(&mut self, id: &IncidentId) -> Result<Option<Incident>, StoreError>;
    /// The single `assigned` record for this (incident, responder) pair, if
    /// one exists.
    fn active_assignment(
        &mut self,
        incident_id: &IncidentId,
        responder_id: &ResponderId,
    ) -> Result<Option<Assignment>, StoreError>;

    fn put_responder(&mut self, responder: Responder);
    fn put_incident(&mut self, incident: Incident);
    fn put_assignment(&mut self, assignment: Assignment);

    /// Atomically apply the staged writes, failing with
    /// [`StoreError::CommitConflict`] if any record read through this
    /// context has moved on.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard the staged writes without applying them.
    fn abort(self: Box<Self>) {}
}

/// Storage abstraction over the responder directory, incident store, and
/// assignment log.
pub trait DispatchStore: Send + Sync {
    /// Open a transaction covering all three entity kinds.
    fn begin(&self) -> Result<Box<dyn TransactionContext>, StoreError>;

    /// Snapshot of responders currently reporting `available`. Used to build
    /// the candidate pool; the chosen responder is re-read inside the
    /// transaction before commit.
    fn available_responders(&self) -> Result<Vec<Responder>, StoreError>;

    /// Assignment log lookup by responder, newest first.
    fn assignments_for_responder(
        &self,
        responder_id: &ResponderId,
    ) -> Result<Vec<Assignment>, StoreError>;
}

/// Alert event emitted when a critical-priority incident is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalDispatchAlert {
    pub incident_id: IncidentId,
    pub responder_id: ResponderId,
    pub incident_type: IncidentType,
    pub zone_id: ZoneId,
    pub timestamp: DateTime<Utc>,
}

/// Trait describing the outbound alerting channel.
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: CriticalDispatchAlert) -> Result<(), AlertError>;
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}
