//! Responder dispatch and assignment engine.
//!
//! Control flow: an incident triggers a dispatch request, the candidate
//! filter narrows the responder population, the geo module annotates each
//! candidate with distance, the scorer picks the best match, and the service
//! commits the linked Responder/Incident/Assignment transition through one
//! transaction context.

pub mod domain;
pub mod filter;
pub mod geo;
pub mod router;
pub mod scoring;
pub mod service;
pub mod state;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Assignment, AssignmentEvent, AssignmentId, AssignmentStatus, Equipment, GeoPoint, Incident,
    IncidentId, IncidentLocation, IncidentPriority, IncidentStatus, IncidentType, PositionFix,
    Responder, ResponderId, ResponderStatus, ResponderType, StatusChange, ZoneId,
};
pub use filter::{Candidate, DispatchCriteria};
pub use geo::RouteInfo;
pub use router::dispatch_router;
pub use scoring::{ScoreComponent, ScoreFactor, ScoredCandidate};
pub use service::{
    DispatchCommand, DispatchConfig, DispatchError, DispatchOutcome, DispatchService,
    DispatchTicket, PositionReport, ResponderSummary, UnassignOutcome,
};
pub use state::StateError;
pub use store::memory::MemoryDispatchStore;
pub use store::{
    AlertError, AlertPublisher, CriticalDispatchAlert, DispatchStore, StoreError,
    TransactionContext,
};
