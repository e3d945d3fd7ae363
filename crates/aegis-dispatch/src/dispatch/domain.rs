use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for responder units.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResponderId(pub String);

/// Identifier wrapper for reported incidents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub String);

/// Identifier wrapper for assignment records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

/// Identifier wrapper for venue zones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub String);

impl fmt::Display for ResponderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Responder unit categories dispatched by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderType {
    Fire,
    Medical,
    Security,
    Police,
    Emergency,
}

impl ResponderType {
    pub const fn label(self) -> &'static str {
        match self {
            ResponderType::Fire => "fire",
            ResponderType::Medical => "medical",
            ResponderType::Security => "security",
            ResponderType::Police => "police",
            ResponderType::Emergency => "emergency",
        }
    }
}

impl fmt::Display for ResponderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Incident categories a responder can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Fire,
    Medical,
    Security,
    Emergency,
}

impl IncidentType {
    pub const fn label(self) -> &'static str {
        match self {
            IncidentType::Fire => "fire",
            IncidentType::Medical => "medical",
            IncidentType::Security => "security",
            IncidentType::Emergency => "emergency",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Responder lifecycle states tracked by the status state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderStatus {
    Available,
    EnRoute,
    OnScene,
    Returning,
    OffDuty,
    Maintenance,
}

impl ResponderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ResponderStatus::Available => "available",
            ResponderStatus::EnRoute => "en_route",
            ResponderStatus::OnScene => "on_scene",
            ResponderStatus::Returning => "returning",
            ResponderStatus::OffDuty => "off_duty",
            ResponderStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ResponderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Incident lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Reported,
    Investigating,
    Assigned,
    Active,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            IncidentStatus::Reported => "reported",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Assigned => "assigned",
            IncidentStatus::Active => "active",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Priority bands attached to incidents; critical incidents tighten the
/// candidate filter and emit alert events on dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentPriority {
    pub const fn label(self) -> &'static str {
        match self {
            IncidentPriority::Low => "low",
            IncidentPriority::Medium => "medium",
            IncidentPriority::High => "high",
            IncidentPriority::Critical => "critical",
        }
    }
}

impl Default for IncidentPriority {
    fn default() -> Self {
        IncidentPriority::Medium
    }
}

impl fmt::Display for IncidentPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Assignment record lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    Unassigned,
    Completed,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Unassigned => "unassigned",
            AssignmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A timestamped position report from a responder unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub point: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Observed travel speed in km/h; overrides the per-type default when
    /// computing ETAs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Where an incident was reported, with an optional human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLocation {
    pub point: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Equipment carried by a responder unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Equipment {
    pub critical_response: bool,
    pub communication: bool,
    pub medical_kit: bool,
    pub defibrillator: bool,
    pub battery_level: u8,
    pub signal_strength: u8,
}

/// Append-only audit entry recorded on every status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange<S> {
    pub from: S,
    pub to: S,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Progress marker appended to an assignment as its responder moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub status: ResponderStatus,
    pub timestamp: DateTime<Utc>,
}

/// A trackable emergency-response unit. Provisioned externally; mutated here
/// only through the engine's transitions and position reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responder {
    pub id: ResponderId,
    pub name: String,
    #[serde(rename = "type")]
    pub responder_type: ResponderType,
    pub status: ResponderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_zone: Option<ZoneId>,
    #[serde(default)]
    pub on_break: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionFix>,
    pub equipment: Equipment,
    pub experience_years: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_incident_id: Option<IncidentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
    #[serde(default)]
    pub status_history: Vec<StatusChange<ResponderStatus>>,
    #[serde(default)]
    pub position_history: Vec<PositionFix>,
}

impl Responder {
    /// Record a position report, keeping the append-only history intact.
    pub fn record_position(&mut self, fix: PositionFix) {
        self.position_history.push(fix.clone());
        self.position = Some(fix);
    }
}

/// A reported safety event requiring response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    /// Severity on a 1-5 scale, assessed at report time.
    pub severity: u8,
    pub zone_id: ZoneId,
    pub location: IncidentLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_responder_id: Option<ResponderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<AssignmentId>,
    #[serde(default)]
    pub status_history: Vec<StatusChange<IncidentStatus>>,
}

/// The record linking one responder to one incident for a bounded
/// active-response period. Created and closed exclusively by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub incident_id: IncidentId,
    pub responder_id: ResponderId,
    pub assigned_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
    pub priority: IncidentPriority,
    pub incident_type: IncidentType,
    pub zone_id: ZoneId,
    pub auto_dispatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassigned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassign_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_history: Vec<AssignmentEvent>,
    #[serde(default)]
    pub location_history: Vec<PositionFix>,
}
