//! Inbound data contract from the ticket data source.
//!
//! Shape requirements only: the ticket snapshot, metric windows, the
//! comment stream, and the audit trail. Transport, auth, and pagination
//! belong to the collaborator. Deserialization is tolerant where the wire
//! is known to be sloppy: unknown priorities collapse to normal, unknown
//! statuses to open, and every optional sub-record defaults to absent.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Ticket priority. Unknown or missing input defaults to normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Parse a wire value, falling back to normal for anything unknown.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("urgent") => Self::Urgent,
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Normal,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Urgent => write!(f, "urgent"),
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Ticket lifecycle status. Unknown input is treated as open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    #[default]
    Open,
    Pending,
    Hold,
    Solved,
    Closed,
}

impl TicketStatus {
    fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("new") => Self::New,
            Some("pending") => Self::Pending,
            Some("hold") | Some("on_hold") => Self::Hold,
            Some("solved") => Self::Solved,
            Some("closed") => Self::Closed,
            _ => Self::Open,
        }
    }

    /// Whether the resolution clock counts as satisfied.
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Solved | Self::Closed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Open => write!(f, "open"),
            Self::Pending => write!(f, "pending"),
            Self::Hold => write!(f, "hold"),
            Self::Solved => write!(f, "solved"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

fn de_priority<'de, D: Deserializer<'de>>(d: D) -> Result<Priority, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(Priority::from_wire(raw.as_deref()))
}

fn de_status<'de, D: Deserializer<'de>>(d: D) -> Result<TicketStatus, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(TicketStatus::from_wire(raw.as_deref()))
}

fn default_public() -> bool {
    true
}

/// A custom ticket field. Only the partner-selector field is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u64,
    #[serde(default)]
    pub value: Option<String>,
}

/// Immutable ticket snapshot for one evaluation tick.
///
/// Re-fetched, never mutated, by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub id: u64,
    #[serde(default, deserialize_with = "de_priority")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "de_status")]
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub requester_id: u64,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

impl TicketSnapshot {
    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    /// Value of a specific custom field, if present and non-empty.
    pub fn custom_field_value(&self, field_id: u64) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|f| f.id == field_id)
            .and_then(|f| f.value.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// One entry in the comment stream, chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author_id: u64,
    #[serde(default = "default_public")]
    pub public: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub body: String,
}

impl Comment {
    /// Public agent reply: visible to the requester, not authored by them.
    pub fn is_public_agent_reply(&self, requester_id: u64) -> bool {
        self.public && self.author_id != requester_id
    }
}

/// One audit record: a timestamped batch of field-change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<AuditEvent>,
}

/// A single field change. The engine only consumes `group_id` changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub previous_value: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl AuditEvent {
    pub fn is_group_change(&self) -> bool {
        self.field_name == "group_id"
    }
}

/// Which calendar a metric window was measured against.
///
/// Selected once per ticket, business hours preferred, then reused for
/// every access instead of being re-decided ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockBasis {
    Business,
    Calendar,
}

/// One metric window: the upstream SLA system's own view of a clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricWindow {
    /// Instant the upstream clock breaches, when still running.
    #[serde(default)]
    pub breach_at: Option<DateTime<Utc>>,
    /// Elapsed minutes, reported once the upstream clock has completed.
    #[serde(default)]
    pub elapsed: Option<i64>,
}

/// Business/calendar pair for one metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricPair {
    #[serde(default)]
    pub business: Option<MetricWindow>,
    #[serde(default)]
    pub calendar: Option<MetricWindow>,
}

impl MetricPair {
    /// Pick the window to trust for this ticket: business if present,
    /// calendar otherwise.
    pub fn select(&self) -> Option<(ClockBasis, &MetricWindow)> {
        if let Some(w) = &self.business {
            return Some((ClockBasis::Business, w));
        }
        self.calendar.as_ref().map(|w| (ClockBasis::Calendar, w))
    }
}

/// Metrics record for a ticket, as far as the engine consumes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketMetrics {
    #[serde(default, rename = "reply_time_in_minutes")]
    pub reply_time: Option<MetricPair>,
    #[serde(default, rename = "full_resolution_time_in_minutes")]
    pub full_resolution_time: Option<MetricPair>,
}
