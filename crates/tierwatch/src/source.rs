//! The ticket data source boundary.
//!
//! The engine is a pure function of "now" plus fetched data; everything
//! network-shaped lives behind this trait. Implementations own transport,
//! auth, and pagination. The engine awaits these calls, degrades on their
//! failures, and never retries.

use crate::error::SourceError;
use crate::mttr::ResolutionSample;
use crate::ticket::{AuditEntry, Comment, TicketMetrics, TicketSnapshot};

/// Read-only access to the ticket system.
#[allow(async_fn_in_trait)]
pub trait TicketSource {
    /// The subject ticket record. The only fetch the engine treats as
    /// load-bearing.
    async fn ticket(&self, id: u64) -> Result<TicketSnapshot, SourceError>;

    /// Upstream SLA metric windows for the ticket.
    async fn metrics(&self, id: u64) -> Result<TicketMetrics, SourceError>;

    /// Full comment stream, chronological.
    async fn comments(&self, id: u64) -> Result<Vec<Comment>, SourceError>;

    /// Full audit trail, chronological.
    async fn audits(&self, id: u64) -> Result<Vec<AuditEntry>, SourceError>;

    /// Display name for a group id (audit events carry ids as strings).
    async fn group_name(&self, group_id: &str) -> Result<String, SourceError>;

    /// Recently resolved tickets for the MTTR comparison population,
    /// scoped to a group when one is given.
    async fn resolved_sample(
        &self,
        group_id: Option<u64>,
    ) -> Result<Vec<ResolutionSample>, SourceError>;
}
