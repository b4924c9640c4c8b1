//! Captured ticket bundles.
//!
//! A bundle is a JSON snapshot of everything the engine would fetch live:
//! ticket record, metric windows, comments, audit trail, group directory,
//! and a resolved-ticket sample. Implementing the source trait over it
//! exercises the full degradation path: whatever a capture is missing, the
//! engine treats exactly like a failed fetch.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tierwatch::error::SourceError;
use tierwatch::mttr::ResolutionSample;
use tierwatch::source::TicketSource;
use tierwatch::ticket::{AuditEntry, Comment, TicketMetrics, TicketSnapshot};

/// One captured ticket with everything the engine may ask for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub ticket: TicketSnapshot,
    #[serde(default)]
    pub metrics: Option<TicketMetrics>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub audits: Vec<AuditEntry>,
    /// Group id to display name.
    #[serde(default)]
    pub groups: HashMap<String, String>,
    #[serde(default)]
    pub resolved: Vec<ResolutionSample>,
}

impl Bundle {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading bundle {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing bundle {}", path.display()))
    }
}

/// The bundle as a ticket source.
pub struct BundleSource {
    bundle: Bundle,
}

impl BundleSource {
    pub fn new(bundle: Bundle) -> Self {
        Self { bundle }
    }
}

impl TicketSource for BundleSource {
    async fn ticket(&self, id: u64) -> Result<TicketSnapshot, SourceError> {
        if id == self.bundle.ticket.id {
            Ok(self.bundle.ticket.clone())
        } else {
            Err(SourceError::NotFound(format!("ticket {}", id)))
        }
    }

    async fn metrics(&self, id: u64) -> Result<TicketMetrics, SourceError> {
        self.bundle
            .metrics
            .clone()
            .ok_or_else(|| SourceError::NotFound(format!("metrics for ticket {}", id)))
    }

    async fn comments(&self, _id: u64) -> Result<Vec<Comment>, SourceError> {
        Ok(self.bundle.comments.clone())
    }

    async fn audits(&self, _id: u64) -> Result<Vec<AuditEntry>, SourceError> {
        Ok(self.bundle.audits.clone())
    }

    async fn group_name(&self, group_id: &str) -> Result<String, SourceError> {
        self.bundle
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("group {}", group_id)))
    }

    async fn resolved_sample(
        &self,
        _group_id: Option<u64>,
    ) -> Result<Vec<ResolutionSample>, SourceError> {
        Ok(self.bundle.resolved.clone())
    }
}
