//! Escalation timeline: replay of group-change audit events into stints.
//!
//! One canonical chronological list is built once; the recent-first
//! history view and the proportional time-at-each-tier segments are both
//! derived from it, never maintained independently.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{CoarseStatus, StatusProfile};
use crate::policy::SlaPolicy;
use crate::ticket::{AuditEntry, Priority};
use crate::tier::{Tier, TierRules};

/// One contiguous interval during which a ticket was owned by one
/// tier/group. `ended_at == None` marks the currently open stint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stint {
    pub group_name: String,
    pub tier: Tier,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Stint {
    /// Duration of the stint, the open stint clamped to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.unwrap_or(now) - self.started_at
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Retrospective SLA readout for one stint: how the time spent there
/// compares to that tier's own response and resolution targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StintReadout {
    pub response: CoarseStatus,
    pub resolution: CoarseStatus,
    pub response_percentage: f64,
    pub resolution_percentage: f64,
}

/// Proportional share of the ticket's lifetime spent in one stint.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSegment {
    pub group_name: String,
    pub tier: Tier,
    pub duration: Duration,
    /// Fraction of total lifetime, in [0, 1]. Shares sum to 1.
    pub share: f64,
}

/// The most recent instant the ticket changed hands, if any.
///
/// Scans the audit trail newest-first for a `group_id` event that replaced
/// an actual previous group. Used as the hand-off and partner clock start.
pub fn last_tier_change(audits: &[AuditEntry]) -> Option<DateTime<Utc>> {
    audits.iter().rev().find_map(|audit| {
        audit
            .events
            .iter()
            .any(|e| e.is_group_change() && e.previous_value.is_some())
            .then_some(audit.created_at)
    })
}

/// The full tier-assignment history of one ticket, chronological.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timeline {
    stints: Vec<Stint>,
}

impl Timeline {
    /// Replay the audit stream into stints.
    ///
    /// `group_names` maps raw group-id values from the audit events to
    /// display names; ids with no entry get a synthetic placeholder name
    /// rather than failing the computation. Zero group changes yield an
    /// empty timeline: the ticket has lived in one group its whole life.
    pub fn build(
        audits: &[AuditEntry],
        created_at: DateTime<Utc>,
        current_group_name: Option<&str>,
        group_names: &HashMap<String, String>,
        rules: &TierRules,
    ) -> Self {
        let mut changes: Vec<(DateTime<Utc>, Option<&str>, Option<&str>)> = Vec::new();
        for audit in audits {
            for event in &audit.events {
                if event.is_group_change() {
                    changes.push((
                        audit.created_at,
                        event.previous_value.as_deref(),
                        event.value.as_deref(),
                    ));
                }
            }
        }
        if changes.is_empty() {
            return Self::default();
        }
        debug!("replaying {} group changes into stints", changes.len());

        let name_of = |id: Option<&str>, fallback: Option<&str>| -> String {
            match id {
                Some(id) => group_names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("Group {}", id)),
                None => fallback.unwrap_or("Unassigned").to_string(),
            }
        };

        let mut stints = Vec::with_capacity(changes.len() + 1);

        // From creation to the first change, owned by the previous group.
        let first_name = name_of(changes[0].1, current_group_name);
        stints.push(Stint {
            tier: rules.classify(Some(&first_name)),
            group_name: first_name,
            started_at: created_at,
            ended_at: Some(changes[0].0),
        });

        for (i, (at, _previous, new)) in changes.iter().enumerate() {
            let name = name_of(*new, None);
            stints.push(Stint {
                tier: rules.classify(Some(&name)),
                group_name: name,
                started_at: *at,
                ended_at: changes.get(i + 1).map(|next| next.0),
            });
        }
        Self { stints }
    }

    /// Canonical chronological stint list.
    pub fn stints(&self) -> &[Stint] {
        &self.stints
    }

    pub fn is_empty(&self) -> bool {
        self.stints.is_empty()
    }

    /// Presentation order: most recent first, excluding the still-open
    /// current stint (the caller already shows "now" separately).
    pub fn history(&self) -> Vec<&Stint> {
        let closed = match self.stints.split_last() {
            Some((last, rest)) if last.is_open() => rest,
            _ => &self.stints[..],
        };
        closed.iter().rev().collect()
    }

    /// Total lifetime covered by the timeline, the open stint clamped to
    /// `now`.
    pub fn total_duration(&self, now: DateTime<Utc>) -> Duration {
        self.stints
            .iter()
            .fold(Duration::zero(), |acc, s| acc + s.duration(now))
    }

    /// Strictly chronological proportional segments, open stint included,
    /// for rendering a time-at-each-tier bar.
    pub fn segments(&self, now: DateTime<Utc>) -> Vec<TimelineSegment> {
        let total = self.total_duration(now).num_milliseconds();
        self.stints
            .iter()
            .map(|s| {
                let duration = s.duration(now);
                let share = if total > 0 {
                    duration.num_milliseconds() as f64 / total as f64
                } else {
                    0.0
                };
                TimelineSegment {
                    group_name: s.group_name.clone(),
                    tier: s.tier,
                    duration,
                    share,
                }
            })
            .collect()
    }

    /// Retro readout of one stint against its own tier's targets, using
    /// the coarse profile.
    pub fn readout(
        stint: &Stint,
        policy: &SlaPolicy,
        priority: Priority,
        profile: &StatusProfile,
        now: DateTime<Utc>,
    ) -> StintReadout {
        let spent = stint.duration(now);
        let (response, resolution) = policy.stint_targets(stint.tier, priority, now);
        let judge = |target: Option<Duration>| -> (CoarseStatus, f64) {
            match target {
                Some(t) => (
                    CoarseStatus::from(profile.status_for(spent, t)),
                    crate::clock::percentage(spent, t),
                ),
                None => (CoarseStatus::NotConfigured, 0.0),
            }
        };
        let (response, response_percentage) = judge(response);
        let (resolution, resolution_percentage) = judge(resolution);
        StintReadout { response, resolution, response_percentage, resolution_percentage }
    }
}
