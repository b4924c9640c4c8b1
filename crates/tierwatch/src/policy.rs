//! SLA target policy: the single source of truth for clock targets.
//!
//! One static table, injected as configuration, replaces the per-surface
//! copies that used to drift apart. All stored values are whole minutes;
//! resolution produces `chrono::Duration`s. A missing value means "no SLA
//! defined for this combination" and must surface as a distinct
//! not-configured state, never as zero or infinity.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::ticket::Priority;
use crate::tier::{Partner, Route, Tier};

/// Targets for one internal (tier, priority) cell, minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InternalRow {
    pub first_response: Option<i64>,
    pub next_response: Option<i64>,
    pub resolution: Option<i64>,
    #[serde(default)]
    pub internal_handoff: Option<i64>,
}

/// Targets for one partner (priority or calendar-shift) cell, minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartnerRow {
    pub response: Option<i64>,
    pub resolution: Option<i64>,
}

/// One row per priority. Unknown wire priorities have already collapsed to
/// normal by the time a lookup happens, so every lookup hits a real row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriorityTable<T: Copy> {
    pub urgent: T,
    pub high: T,
    pub normal: T,
    pub low: T,
}

impl<T: Copy> PriorityTable<T> {
    pub fn get(&self, priority: Priority) -> T {
        match priority {
            Priority::Urgent => self.urgent,
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }
}

/// Partner policy: either priority-keyed like internal tiers, or
/// calendar-shift-keyed for partners whose commitments change on weekends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartnerPolicy {
    ByCalendarShift { weekday: PartnerRow, weekend: PartnerRow },
    ByPriority(PriorityTable<PartnerRow>),
}

impl PartnerPolicy {
    /// Row applicable at the reference instant.
    ///
    /// The calendar-shift branch depends on which day "now" falls on, not
    /// on when the ticket was created; compliance can change at midnight.
    pub fn row(&self, priority: Priority, reference: DateTime<Utc>) -> PartnerRow {
        match self {
            Self::ByPriority(table) => table.get(priority),
            Self::ByCalendarShift { weekday, weekend } => {
                if is_weekend(reference) {
                    *weekend
                } else {
                    *weekday
                }
            }
        }
    }
}

fn is_weekend(at: DateTime<Utc>) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Resolved targets for one evaluation tick.
///
/// Core clocks resolve from the group-derived internal tier; partner
/// clocks are merged in when a partner escalation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetSet {
    pub first_response: Option<Duration>,
    pub next_response: Option<Duration>,
    pub resolution: Option<Duration>,
    pub internal_handoff: Option<Duration>,
    pub partner_response: Option<Duration>,
    pub partner_resolution: Option<Duration>,
}

fn minutes(m: Option<i64>) -> Option<Duration> {
    m.map(Duration::minutes)
}

/// The SLA policy table. Loadable from configuration; `Default` is the
/// built-in deployment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub l0: PriorityTable<InternalRow>,
    pub l1: PriorityTable<InternalRow>,
    /// No row means the sub-tier inherits the nearest defined escalated
    /// tier (L1).
    #[serde(default)]
    pub l2: Option<PriorityTable<InternalRow>>,
    #[serde(default)]
    pub l3: Option<PriorityTable<InternalRow>>,
    pub connectx: PartnerPolicy,
    pub att: PartnerPolicy,
    pub airvet: PartnerPolicy,
}

impl SlaPolicy {
    /// Internal-tier row, honoring L2/L3 inheritance. Unassigned tickets
    /// follow the L0 high-priority row.
    fn internal_row(&self, tier: Tier, priority: Priority, assigned: bool) -> InternalRow {
        if !assigned {
            return self.l0.high;
        }
        let table = match tier {
            Tier::L0 => &self.l0,
            Tier::L1 => &self.l1,
            Tier::L2 => self.l2.as_ref().unwrap_or(&self.l1),
            Tier::L3 => self.l3.as_ref().unwrap_or(&self.l1),
            // Partner tickets keep their group tier's core clocks; a
            // partner route without a meaningful group reads as L0.
            Tier::Partner(_) => &self.l0,
        };
        table.get(priority)
    }

    fn partner_policy(&self, partner: Partner) -> &PartnerPolicy {
        match partner {
            Partner::ConnectX => &self.connectx,
            Partner::Att => &self.att,
            Partner::Airvet => &self.airvet,
        }
    }

    /// Resolve the full target set for a route at a reference instant.
    pub fn resolve(&self, route: &Route, priority: Priority, reference: DateTime<Utc>) -> TargetSet {
        let assigned = route
            .group_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        let internal = self.internal_row(route.tier, priority, assigned);
        let partner = route
            .partner
            .map(|p| self.partner_policy(p).row(priority, reference));

        TargetSet {
            first_response: minutes(internal.first_response),
            next_response: minutes(internal.next_response),
            resolution: minutes(internal.resolution),
            internal_handoff: minutes(internal.internal_handoff),
            partner_response: minutes(partner.and_then(|r| r.response)),
            partner_resolution: minutes(partner.and_then(|r| r.resolution)),
        }
    }

    /// Response/resolution pair for a tier in isolation, used for the
    /// retrospective stint readouts in the escalation timeline.
    pub fn stint_targets(
        &self,
        tier: Tier,
        priority: Priority,
        reference: DateTime<Utc>,
    ) -> (Option<Duration>, Option<Duration>) {
        match tier {
            Tier::Partner(p) => {
                let row = self.partner_policy(p).row(priority, reference);
                (minutes(row.response), minutes(row.resolution))
            }
            _ => {
                let row = self.internal_row(tier, priority, true);
                (minutes(row.first_response), minutes(row.resolution))
            }
        }
    }
}

impl Default for SlaPolicy {
    fn default() -> Self {
        let l0 = PriorityTable {
            urgent: InternalRow {
                first_response: Some(30),
                next_response: Some(240),
                resolution: Some(60),
                internal_handoff: None,
            },
            high: InternalRow {
                first_response: Some(30),
                next_response: Some(480),
                resolution: Some(60),
                internal_handoff: None,
            },
            normal: InternalRow {
                first_response: Some(60),
                next_response: Some(720),
                resolution: Some(120),
                internal_handoff: None,
            },
            low: InternalRow {
                first_response: Some(60),
                next_response: Some(1440),
                resolution: Some(120),
                internal_handoff: None,
            },
        };
        let l1 = PriorityTable {
            urgent: InternalRow {
                first_response: Some(60),
                next_response: Some(240),
                resolution: Some(240),
                internal_handoff: Some(120),
            },
            high: InternalRow {
                first_response: Some(60),
                next_response: Some(480),
                resolution: Some(240),
                internal_handoff: Some(240),
            },
            normal: InternalRow {
                first_response: Some(60),
                next_response: Some(720),
                resolution: Some(240),
                internal_handoff: Some(480),
            },
            low: InternalRow {
                first_response: Some(60),
                next_response: Some(1440),
                resolution: Some(240),
                internal_handoff: Some(1440),
            },
        };
        let connectx = PartnerPolicy::ByPriority(PriorityTable {
            urgent: PartnerRow { response: Some(15), resolution: Some(60) },
            high: PartnerRow { response: Some(30), resolution: Some(240) },
            normal: PartnerRow { response: Some(240), resolution: Some(4320) },
            low: PartnerRow { response: Some(480), resolution: None },
        });
        // Placeholder partner: commitments not yet contracted.
        let att = PartnerPolicy::ByPriority(PriorityTable {
            urgent: PartnerRow::default(),
            high: PartnerRow::default(),
            normal: PartnerRow::default(),
            low: PartnerRow::default(),
        });
        let airvet = PartnerPolicy::ByCalendarShift {
            weekday: PartnerRow { response: None, resolution: Some(1440) },
            weekend: PartnerRow { response: None, resolution: Some(2880) },
        };
        Self { l0, l1, l2: None, l3: None, connectx, att, airvet }
    }
}
