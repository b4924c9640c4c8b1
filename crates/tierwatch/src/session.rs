//! Per-ticket evaluation session: the engine's single public surface.
//!
//! A session owns one subject ticket id, its generation counter, and the
//! MTTR cache. A full refresh fetches, classifies, resolves targets, and
//! builds the clock set as one atomic step; the host re-ticks the returned
//! evaluation between refreshes without touching the data source.
//!
//! Cancellation is cooperative: navigating to another ticket bumps the
//! generation, and any evaluation produced under the old generation is
//! rejected by `accepts` when it arrives. Dropping an in-flight `evaluate`
//! future abandons its fetches outright.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::{Clock, ClockLabel, CoarseStatus, StatusProfile};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evaluator::{build_clocks, EvaluationInput};
use crate::mttr::{compute_mttr, MttrSummary};
use crate::policy::SlaPolicy;
use crate::source::TicketSource;
use crate::ticket::{Priority, TicketStatus};
use crate::tier::{Partner, Route, TierRules};
use crate::timeline::{last_tier_change, Timeline};
use crate::view::{ClockView, EvaluationView, RoutePath};

/// One atomic evaluation of a ticket's clocks.
///
/// Self-contained: carries its own status profile so re-ticks and views
/// need nothing but the struct and a "now".
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub ticket_id: u64,
    /// Session generation this evaluation was produced under.
    pub generation: u64,
    pub route: Route,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub evaluated_at: DateTime<Utc>,
    pub clocks: Vec<Clock>,
    profile: StatusProfile,
}

impl Evaluation {
    /// Advance every running clock to `now` without re-fetching.
    ///
    /// Also re-derives the escalation coupling: a first response crossing
    /// into breach mid-countdown flips a pending next response to
    /// immediate on this very tick.
    pub fn retick(&mut self, now: DateTime<Utc>) {
        for clock in &mut self.clocks {
            clock.retick(now);
        }
        let first_breached = self
            .clocks
            .iter()
            .find(|c| c.label == ClockLabel::FirstResponse)
            .is_some_and(|c| c.is_breached());
        if first_breached {
            if let Some(next) = self
                .clocks
                .iter_mut()
                .find(|c| c.label == ClockLabel::NextResponse)
            {
                if !next.met && !next.immediate {
                    debug!("first response breached mid-tick, next response goes immediate");
                    *next = Clock::immediate(ClockLabel::NextResponse, now);
                }
            }
        }
        self.evaluated_at = now;
    }

    pub fn profile(&self) -> &StatusProfile {
        &self.profile
    }

    /// Overall badge: worst coarse status over the core pair.
    pub fn overall(&self) -> CoarseStatus {
        self.clocks
            .iter()
            .filter(|c| {
                matches!(c.label, ClockLabel::FirstResponse | ClockLabel::Resolution)
            })
            .map(|c| CoarseStatus::from(c.status(&self.profile)))
            .fold(CoarseStatus::Met, CoarseStatus::worst)
    }

    /// The render-ready view of this evaluation.
    pub fn view(&self) -> EvaluationView {
        EvaluationView {
            ticket_id: self.ticket_id,
            path: RoutePath::for_route(&self.route, self.status.is_resolved()).to_string(),
            tier: self.route.current_tier().label(),
            partner: self.route.partner.map(|p| p.display_name().to_string()),
            group_name: self.route.display_group_name().to_string(),
            priority: self.priority,
            solved: self.status.is_resolved(),
            overall: self.overall(),
            clocks: self
                .clocks
                .iter()
                .map(|c| ClockView::from_clock(c, &self.profile))
                .collect(),
        }
    }
}

/// A viewing session for one ticket.
pub struct TicketSession<S> {
    source: S,
    config: EngineConfig,
    policy: SlaPolicy,
    rules: TierRules,
    profile: StatusProfile,
    ticket_id: u64,
    generation: u64,
    mttr_cache: Option<Option<MttrSummary>>,
}

impl<S: TicketSource> TicketSession<S> {
    pub fn new(source: S, config: EngineConfig, ticket_id: u64) -> Self {
        let policy = config.effective_policy();
        let rules = TierRules::from_keywords(&config.keywords);
        Self {
            source,
            config,
            policy,
            rules,
            profile: StatusProfile::live_bar(),
            ticket_id,
            generation: 0,
            mttr_cache: None,
        }
    }

    pub fn ticket_id(&self) -> u64 {
        self.ticket_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move the session to a different ticket. Bumps the generation so
    /// stale in-flight results are rejected on arrival, and drops the
    /// per-ticket caches.
    pub fn navigate(&mut self, ticket_id: u64) {
        if ticket_id == self.ticket_id {
            return;
        }
        info!("session navigating from ticket {} to {}", self.ticket_id, ticket_id);
        self.ticket_id = ticket_id;
        self.generation += 1;
        self.mttr_cache = None;
    }

    /// Whether an evaluation still belongs to this session's subject.
    pub fn accepts(&self, evaluation: &Evaluation) -> bool {
        evaluation.ticket_id == self.ticket_id && evaluation.generation == self.generation
    }

    /// One full refresh: fetch, classify, resolve, build clocks.
    ///
    /// Independent fetches run concurrently; the synchronous state machine
    /// runs only after all of them settle, so the consumer never sees a
    /// new tier mixed with old clocks.
    pub async fn evaluate(&self, now: DateTime<Utc>) -> Result<Evaluation, EngineError> {
        let id = self.ticket_id;
        let (ticket, metrics, comments) = tokio::join!(
            self.source.ticket(id),
            self.source.metrics(id),
            self.source.comments(id),
        );

        let ticket = ticket.map_err(|source| EngineError::TicketUnavailable { id, source })?;
        let metrics = match metrics {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("metrics unavailable for ticket {}, estimating from creation: {}", id, e);
                None
            }
        };
        let comments = comments.unwrap_or_else(|e| {
            warn!("comments unavailable for ticket {}: {}", id, e);
            Vec::new()
        });

        let group_name = match ticket.group_id {
            Some(gid) => match self.source.group_name(&gid.to_string()).await {
                Ok(name) if !name.trim().is_empty() => Some(name),
                Ok(_) => None,
                Err(e) => {
                    // Unknown group reads as the lowest tier.
                    warn!("group {} lookup failed for ticket {}: {}", gid, id, e);
                    None
                }
            },
            None => None,
        };

        let tier = self.rules.classify(group_name.as_deref());
        let partner = self.detect_partner(&ticket).or(tier.partner());
        let route = Route { tier, partner, group_name };
        let targets = self.policy.resolve(&route, ticket.priority, now);

        // The audit trail only matters once the ticket has changed hands.
        let escalated_at = if route.tier.is_escalated() || route.partner.is_some() {
            let audits = self.source.audits(id).await.unwrap_or_else(|e| {
                warn!("audit trail unavailable for ticket {}: {}", id, e);
                Vec::new()
            });
            last_tier_change(&audits)
        } else {
            None
        };

        let clocks = build_clocks(&EvaluationInput {
            ticket: &ticket,
            metrics: metrics.as_ref(),
            comments: &comments,
            escalated_at,
            route: &route,
            targets: &targets,
            now,
        });
        debug!(
            "ticket {} evaluated: path {}, {} clocks",
            id,
            RoutePath::for_route(&route, ticket.is_resolved()),
            clocks.len()
        );

        Ok(Evaluation {
            ticket_id: id,
            generation: self.generation,
            route,
            priority: ticket.priority,
            status: ticket.status,
            created_at: ticket.created_at,
            evaluated_at: now,
            clocks,
            profile: self.profile.clone(),
        })
    }

    /// Reconstruct the tier-assignment history from the audit trail.
    pub async fn timeline(&self) -> Result<Timeline, EngineError> {
        let id = self.ticket_id;
        let (ticket, audits) = tokio::join!(self.source.ticket(id), self.source.audits(id));
        let ticket = ticket.map_err(|source| EngineError::TicketUnavailable { id, source })?;
        let audits = audits.unwrap_or_else(|e| {
            warn!("audit trail unavailable for ticket {}: {}", id, e);
            Vec::new()
        });

        let mut ids: BTreeSet<String> = BTreeSet::new();
        for audit in &audits {
            for event in &audit.events {
                if event.is_group_change() {
                    ids.extend(event.previous_value.iter().cloned());
                    ids.extend(event.value.iter().cloned());
                }
            }
        }
        let mut names: HashMap<String, String> = HashMap::new();
        for gid in ids {
            match self.source.group_name(&gid).await {
                Ok(name) => {
                    names.insert(gid, name);
                }
                // The builder substitutes a synthetic name.
                Err(e) => debug!("group {} lookup failed, using placeholder: {}", gid, e),
            }
        }

        let current_group = match ticket.group_id {
            Some(gid) => self.source.group_name(&gid.to_string()).await.ok(),
            None => None,
        };

        Ok(Timeline::build(
            &audits,
            ticket.created_at,
            current_group.as_deref(),
            &names,
            &self.rules,
        ))
    }

    /// MTTR over the comparison population, cached for the session since
    /// the population changes slowly relative to the countdown rate.
    pub async fn mttr(&mut self) -> Result<Option<MttrSummary>, EngineError> {
        if let Some(cached) = &self.mttr_cache {
            return Ok(cached.clone());
        }
        let id = self.ticket_id;
        let ticket = self
            .source
            .ticket(id)
            .await
            .map_err(|source| EngineError::TicketUnavailable { id, source })?;

        let sample = match self.source.resolved_sample(ticket.group_id).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("mttr sample fetch failed for ticket {}: {}", id, e);
                Vec::new()
            }
        };
        let scope = match ticket.group_id {
            Some(gid) => match self.source.group_name(&gid.to_string()).await {
                Ok(name) => self.rules.classify(Some(&name)).label(),
                Err(_) => "All Teams".to_string(),
            },
            None => "All Teams".to_string(),
        };

        let summary = compute_mttr(&sample, scope);
        self.mttr_cache = Some(summary.clone());
        Ok(summary)
    }

    fn detect_partner(&self, ticket: &crate::ticket::TicketSnapshot) -> Option<Partner> {
        match self.config.partner_field_id {
            Some(field_id) => ticket
                .custom_field_value(field_id)
                .and_then(Partner::from_field_value),
            None => ticket
                .custom_fields
                .iter()
                .filter_map(|f| f.value.as_deref())
                .find_map(Partner::from_field_value),
        }
    }
}
