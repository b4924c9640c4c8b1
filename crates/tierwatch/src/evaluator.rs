//! Builds the per-tick clock set for a ticket.
//!
//! Pure over its inputs plus "now": the session fetches, this module
//! computes. Each evaluation produces a fresh clock list with unique
//! labels; nothing here is persisted.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::{Clock, ClockLabel};
use crate::policy::TargetSet;
use crate::ticket::{ClockBasis, Comment, MetricPair, MetricWindow, TicketMetrics, TicketSnapshot};
use crate::tier::Route;

/// Everything the clock builder consumes for one tick.
#[derive(Debug)]
pub struct EvaluationInput<'a> {
    pub ticket: &'a TicketSnapshot,
    pub metrics: Option<&'a TicketMetrics>,
    /// Comment stream, chronological.
    pub comments: &'a [Comment],
    /// Most recent tier-change instant from the audit trail, when known.
    pub escalated_at: Option<DateTime<Utc>>,
    pub route: &'a Route,
    pub targets: &'a TargetSet,
    pub now: DateTime<Utc>,
}

/// Pending-reply state derived from the public comment stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextResponseState {
    /// No public customer message at all.
    NoCustomerMessage,
    /// The latest public message is from an agent.
    Answered,
    /// A public customer message is waiting since this instant.
    Awaiting(DateTime<Utc>),
}

/// Find the most recent public customer message with no public agent
/// message after it. The newest public comment decides.
pub fn next_response_state(comments: &[Comment], requester_id: u64) -> NextResponseState {
    for comment in comments.iter().rev() {
        if !comment.public {
            continue;
        }
        if comment.author_id == requester_id {
            return NextResponseState::Awaiting(comment.created_at);
        }
        return NextResponseState::Answered;
    }
    NextResponseState::NoCustomerMessage
}

/// Pick the metric basis once per ticket: business hours when any window
/// reports them, calendar otherwise.
pub fn metric_basis(metrics: Option<&TicketMetrics>) -> Option<ClockBasis> {
    let m = metrics?;
    let has_business = m
        .reply_time
        .as_ref()
        .is_some_and(|p| p.business.is_some())
        || m.full_resolution_time
            .as_ref()
            .is_some_and(|p| p.business.is_some());
    let has_any = m.reply_time.is_some() || m.full_resolution_time.is_some();
    if has_business {
        Some(ClockBasis::Business)
    } else if has_any {
        Some(ClockBasis::Calendar)
    } else {
        None
    }
}

/// Window for the chosen basis, degrading to the other side when the pair
/// does not carry it.
fn window_for(pair: &MetricPair, basis: ClockBasis) -> Option<&MetricWindow> {
    match basis {
        ClockBasis::Business => pair.business.as_ref().or(pair.calendar.as_ref()),
        ClockBasis::Calendar => pair.calendar.as_ref().or(pair.business.as_ref()),
    }
}

/// Build the full clock set for one tick. Order is stable: first response,
/// next response, resolution, then hand-off and partner clocks.
pub fn build_clocks(input: &EvaluationInput<'_>) -> Vec<Clock> {
    let basis = metric_basis(input.metrics);
    debug!(
        "building clocks for ticket {} (tier {}, basis {:?})",
        input.ticket.id,
        input.route.current_tier(),
        basis
    );

    let first = first_response_clock(input, basis);
    let next = next_response_clock(input, &first);
    let resolution = resolution_clock(input, basis);

    let mut clocks = vec![first, next, resolution];
    if let Some(handoff) = handoff_clock(input) {
        clocks.push(handoff);
    }
    clocks.extend(partner_clocks(input));
    clocks
}

fn first_response_clock(input: &EvaluationInput<'_>, basis: Option<ClockBasis>) -> Clock {
    let created = input.ticket.created_at;
    let target = input.targets.first_response;

    // A public agent reply settles the clock for good, even when late.
    if let Some(reply) = input
        .comments
        .iter()
        .find(|c| c.is_public_agent_reply(input.ticket.requester_id))
    {
        return Clock::satisfied(ClockLabel::FirstResponse, target, reply.created_at - created);
    }

    let Some(target) = target else {
        return Clock::placeholder(ClockLabel::FirstResponse);
    };

    if let (Some(basis), Some(pair)) = (basis, input.metrics.and_then(|m| m.reply_time.as_ref())) {
        if let Some(window) = window_for(pair, basis) {
            if let Some(breach_at) = window.breach_at {
                let mut clock =
                    Clock::running(ClockLabel::FirstResponse, target, Duration::zero(), breach_at);
                clock.retick(input.now);
                return clock;
            }
            if let Some(mins) = window.elapsed {
                // Upstream closed the window without a breach instant:
                // the reply happened, trust its elapsed figure.
                return Clock::satisfied(
                    ClockLabel::FirstResponse,
                    Some(target),
                    Duration::minutes(mins),
                );
            }
        }
    }

    // Degraded mode: estimate from creation time.
    Clock::running(ClockLabel::FirstResponse, target, input.now - created, created + target)
}

fn next_response_clock(input: &EvaluationInput<'_>, first_response: &Clock) -> Clock {
    let state = next_response_state(input.comments, input.ticket.requester_id);

    match state {
        NextResponseState::Awaiting(since) => {
            if first_response.is_breached() {
                // An overdue first reply makes any further delay critical.
                return Clock::immediate(ClockLabel::NextResponse, input.now);
            }
            let Some(target) = input.targets.next_response else {
                return Clock::placeholder(ClockLabel::NextResponse);
            };
            Clock::running(ClockLabel::NextResponse, target, input.now - since, since + target)
        }
        // Not applicable counts as satisfied so the label survives the tick.
        NextResponseState::Answered | NextResponseState::NoCustomerMessage => {
            Clock::satisfied(ClockLabel::NextResponse, input.targets.next_response, Duration::zero())
        }
    }
}

fn resolution_clock(input: &EvaluationInput<'_>, basis: Option<ClockBasis>) -> Clock {
    let created = input.ticket.created_at;
    let resolved = input.ticket.is_resolved();
    let Some(target) = input.targets.resolution else {
        return Clock::placeholder(ClockLabel::Resolution);
    };

    if let (Some(basis), Some(pair)) = (
        basis,
        input.metrics.and_then(|m| m.full_resolution_time.as_ref()),
    ) {
        if let Some(window) = window_for(pair, basis) {
            if let Some(breach_at) = window.breach_at {
                let mut clock =
                    Clock::running(ClockLabel::Resolution, target, Duration::zero(), breach_at);
                clock.retick(input.now);
                return clock;
            }
            if let Some(mins) = window.elapsed {
                let elapsed = Duration::minutes(mins);
                if resolved {
                    return Clock::satisfied(ClockLabel::Resolution, Some(target), elapsed);
                }
                return Clock::observed(ClockLabel::Resolution, target, elapsed);
            }
        }
    }

    let elapsed = input.now - created;
    if resolved {
        return Clock::satisfied(ClockLabel::Resolution, Some(target), elapsed);
    }
    Clock::running(ClockLabel::Resolution, target, elapsed, created + target)
}

fn handoff_clock(input: &EvaluationInput<'_>) -> Option<Clock> {
    if !input.route.tier.is_escalated() {
        return None;
    }
    let target = input.targets.internal_handoff?;
    // No usable audit trail means no hand-off clock at all.
    let escalated_at = input.escalated_at?;

    if let Some(reply) = input.comments.iter().find(|c| {
        c.created_at > escalated_at && c.is_public_agent_reply(input.ticket.requester_id)
    }) {
        return Some(Clock::satisfied(
            ClockLabel::Handoff(input.route.tier),
            Some(target),
            reply.created_at - escalated_at,
        ));
    }
    Some(Clock::running(
        ClockLabel::Handoff(input.route.tier),
        target,
        input.now - escalated_at,
        escalated_at + target,
    ))
}

fn partner_clocks(input: &EvaluationInput<'_>) -> Vec<Clock> {
    let Some(partner) = input.route.partner else {
        return Vec::new();
    };
    let start = input.escalated_at.unwrap_or(input.ticket.created_at);
    let elapsed = input.now - start;
    let resolved = input.ticket.is_resolved();

    let response = input.targets.partner_response;
    let resolution = input.targets.partner_resolution;
    let mut clocks = Vec::new();

    if response.is_none() && resolution.is_none() {
        // Partner with no commitments at all: one explicit stand-in.
        clocks.push(Clock::placeholder(ClockLabel::PartnerPlaceholder(partner)));
        return clocks;
    }

    if let Some(target) = response {
        clocks.push(Clock::running(
            ClockLabel::PartnerResponse(partner),
            target,
            elapsed,
            start + target,
        ));
    }
    match resolution {
        Some(target) => {
            let clock = if resolved {
                Clock::satisfied(ClockLabel::PartnerResolve(partner), Some(target), elapsed)
            } else {
                Clock::running(ClockLabel::PartnerResolve(partner), target, elapsed, start + target)
            };
            clocks.push(clock);
        }
        // A response commitment without a resolve commitment is a
        // configuration gap; surface it instead of hiding the clock.
        None => clocks.push(Clock::placeholder(ClockLabel::PartnerResolve(partner))),
    }
    clocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockStatus, StatusProfile};
    use crate::policy::SlaPolicy;
    use crate::ticket::{Priority, TicketStatus};
    use crate::tier::{Partner, Tier};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    fn ticket(priority: Priority) -> TicketSnapshot {
        TicketSnapshot {
            id: 101,
            priority,
            status: TicketStatus::Open,
            created_at: t0(),
            requester_id: 9001,
            group_id: Some(11),
            custom_fields: Vec::new(),
        }
    }

    fn comment(author_id: u64, public: bool, at: DateTime<Utc>) -> Comment {
        Comment { author_id, public, created_at: at, body: String::new() }
    }

    fn route(tier: Tier, partner: Option<Partner>) -> Route {
        Route { tier, partner, group_name: Some("Frontline".to_string()) }
    }

    fn targets_for(route: &Route, priority: Priority, now: DateTime<Utc>) -> crate::policy::TargetSet {
        SlaPolicy::default().resolve(route, priority, now)
    }

    #[test]
    fn next_response_state_follows_latest_public_comment() {
        let requester = 9001;
        let c1 = comment(requester, true, t0() + Duration::minutes(5));
        let agent = comment(42, true, t0() + Duration::minutes(10));
        let c2 = comment(requester, true, t0() + Duration::minutes(20));
        let internal = comment(42, false, t0() + Duration::minutes(25));

        assert_eq!(next_response_state(&[], requester), NextResponseState::NoCustomerMessage);
        assert_eq!(
            next_response_state(&[c1.clone(), agent.clone()], requester),
            NextResponseState::Answered
        );
        // Internal notes never answer a customer.
        assert_eq!(
            next_response_state(&[c1, agent, c2, internal], requester),
            NextResponseState::Awaiting(t0() + Duration::minutes(20))
        );
    }

    #[test]
    fn first_response_prefers_the_comment_stream() {
        let t = ticket(Priority::Urgent);
        let r = route(Tier::L0, None);
        let now = t0() + Duration::minutes(45);
        let targets = targets_for(&r, t.priority, now);
        let comments = vec![comment(42, true, t0() + Duration::minutes(10))];

        let clocks = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &comments,
            escalated_at: None,
            route: &r,
            targets: &targets,
            now,
        });
        let first = &clocks[0];
        assert!(first.met);
        assert_eq!(first.elapsed, Duration::minutes(10));
        assert!(!first.late);
    }

    #[test]
    fn first_response_recomputes_from_metric_breach_instant() {
        let t = ticket(Priority::Urgent);
        let r = route(Tier::L0, None);
        let now = t0() + Duration::minutes(20);
        let targets = targets_for(&r, t.priority, now);
        // Upstream says the clock breaches at T0+30m.
        let metrics = TicketMetrics {
            reply_time: Some(MetricPair {
                business: Some(MetricWindow {
                    breach_at: Some(t0() + Duration::minutes(30)),
                    elapsed: None,
                }),
                calendar: None,
            }),
            full_resolution_time: None,
        };

        let clocks = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: Some(&metrics),
            comments: &[],
            escalated_at: None,
            route: &r,
            targets: &targets,
            now,
        });
        assert_eq!(clocks[0].elapsed, Duration::minutes(20));
        assert_eq!(clocks[0].breach_at, Some(t0() + Duration::minutes(30)));
    }

    #[test]
    fn breached_first_response_forces_immediate_next_response() {
        let t = ticket(Priority::Urgent);
        let r = route(Tier::L0, None);
        // L0 urgent first response is 30m; at 40m it is breached.
        let now = t0() + Duration::minutes(40);
        let targets = targets_for(&r, t.priority, now);
        let comments = vec![comment(9001, true, t0() + Duration::minutes(2))];

        let clocks = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &comments,
            escalated_at: None,
            route: &r,
            targets: &targets,
            now,
        });
        let next = &clocks[1];
        assert!(next.immediate);
        assert_eq!(next.status(&StatusProfile::live_bar()), ClockStatus::Immediate);
    }

    #[test]
    fn answered_ticket_reports_next_response_met() {
        let t = ticket(Priority::Urgent);
        let r = route(Tier::L0, None);
        let now = t0() + Duration::minutes(40);
        let targets = targets_for(&r, t.priority, now);
        // Customer wrote, agent answered: nothing pending even though the
        // first response window is long gone.
        let comments = vec![
            comment(9001, true, t0() + Duration::minutes(2)),
            comment(42, true, t0() + Duration::minutes(35)),
        ];

        let clocks = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &comments,
            escalated_at: None,
            route: &r,
            targets: &targets,
            now,
        });
        assert!(clocks[1].met);
        assert!(!clocks[1].immediate);
    }

    #[test]
    fn handoff_clock_needs_an_audit_timestamp() {
        let t = ticket(Priority::High);
        let r = Route { tier: Tier::L2, partner: None, group_name: Some("L2 Support".into()) };
        let now = t0() + Duration::hours(2);
        let targets = targets_for(&r, t.priority, now);

        let without = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &[],
            escalated_at: None,
            route: &r,
            targets: &targets,
            now,
        });
        assert!(without.iter().all(|c| !matches!(c.label, ClockLabel::Handoff(_))));

        let escalated = t0() + Duration::minutes(30);
        let comments = vec![comment(42, true, t0() + Duration::minutes(50))];
        let with = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &comments,
            escalated_at: Some(escalated),
            route: &r,
            targets: &targets,
            now,
        });
        let handoff = with
            .iter()
            .find(|c| matches!(c.label, ClockLabel::Handoff(Tier::L2)))
            .unwrap();
        assert!(handoff.met);
        assert_eq!(handoff.elapsed, Duration::minutes(20));
    }

    #[test]
    fn partner_without_commitments_gets_one_placeholder() {
        let t = ticket(Priority::Normal);
        let r = Route {
            tier: Tier::L0,
            partner: Some(Partner::Att),
            group_name: Some("Frontline".into()),
        };
        let now = t0() + Duration::hours(1);
        let targets = targets_for(&r, t.priority, now);

        let clocks = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &[],
            escalated_at: None,
            route: &r,
            targets: &targets,
            now,
        });
        let placeholders: Vec<_> = clocks.iter().filter(|c| c.placeholder).collect();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].label, ClockLabel::PartnerPlaceholder(Partner::Att));
    }

    #[test]
    fn clock_labels_are_unique_per_tick() {
        let t = ticket(Priority::Low);
        let r = Route {
            tier: Tier::L2,
            partner: Some(Partner::ConnectX),
            group_name: Some("L2 Support".into()),
        };
        let now = t0() + Duration::hours(3);
        let targets = targets_for(&r, t.priority, now);
        let clocks = build_clocks(&EvaluationInput {
            ticket: &t,
            metrics: None,
            comments: &[],
            escalated_at: Some(t0() + Duration::minutes(10)),
            route: &r,
            targets: &targets,
            now,
        });
        let mut labels: Vec<String> = clocks.iter().map(|c| c.label.to_string()).collect();
        let before = labels.len();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), before);
    }
}
