//! SLA clocks and the percentage-to-status state machine.
//!
//! One mapping mechanism serves both threshold profiles that used to drift
//! across surfaces: the canonical 5-state live-bar profile (green, amber,
//! red, breached, plus met) and the coarse 3-state view (healthy, nearing,
//! breached) defined as nearing = amber + red.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::tier::{Partner, Tier};

/// Fine-grained clock status, in increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    /// Terminal: the clock was satisfied.
    Met,
    Green,
    Amber,
    Red,
    Breached,
    /// Escalation state: an overdue first reply makes any further delay
    /// immediately critical. Re-derived every tick.
    Immediate,
    /// No SLA defined for this combination. Not comparable to the others.
    NotConfigured,
}

impl std::fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Met => write!(f, "met"),
            Self::Green => write!(f, "green"),
            Self::Amber => write!(f, "amber"),
            Self::Red => write!(f, "red"),
            Self::Breached => write!(f, "breached"),
            Self::Immediate => write!(f, "immediate"),
            Self::NotConfigured => write!(f, "not-configured"),
        }
    }
}

/// Coarse 3-state view of a clock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoarseStatus {
    Met,
    Healthy,
    Nearing,
    Breached,
    NotConfigured,
}

impl From<ClockStatus> for CoarseStatus {
    fn from(status: ClockStatus) -> Self {
        match status {
            ClockStatus::Met => Self::Met,
            ClockStatus::Green => Self::Healthy,
            ClockStatus::Amber | ClockStatus::Red => Self::Nearing,
            ClockStatus::Breached | ClockStatus::Immediate => Self::Breached,
            ClockStatus::NotConfigured => Self::NotConfigured,
        }
    }
}

impl CoarseStatus {
    fn severity(self) -> u8 {
        match self {
            Self::Breached => 3,
            Self::Nearing => 2,
            Self::Healthy => 1,
            Self::Met | Self::NotConfigured => 0,
        }
    }

    /// The worst of two statuses, for an overall badge.
    pub fn worst(self, other: Self) -> Self {
        if self.severity() >= other.severity() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for CoarseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Met => write!(f, "met"),
            Self::Healthy => write!(f, "healthy"),
            Self::Nearing => write!(f, "nearing"),
            Self::Breached => write!(f, "breached"),
            Self::NotConfigured => write!(f, "not-configured"),
        }
    }
}

/// Percentage of target consumed, clamped to [0, 100].
///
/// A non-positive target reads as fully consumed; callers with a null
/// target must branch to not-configured before ever calling this.
pub fn percentage(elapsed: Duration, target: Duration) -> f64 {
    let target_ms = target.num_milliseconds();
    if target_ms <= 0 {
        return 100.0;
    }
    let pct = elapsed.num_milliseconds() as f64 / target_ms as f64 * 100.0;
    pct.clamp(0.0, 100.0)
}

/// Ordered (upper-bound-percent, status) steps. A percentage maps to the
/// first step whose bound it does not exceed; elapsed at or past target is
/// always breached regardless of the steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusProfile {
    steps: Vec<(f64, ClockStatus)>,
}

impl StatusProfile {
    /// Canonical live-bar profile: green to 60%, amber to 85%, red below
    /// breach.
    pub fn live_bar() -> Self {
        Self {
            steps: vec![
                (60.0, ClockStatus::Green),
                (85.0, ClockStatus::Amber),
                (100.0, ClockStatus::Red),
            ],
        }
    }

    /// Map an elapsed/target pair to a status. Monotonic non-decreasing in
    /// the percentage.
    pub fn status_for(&self, elapsed: Duration, target: Duration) -> ClockStatus {
        if elapsed >= target {
            return ClockStatus::Breached;
        }
        let pct = percentage(elapsed, target);
        for (bound, status) in &self.steps {
            if pct <= *bound {
                return *status;
            }
        }
        ClockStatus::Breached
    }
}

impl Default for StatusProfile {
    fn default() -> Self {
        Self::live_bar()
    }
}

/// Identity of a clock within one evaluation. Labels are unique per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockLabel {
    FirstResponse,
    NextResponse,
    Resolution,
    /// Time from escalation into this tier to its first public reply.
    Handoff(Tier),
    PartnerResponse(Partner),
    PartnerResolve(Partner),
    /// Stand-in when a partner has no numeric targets at all.
    PartnerPlaceholder(Partner),
}

impl std::fmt::Display for ClockLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstResponse => write!(f, "1st Response"),
            Self::NextResponse => write!(f, "Next Response"),
            Self::Resolution => write!(f, "Resolution"),
            Self::Handoff(tier) => write!(f, "{} Handoff", tier),
            Self::PartnerResponse(p) => write!(f, "{} Response", p),
            Self::PartnerResolve(p) => write!(f, "{} Resolve", p),
            Self::PartnerPlaceholder(p) => write!(f, "{} SLA", p),
        }
    }
}

/// One live SLA clock. Recomputed, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    pub label: ClockLabel,
    /// None means no SLA defined for this combination.
    pub target: Option<Duration>,
    pub elapsed: Duration,
    /// Instant the clock breaches, when known and still running.
    pub breach_at: Option<DateTime<Utc>>,
    pub met: bool,
    /// Met, but after the target had already passed.
    pub late: bool,
    pub immediate: bool,
    pub placeholder: bool,
}

impl Clock {
    /// A running clock with a known breach instant.
    pub fn running(
        label: ClockLabel,
        target: Duration,
        elapsed: Duration,
        breach_at: DateTime<Utc>,
    ) -> Self {
        Self {
            label,
            target: Some(target),
            elapsed,
            breach_at: Some(breach_at),
            met: false,
            late: false,
            immediate: false,
            placeholder: false,
        }
    }

    /// A satisfied clock. `late` records whether the target had already
    /// passed when it was satisfied; the status stays met either way.
    pub fn satisfied(label: ClockLabel, target: Option<Duration>, elapsed: Duration) -> Self {
        let late = target.is_some_and(|t| elapsed > t);
        Self {
            label,
            target,
            elapsed,
            breach_at: None,
            met: true,
            late,
            immediate: false,
            placeholder: false,
        }
    }

    /// A running clock with no known breach instant. It holds its elapsed
    /// value across re-ticks until the next full refresh.
    pub fn observed(label: ClockLabel, target: Duration, elapsed: Duration) -> Self {
        Self {
            label,
            target: Some(target),
            elapsed,
            breach_at: None,
            met: false,
            late: false,
            immediate: false,
            placeholder: false,
        }
    }

    /// The respond-now escalation clock: effectively a zero target.
    pub fn immediate(label: ClockLabel, now: DateTime<Utc>) -> Self {
        Self {
            label,
            target: Some(Duration::zero()),
            elapsed: Duration::milliseconds(1),
            breach_at: Some(now),
            met: false,
            late: false,
            immediate: true,
            placeholder: false,
        }
    }

    /// A not-configured stand-in for a combination with no SLA defined.
    pub fn placeholder(label: ClockLabel) -> Self {
        Self {
            label,
            target: None,
            elapsed: Duration::zero(),
            breach_at: None,
            met: false,
            late: false,
            immediate: false,
            placeholder: true,
        }
    }

    pub fn status(&self, profile: &StatusProfile) -> ClockStatus {
        if self.placeholder {
            return ClockStatus::NotConfigured;
        }
        if self.immediate {
            return ClockStatus::Immediate;
        }
        if self.met {
            return ClockStatus::Met;
        }
        match self.target {
            Some(target) => profile.status_for(self.elapsed, target),
            None => ClockStatus::NotConfigured,
        }
    }

    /// Display percentage in [0, 100]. Met and immediate clocks fill the
    /// bar; placeholders stay empty.
    pub fn percentage(&self) -> f64 {
        if self.placeholder {
            return 0.0;
        }
        if self.met || self.immediate {
            return 100.0;
        }
        match self.target {
            Some(target) => percentage(self.elapsed, target),
            None => 0.0,
        }
    }

    /// Whether the clock has consumed its whole target.
    ///
    /// The 99.5% guard mirrors breach detection on the upstream instant:
    /// a clock one repaint away from its breach instant counts as crossed.
    pub fn is_breached(&self) -> bool {
        if self.met || self.placeholder {
            return false;
        }
        if self.immediate {
            return true;
        }
        match self.target {
            Some(target) => {
                self.elapsed >= target
                    || (target > Duration::zero()
                        && self.elapsed.num_milliseconds() as f64
                            / target.num_milliseconds() as f64
                            >= 0.995)
            }
            None => false,
        }
    }

    /// Recompute elapsed from the breach instant alone.
    ///
    /// `elapsed = target - max(breach_at - now, 0)`, and once past breach
    /// `elapsed = now - (breach_at - target)`, so a periodic re-tick needs
    /// no re-fetch. Idempotent for equal `(breach_at, target, now)`; met,
    /// immediate, and placeholder clocks never move.
    pub fn retick(&mut self, now: DateTime<Utc>) {
        if self.met || self.immediate || self.placeholder {
            return;
        }
        let (Some(target), Some(breach_at)) = (self.target, self.breach_at) else {
            return;
        };
        let remaining = (breach_at - now).max(Duration::zero());
        let mut elapsed = target - remaining;
        if elapsed > target {
            elapsed = now - (breach_at - target);
        }
        self.elapsed = elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn percentage_clamps_and_handles_zero_target() {
        assert_eq!(percentage(Duration::minutes(30), Duration::minutes(60)), 50.0);
        assert_eq!(percentage(Duration::minutes(90), Duration::minutes(60)), 100.0);
        assert_eq!(percentage(Duration::minutes(5), Duration::zero()), 100.0);
        assert_eq!(percentage(Duration::minutes(-5), Duration::minutes(60)), 0.0);
    }

    #[test]
    fn live_bar_profile_is_monotonic() {
        let profile = StatusProfile::live_bar();
        let target = Duration::minutes(100);
        let statuses: Vec<ClockStatus> = (0..=100)
            .map(|m| profile.status_for(Duration::minutes(m), target))
            .collect();
        let rank = |s: &ClockStatus| match s {
            ClockStatus::Green => 0,
            ClockStatus::Amber => 1,
            ClockStatus::Red => 2,
            ClockStatus::Breached => 3,
            _ => unreachable!(),
        };
        for pair in statuses.windows(2) {
            assert!(rank(&pair[0]) <= rank(&pair[1]));
        }
        assert_eq!(statuses[0], ClockStatus::Green);
        assert_eq!(statuses[60], ClockStatus::Green);
        assert_eq!(statuses[61], ClockStatus::Amber);
        assert_eq!(statuses[85], ClockStatus::Amber);
        assert_eq!(statuses[86], ClockStatus::Red);
        assert_eq!(statuses[100], ClockStatus::Breached);
    }

    #[test]
    fn coarse_view_folds_amber_and_red_into_nearing() {
        assert_eq!(CoarseStatus::from(ClockStatus::Amber), CoarseStatus::Nearing);
        assert_eq!(CoarseStatus::from(ClockStatus::Red), CoarseStatus::Nearing);
        assert_eq!(CoarseStatus::from(ClockStatus::Immediate), CoarseStatus::Breached);
        assert_eq!(
            CoarseStatus::Nearing.worst(CoarseStatus::Breached),
            CoarseStatus::Breached
        );
        assert_eq!(
            CoarseStatus::Healthy.worst(CoarseStatus::Met),
            CoarseStatus::Healthy
        );
    }

    #[test]
    fn retick_recomputes_from_breach_instant() {
        let target = Duration::minutes(60);
        let breach_at = t0() + target;
        let mut clock = Clock::running(ClockLabel::FirstResponse, target, Duration::zero(), breach_at);

        clock.retick(t0() + Duration::minutes(45));
        assert_eq!(clock.elapsed, Duration::minutes(45));

        // Past breach: elapsed keeps growing from the original start.
        clock.retick(t0() + Duration::minutes(75));
        assert_eq!(clock.elapsed, Duration::minutes(75));
    }

    #[test]
    fn retick_is_idempotent() {
        let target = Duration::minutes(60);
        let breach_at = t0() + target;
        let now = t0() + Duration::minutes(30);
        let mut a = Clock::running(ClockLabel::Resolution, target, Duration::zero(), breach_at);
        a.retick(now);
        let snapshot = a.clone();
        a.retick(now);
        assert_eq!(a, snapshot);
    }

    #[test]
    fn met_clocks_never_move() {
        let mut clock = Clock::satisfied(
            ClockLabel::FirstResponse,
            Some(Duration::minutes(30)),
            Duration::minutes(10),
        );
        clock.retick(t0() + Duration::hours(5));
        assert_eq!(clock.elapsed, Duration::minutes(10));
        assert!(!clock.late);

        let late = Clock::satisfied(
            ClockLabel::FirstResponse,
            Some(Duration::minutes(30)),
            Duration::minutes(45),
        );
        assert!(late.late);
        assert_eq!(late.status(&StatusProfile::live_bar()), ClockStatus::Met);
    }

    #[test]
    fn breach_guard_covers_the_final_sliver() {
        let clock = Clock::running(
            ClockLabel::FirstResponse,
            Duration::minutes(1000),
            Duration::minutes(996),
            t0(),
        );
        assert!(clock.is_breached());
        let healthy = Clock::running(
            ClockLabel::FirstResponse,
            Duration::minutes(1000),
            Duration::minutes(990),
            t0(),
        );
        assert!(!healthy.is_breached());
    }

    #[test]
    fn placeholder_is_not_configured_not_breached() {
        let clock = Clock::placeholder(ClockLabel::PartnerPlaceholder(Partner::Att));
        assert_eq!(clock.status(&StatusProfile::live_bar()), ClockStatus::NotConfigured);
        assert!(!clock.is_breached());
        assert_eq!(clock.percentage(), 0.0);
    }
}
