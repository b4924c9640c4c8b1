//! Presentation contract: what any host surface renders.
//!
//! Clock view-objects carry a label, status, a 0-100 bar percentage, and
//! ready-made human time text. No HTML, styling, or layout lives here.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, ClockLabel, ClockStatus, CoarseStatus, StatusProfile};
use crate::tier::{Partner, Route, Tier};

/// One clock, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockView {
    pub label: String,
    pub status: ClockStatus,
    pub coarse: CoarseStatus,
    /// Bar fill in [0, 100].
    pub percentage: f64,
    pub human_time_text: String,
    pub is_placeholder: bool,
}

impl ClockView {
    pub fn from_clock(clock: &Clock, profile: &StatusProfile) -> Self {
        let status = clock.status(profile);
        Self {
            label: clock.label.to_string(),
            status,
            coarse: CoarseStatus::from(status),
            percentage: clock.percentage(),
            human_time_text: time_text(clock),
            is_placeholder: clock.placeholder,
        }
    }
}

/// A full evaluation, ready to render: header badges plus the ordered
/// clock list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationView {
    pub ticket_id: u64,
    pub path: String,
    pub tier: String,
    pub partner: Option<String>,
    pub group_name: String,
    pub priority: crate::ticket::Priority,
    pub solved: bool,
    pub overall: CoarseStatus,
    pub clocks: Vec<ClockView>,
}

/// Which path a ticket is on, for the header badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePath {
    Solved,
    Partner(Partner),
    Escalated(Tier),
    Direct,
}

impl RoutePath {
    pub fn for_route(route: &Route, solved: bool) -> Self {
        if solved {
            return Self::Solved;
        }
        if let Some(partner) = route.partner {
            return Self::Partner(partner);
        }
        if route.tier.is_escalated() {
            return Self::Escalated(route.tier);
        }
        Self::Direct
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solved => write!(f, "Solved"),
            Self::Partner(p) => write!(f, "Partner \u{2192} {}", p),
            Self::Escalated(tier) => write!(f, "Escalated \u{2192} {}", tier),
            Self::Direct => write!(f, "L0 Direct"),
        }
    }
}

/// Human time text for a clock, matching what agents are used to reading.
pub fn time_text(clock: &Clock) -> String {
    if clock.placeholder || (clock.target.is_none() && !clock.met) {
        return "Not configured".to_string();
    }
    if clock.immediate {
        return "IMMEDIATE \u{2014} respond now".to_string();
    }
    if clock.met {
        let verb = if clock.label == ClockLabel::FirstResponse {
            if clock.late {
                "Late"
            } else {
                "Responded"
            }
        } else {
            "Met"
        };
        return if clock.elapsed > Duration::zero() {
            format!("{} ({})", verb, format_duration(clock.elapsed))
        } else {
            verb.to_string()
        };
    }
    let target = clock.target.unwrap_or_else(Duration::zero);
    if clock.elapsed >= target {
        return format!("BREACHED {} ago", format_duration(clock.elapsed - target));
    }
    format!("{} left", format_duration(target - clock.elapsed))
}

/// `2d 3h 4m` / `3h 4m 5s` / `4m 5s`, sign ignored.
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.num_seconds().abs();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

/// Compact form for tight labels: `2d 3h` / `3h` / `4m`.
pub fn format_duration_short(d: Duration) -> String {
    let total_mins = d.num_minutes().abs();
    if total_mins >= 1_440 {
        format!("{}d {}h", total_mins / 1_440, (total_mins % 1_440) / 60)
    } else if total_mins >= 60 {
        format!("{}h", total_mins / 60)
    } else {
        format!("{}m", total_mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn duration_formats() {
        assert_eq!(format_duration(Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(Duration::seconds(3 * 3600 + 125)), "3h 2m 5s");
        assert_eq!(
            format_duration(Duration::seconds(2 * 86400 + 3 * 3600 + 240)),
            "2d 3h 4m"
        );
        assert_eq!(format_duration(Duration::seconds(-125)), "2m 5s");

        assert_eq!(format_duration_short(Duration::minutes(59)), "59m");
        assert_eq!(format_duration_short(Duration::minutes(150)), "2h");
        assert_eq!(format_duration_short(Duration::minutes(1500)), "1d 1h");
    }

    #[test]
    fn time_text_variants() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap();

        let running = Clock::running(
            ClockLabel::Resolution,
            Duration::minutes(60),
            Duration::minutes(5),
            now + Duration::minutes(55),
        );
        assert_eq!(time_text(&running), "55m 0s left");

        let breached = Clock::running(
            ClockLabel::Resolution,
            Duration::minutes(60),
            Duration::minutes(64),
            now,
        );
        assert_eq!(time_text(&breached), "BREACHED 4m 0s ago");

        let responded = Clock::satisfied(
            ClockLabel::FirstResponse,
            Some(Duration::minutes(30)),
            Duration::minutes(10),
        );
        assert_eq!(time_text(&responded), "Responded (10m 0s)");

        let late = Clock::satisfied(
            ClockLabel::FirstResponse,
            Some(Duration::minutes(30)),
            Duration::minutes(45),
        );
        assert_eq!(time_text(&late), "Late (45m 0s)");

        let met = Clock::satisfied(ClockLabel::NextResponse, Some(Duration::minutes(720)), Duration::zero());
        assert_eq!(time_text(&met), "Met");

        let immediate = Clock::immediate(ClockLabel::NextResponse, now);
        assert_eq!(time_text(&immediate), "IMMEDIATE \u{2014} respond now");

        let placeholder = Clock::placeholder(ClockLabel::PartnerPlaceholder(Partner::Att));
        assert_eq!(time_text(&placeholder), "Not configured");
    }

    #[test]
    fn route_path_labels() {
        let route = |tier, partner, group: &str| Route {
            tier,
            partner,
            group_name: Some(group.to_string()),
        };
        assert_eq!(
            RoutePath::for_route(&route(Tier::L0, None, "Frontline"), false).to_string(),
            "L0 Direct"
        );
        assert_eq!(
            RoutePath::for_route(&route(Tier::L2, None, "L2 Support"), false).to_string(),
            "Escalated \u{2192} L2"
        );
        assert_eq!(
            RoutePath::for_route(&route(Tier::L0, Some(Partner::ConnectX), "Frontline"), false)
                .to_string(),
            "Partner \u{2192} ConnectX"
        );
        assert_eq!(
            RoutePath::for_route(&route(Tier::L2, Some(Partner::Att), "L2"), true).to_string(),
            "Solved"
        );
    }
}
