//! Responsibility tiers and tier detection.
//!
//! A ticket is owned by exactly one tier at any instant: an internal tier
//! (L0 front line, or an escalated L1/L2/L3 group) or an external partner.
//! Detection maps the assigned group name through an ordered rule list:
//! operator-supplied keywords first, built-in patterns as fallback, partner
//! rules before escalated rules before the default tier. First match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::TierKeywords;

/// External partner a ticket can be escalated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partner {
    ConnectX,
    Att,
    Airvet,
}

impl Partner {
    /// Human-facing partner name, used in clock labels and path badges.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ConnectX => "ConnectX",
            Self::Att => "AT&T",
            Self::Airvet => "Airvet",
        }
    }

    /// Map a partner-selector field option value to a partner.
    ///
    /// Option values come from the ticket source's dropdown config, e.g.
    /// `at_t`, `connectx`, `airvet`.
    pub fn from_field_value(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "connectx" => Some(Self::ConnectX),
            "at_t" | "att" | "at&t" => Some(Self::Att),
            "airvet" => Some(Self::Airvet),
            _ => None,
        }
    }
}

impl std::fmt::Display for Partner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Responsibility tier currently owning a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    L0,
    L1,
    L2,
    L3,
    Partner(Partner),
}

impl Tier {
    /// Internal tier above L0.
    pub fn is_escalated(self) -> bool {
        matches!(self, Self::L1 | Self::L2 | Self::L3)
    }

    pub fn is_partner(self) -> bool {
        matches!(self, Self::Partner(_))
    }

    pub fn partner(self) -> Option<Partner> {
        match self {
            Self::Partner(p) => Some(p),
            _ => None,
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::L0 => "L0".to_string(),
            Self::L1 => "L1".to_string(),
            Self::L2 => "L2".to_string(),
            Self::L3 => "L3".to_string(),
            Self::Partner(p) => p.display_name().to_string(),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse bucket a detection rule resolves to. Escalated refines to a
/// specific sub-tier in a second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleTarget {
    Partner(Partner),
    Escalated,
    L0,
}

/// Built-in fallback patterns, in pinned priority order: partners first,
/// then escalated, then the default tier.
static BUILTIN_RULES: Lazy<Vec<(Regex, RuleTarget)>> = Lazy::new(|| {
    vec![
        (
            Regex::new("(?i)connectx").unwrap(),
            RuleTarget::Partner(Partner::ConnectX),
        ),
        (
            Regex::new("(?i)at.?t").unwrap(),
            RuleTarget::Partner(Partner::Att),
        ),
        (
            Regex::new("(?i)airvet|vet|pet.?care").unwrap(),
            RuleTarget::Partner(Partner::Airvet),
        ),
        (
            Regex::new("(?i)l1|l2|l3|specialist|engineering|tier.?[123]").unwrap(),
            RuleTarget::Escalated,
        ),
        (Regex::new("(?i)l0|frontline|tier.?0").unwrap(), RuleTarget::L0),
    ]
});

/// Keyword table refining an escalated group to its specific sub-tier.
/// Checked in order; first substring match wins; no match defaults to L1.
/// "engineering" is deliberately last so "L2 Engineering" stays L2.
const SUB_TIER_KEYWORDS: &[(&str, Tier)] = &[
    ("l1", Tier::L1),
    ("tier 1", Tier::L1),
    ("tier1", Tier::L1),
    ("level 1", Tier::L1),
    ("l2", Tier::L2),
    ("tier 2", Tier::L2),
    ("tier2", Tier::L2),
    ("level 2", Tier::L2),
    ("l3", Tier::L3),
    ("tier 3", Tier::L3),
    ("tier3", Tier::L3),
    ("level 3", Tier::L3),
    ("engineering", Tier::L3),
];

/// Ordered tier-detection rule set.
///
/// Pure and side-effect free: identical inputs always classify identically,
/// so rule coverage is unit-testable without any data source.
#[derive(Debug, Clone, Default)]
pub struct TierRules {
    /// Operator keyword lists in priority order, each a lowercase keyword
    /// set for one target.
    operator: Vec<(Vec<String>, RuleTarget)>,
}

impl TierRules {
    /// Build the rule set from operator keyword configuration.
    pub fn from_keywords(keywords: &TierKeywords) -> Self {
        let parse = |raw: &str| -> Vec<String> {
            raw.split(',')
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            operator: vec![
                (parse(&keywords.connectx_groups), RuleTarget::Partner(Partner::ConnectX)),
                (parse(&keywords.att_groups), RuleTarget::Partner(Partner::Att)),
                (parse(&keywords.airvet_groups), RuleTarget::Partner(Partner::Airvet)),
                (parse(&keywords.escalated_groups), RuleTarget::Escalated),
                (parse(&keywords.l0_groups), RuleTarget::L0),
            ],
        }
    }

    /// Classify a raw group name into a tier.
    ///
    /// A missing or empty group name means "not yet assigned" and
    /// classifies as the lowest internal tier.
    pub fn classify(&self, group_name: Option<&str>) -> Tier {
        let name = match group_name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Tier::L0,
        };
        let lower = name.to_lowercase();

        for (keywords, target) in &self.operator {
            if keywords.iter().any(|k| lower.contains(k.as_str())) {
                return self.resolve(*target, &lower);
            }
        }
        for (pattern, target) in BUILTIN_RULES.iter() {
            if pattern.is_match(name) {
                return self.resolve(*target, &lower);
            }
        }
        Tier::L0
    }

    fn resolve(&self, target: RuleTarget, lower_name: &str) -> Tier {
        match target {
            RuleTarget::Partner(p) => Tier::Partner(p),
            RuleTarget::L0 => Tier::L0,
            RuleTarget::Escalated => SUB_TIER_KEYWORDS
                .iter()
                .find(|(kw, _)| lower_name.contains(kw))
                .map(|(_, tier)| *tier)
                .unwrap_or(Tier::L1),
        }
    }
}

/// Where a ticket currently sits: group-derived tier plus any active
/// partner escalation. Partner detection, when present, takes precedence
/// for target resolution and path labeling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Tier classified from the assigned group name.
    pub tier: Tier,
    /// Partner from the partner-selector custom field, if set.
    pub partner: Option<Partner>,
    /// Raw group name, None when unassigned.
    pub group_name: Option<String>,
}

impl Route {
    /// The single current tier for this ticket.
    pub fn current_tier(&self) -> Tier {
        match self.partner {
            Some(p) => Tier::Partner(p),
            None => self.tier,
        }
    }

    pub fn display_group_name(&self) -> &str {
        self.group_name.as_deref().unwrap_or("Unassigned")
    }
}
