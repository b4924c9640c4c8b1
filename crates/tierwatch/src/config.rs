//! Engine configuration.
//!
//! Loads settings from /etc/tierwatch/config.toml or uses defaults.
//! Operator keyword lists refine tier detection per deployment; the
//! built-in rule patterns remain as fallback. An optional policy section
//! replaces the built-in SLA table wholesale.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::policy::SlaPolicy;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/tierwatch/config.toml";

/// Operator-supplied keyword lists, one comma-separated list per tier,
/// checked before the built-in patterns. Keys match the legacy app
/// settings so existing deployments carry over unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierKeywords {
    #[serde(default)]
    pub connectx_groups: String,
    #[serde(default)]
    pub att_groups: String,
    #[serde(default)]
    pub airvet_groups: String,
    #[serde(default, alias = "l1l3_groups")]
    pub escalated_groups: String,
    #[serde(default)]
    pub l0_groups: String,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Keyword lists for tier detection.
    #[serde(default)]
    pub keywords: TierKeywords,

    /// Custom field id carrying the partner-escalation selector. When
    /// unset, every custom field is scanned for a recognizable partner
    /// value.
    #[serde(default)]
    pub partner_field_id: Option<u64>,

    /// Full replacement for the built-in SLA target table.
    #[serde(default)]
    pub policy: Option<SlaPolicy>,
}

impl EngineConfig {
    /// Load configuration from a file, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    info!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("config {} is malformed, using defaults: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// The effective SLA policy: the operator override, or the built-in
    /// table.
    pub fn effective_policy(&self) -> SlaPolicy {
        self.policy.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = EngineConfig::load(Path::new("/nonexistent/tierwatch.toml"));
        assert!(config.partner_field_id.is_none());
        assert!(config.policy.is_none());
        assert_eq!(config.keywords, TierKeywords::default());
    }

    #[test]
    fn keywords_and_field_id_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
partner_field_id = 46476040962203

[keywords]
connectx_groups = "connectx, cx escalations"
l1l3_groups = "network engineering"
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path());
        assert_eq!(config.partner_field_id, Some(46476040962203));
        assert_eq!(config.keywords.connectx_groups, "connectx, cx escalations");
        // Legacy key name maps onto the escalated list.
        assert_eq!(config.keywords.escalated_groups, "network engineering");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "partner_field_id = \"not a number\"").unwrap();
        let config = EngineConfig::load(file.path());
        assert!(config.partner_field_id.is_none());
    }
}
