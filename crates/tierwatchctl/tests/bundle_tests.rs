//! Bundle loading and end-to-end evaluation through the file source.

use std::io::Write;

use chrono::{Duration, TimeZone, Utc};
use tempfile::NamedTempFile;

use tierwatch::clock::ClockStatus;
use tierwatch::config::EngineConfig;
use tierwatch::session::TicketSession;
use tierwatchctl::bundle::{Bundle, BundleSource};

const BUNDLE: &str = r#"{
  "ticket": {
    "id": 4711,
    "priority": "urgent",
    "status": "open",
    "created_at": "2024-05-06T12:00:00Z",
    "requester_id": 9001,
    "group_id": 10
  },
  "comments": [
    { "author_id": 9001, "public": true, "created_at": "2024-05-06T12:01:00Z", "body": "It is broken" },
    { "author_id": 42, "public": true, "created_at": "2024-05-06T12:12:00Z", "body": "Looking into it" }
  ],
  "audits": [
    {
      "created_at": "2024-05-06T12:30:00Z",
      "events": [
        { "field_name": "group_id", "previous_value": "11", "value": "10" }
      ]
    }
  ],
  "groups": {
    "10": "L1 Support",
    "11": "Frontline"
  },
  "resolved": [
    { "created_at": "2024-05-06T00:00:00Z", "updated_at": "2024-05-06T01:00:00Z" },
    { "created_at": "2024-05-06T00:00:00Z", "updated_at": "2024-05-06T03:00:00Z" }
  ]
}"#;

fn write_bundle() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(BUNDLE.as_bytes()).unwrap();
    file
}

#[test]
fn bundle_loads_with_defaults_for_missing_sections() {
    let file = write_bundle();
    let bundle = Bundle::load(file.path()).unwrap();
    assert_eq!(bundle.ticket.id, 4711);
    assert!(bundle.metrics.is_none());
    assert_eq!(bundle.comments.len(), 2);
    assert_eq!(bundle.groups.len(), 2);
}

#[tokio::test]
async fn captured_ticket_evaluates_end_to_end() {
    let file = write_bundle();
    let bundle = Bundle::load(file.path()).unwrap();
    let session = TicketSession::new(
        BundleSource::new(bundle.clone()),
        EngineConfig::default(),
        bundle.ticket.id,
    );

    let now = Utc.with_ymd_and_hms(2024, 5, 6, 13, 0, 0).unwrap();
    let evaluation = session.evaluate(now).await.unwrap();
    let view = evaluation.view();

    assert_eq!(view.tier, "L1");
    assert_eq!(view.path, "Escalated \u{2192} L1");
    assert_eq!(view.group_name, "L1 Support");

    // Agent answered at 12 minutes, inside the 60 minute L1 window.
    let first = &view.clocks[0];
    assert_eq!(first.label, "1st Response");
    assert_eq!(first.status, ClockStatus::Met);
    assert_eq!(first.human_time_text, "Responded (12m 0s)");

    // Hand-off clock runs from the 12:30 escalation with no reply since.
    let handoff = view.clocks.iter().find(|c| c.label == "L1 Handoff").unwrap();
    assert!(!handoff.is_placeholder);

    let timeline = session.timeline().await.unwrap();
    assert_eq!(timeline.stints().len(), 2);
    assert_eq!(timeline.stints()[0].group_name, "Frontline");
    assert_eq!(timeline.total_duration(now), Duration::minutes(60));
}
