//! Plain-text rendering of engine views.

use chrono::{DateTime, Utc};

use tierwatch::clock::StatusProfile;
use tierwatch::mttr::MttrSummary;
use tierwatch::policy::SlaPolicy;
use tierwatch::ticket::Priority;
use tierwatch::timeline::Timeline;
use tierwatch::view::{format_duration, format_duration_short, EvaluationView};

const BAR_WIDTH: usize = 24;

fn bar(percentage: f64) -> String {
    let filled = ((percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn print_evaluation(view: &EvaluationView) {
    println!("Ticket #{}  {}", view.ticket_id, view.path);
    println!(
        "Assigned to: {}   Priority: {}   Overall: {}",
        view.group_name,
        view.priority,
        view.overall
    );
    println!();
    for clock in &view.clocks {
        println!(
            "  {:<20} {} {:<10} {}",
            clock.label,
            bar(clock.percentage),
            clock.status.to_string(),
            clock.human_time_text
        );
    }
}

pub fn print_timeline(
    timeline: &Timeline,
    policy: &SlaPolicy,
    priority: Priority,
    profile: &StatusProfile,
    now: DateTime<Utc>,
) {
    if timeline.is_empty() {
        println!("No previous escalations found.");
        return;
    }

    println!("Escalation history (latest first):");
    for stint in timeline.history() {
        let readout = Timeline::readout(stint, policy, priority, profile, now);
        println!(
            "  {:<12} {:<24} {} spent   resp {:<9} resol {}",
            stint.tier.label(),
            stint.group_name,
            format_duration(stint.duration(now)),
            readout.response.to_string(),
            readout.resolution
        );
    }

    println!();
    println!("Time at each tier:");
    for segment in timeline.segments(now) {
        println!(
            "  {:<12} {:>5.1}%  {}",
            segment.tier.label(),
            segment.share * 100.0,
            format_duration_short(segment.duration)
        );
    }
}

pub fn print_mttr(summary: Option<&MttrSummary>, now: DateTime<Utc>, created: DateTime<Utc>) {
    let Some(summary) = summary else {
        println!("MTTR unavailable: no resolved comparison tickets.");
        return;
    };
    let comparison = summary.compare(now - created);
    println!("MTTR ({})", summary.scope);
    println!("  Team avg:    {}", format_duration(summary.mean));
    println!("  Median:      {}", format_duration(summary.median));
    println!("  This ticket: {}", format_duration(comparison.elapsed));
    println!(
        "  {} average ({:.0}% of mean, {} resolved ticket{})",
        if comparison.above_average { "Above" } else { "Below" },
        comparison.display_percent,
        summary.sample_size,
        if summary.sample_size == 1 { "" } else { "s" }
    );
}
