//! Mean time to resolution over a comparison population.
//!
//! Resolution time per sample is `updated_at - created_at`: the last-update
//! instant stands in for the solve instant. That proxy is only exact when
//! nothing touches a ticket after it is solved; callers treating the figure
//! as authoritative should switch the source to a status-change audit
//! lookup instead. An empty filtered sample yields None and must render as
//! a no-data state, never as NaN.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One resolved comparison ticket, as fetched from the data source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolutionSample {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResolutionSample {
    /// Last-update proxy for time-to-resolution.
    pub fn resolution_time_proxy(&self) -> Duration {
        self.updated_at - self.created_at
    }
}

/// Aggregated resolution statistics for a comparison population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MttrSummary {
    pub mean: Duration,
    pub median: Duration,
    pub sample_size: usize,
    /// What the sample was scoped to: a team name, or "All Teams".
    pub scope: String,
}

/// Comparison of one in-flight resolution clock against the population.
#[derive(Debug, Clone, PartialEq)]
pub struct MttrComparison {
    pub above_average: bool,
    /// Display percentage of the mean, clamped to [0, 150] for visual
    /// headroom only; `elapsed` itself is never clamped.
    pub display_percent: f64,
    pub elapsed: Duration,
}

/// Ceiling for the comparison bar, per cent of the mean.
const DISPLAY_CEILING_PERCENT: f64 = 150.0;

/// Aggregate a resolved-ticket sample. Samples with non-positive
/// resolution time are discarded; an empty remainder is "unavailable".
pub fn compute_mttr(samples: &[ResolutionSample], scope: impl Into<String>) -> Option<MttrSummary> {
    let mut times: Vec<i64> = samples
        .iter()
        .map(|s| s.resolution_time_proxy().num_milliseconds())
        .filter(|ms| *ms > 0)
        .collect();
    if times.is_empty() {
        debug!("mttr sample empty after filtering, reporting unavailable");
        return None;
    }
    times.sort_unstable();

    let sum: i64 = times.iter().sum();
    let mean = sum / times.len() as i64;

    let mid = times.len() / 2;
    let median = if times.len() % 2 == 0 {
        (times[mid - 1] + times[mid]) / 2
    } else {
        times[mid]
    };

    Some(MttrSummary {
        mean: Duration::milliseconds(mean),
        median: Duration::milliseconds(median),
        sample_size: times.len(),
        scope: scope.into(),
    })
}

impl MttrSummary {
    /// Compare an in-flight elapsed resolution time against the mean.
    pub fn compare(&self, elapsed: Duration) -> MttrComparison {
        let mean_ms = self.mean.num_milliseconds();
        let percent = if mean_ms > 0 {
            elapsed.num_milliseconds() as f64 / mean_ms as f64 * 100.0
        } else {
            DISPLAY_CEILING_PERCENT
        };
        MttrComparison {
            above_average: elapsed > self.mean,
            display_percent: percent.clamp(0.0, DISPLAY_CEILING_PERCENT),
            elapsed,
        }
    }
}
