//! Error types for the tierwatch engine.

use thiserror::Error;

/// Failure reported by the ticket data source collaborator.
///
/// These are recoverable at the engine level: individual clocks degrade
/// (creation-time estimates, empty timelines, unavailable MTTR) instead of
/// aborting the whole evaluation. Only the subject ticket record itself is
/// load-bearing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Fatal, evaluation-level failure.
///
/// Everything below this severity is recovered locally; the orchestrator
/// maps an `EngineError` to a single engine-level error state for the
/// presentation layer, distinct from any per-clock `not-configured` state.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ticket {id} could not be loaded: {source}")]
    TicketUnavailable {
        id: u64,
        #[source]
        source: SourceError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
