//! Scheduling error taxonomy.
//!
//! Errors are split by how callers are expected to react: validation and
//! not-found errors surface synchronously, resource-resolution errors are
//! recorded per assignee and never abort a batch, concurrency conflicts are
//! silently skipped, and persistence failures abort only the schedule that
//! hit them.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the scheduling core.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// Invalid frequency/anchor combination or malformed input.
    ///
    /// Returned synchronously from create/update paths.
    #[error("invalid schedule: {0}")]
    Validation(String),

    /// A schedule or linked resource is missing.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind ("schedule", "work order", ...).
        kind: &'static str,
        /// Entity id.
        id: Uuid,
    },

    /// No allocatable resource matched a given assignee.
    ///
    /// Non-fatal: recorded per assignee, the rest of the batch proceeds.
    #[error("no matching resource for assignee {assignee}: {reason}")]
    ResourceResolution {
        /// Assignee the resolution was attempted for.
        assignee: Uuid,
        /// Why resolution failed.
        reason: String,
    },

    /// The schedule was advanced by a concurrent run between the due-check
    /// and the commit. Skipped silently, never surfaced to callers.
    #[error("schedule {schedule_id} already advanced by a concurrent run")]
    ConcurrencyConflict {
        /// Schedule that lost the race.
        schedule_id: Uuid,
    },

    /// Storage-layer failure. Aborts the current schedule's materialization
    /// only, never the whole pass.
    #[error("persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl SchedulingError {
    /// Shorthand for a validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a missing entity.
    #[must_use]
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    /// True for conflicts that a scan pass should swallow.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Result alias used throughout the scheduling core.
pub type SchedulingResult<T> = Result<T, SchedulingError>;
