//! The daily due-schedule sweep.
//!
//! Two-phase filter: the repository serves every active schedule inside the
//! global 7-day horizon (cheap, index-friendly), then the precise
//! per-frequency lead-time gate decides which of those materialize today.
//! A failure on one schedule never aborts the pass; everything is collected
//! into the returned [`ScanSummary`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Actor;
use crate::logging::OpTimer;
use crate::scheduler::lead_time::{is_due_for_materialization, MAX_LEAD_DAYS};
use crate::scheduler::materializer::TaskMaterializer;
use crate::store::ScheduleRepository;

/// One schedule's failure inside a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    /// Schedule that failed; `None` when the coarse query itself failed.
    pub schedule_id: Option<Uuid>,
    /// Error message.
    pub message: String,
}

/// Aggregated result of one scan pass. Never thrown out of the pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// Candidates the coarse phase returned.
    pub scanned: usize,
    /// Schedules materialized and advanced.
    pub materialized: usize,
    /// Work orders created across all schedules.
    pub orders_created: usize,
    /// Candidates outside their precise lead window, plus concurrent-run
    /// conflicts.
    pub skipped: usize,
    /// Schedules that failed to materialize.
    pub failed: usize,
    /// Per-assignee resolution failures recorded along the way.
    pub resolution_failures: usize,
    /// Per-schedule errors.
    pub errors: Vec<ScanError>,
}

impl ScanSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            scanned: 0,
            materialized: 0,
            orders_created: 0,
            skipped: 0,
            failed: 0,
            resolution_failures: 0,
            errors: Vec::new(),
        }
    }
}

/// Periodic sweep selecting and materializing due schedules.
pub struct DueScheduleScanner {
    schedules: Arc<dyn ScheduleRepository>,
    materializer: Arc<TaskMaterializer>,
}

impl std::fmt::Debug for DueScheduleScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DueScheduleScanner").finish()
    }
}

impl DueScheduleScanner {
    /// Wire the scanner to its collaborators.
    #[must_use]
    pub fn new(schedules: Arc<dyn ScheduleRepository>, materializer: Arc<TaskMaterializer>) -> Self {
        Self {
            schedules,
            materializer,
        }
    }

    /// Run one scan pass at `now`.
    ///
    /// Schedules are processed sequentially; each one's
    /// materialize-and-advance is its own atomic unit, so a concurrent
    /// manual run can at worst turn a candidate into a skipped conflict.
    pub async fn run_pass(&self, now: DateTime<Utc>, actor: &Actor) -> ScanSummary {
        let timer = OpTimer::new("scanner", "scan_pass");
        let mut summary = ScanSummary::new(now);

        let horizon = now + Duration::days(MAX_LEAD_DAYS);
        let candidates = match self.schedules.due_within(horizon).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::error!(error = %err, "coarse schedule selection failed");
                summary.errors.push(ScanError {
                    schedule_id: None,
                    message: err.to_string(),
                });
                summary.failed += 1;
                timer.finish();
                return summary;
            }
        };

        for schedule in candidates {
            summary.scanned += 1;

            if !is_due_for_materialization(&schedule, now) {
                summary.skipped += 1;
                continue;
            }
            let Some(observed) = schedule.next_run else {
                summary.skipped += 1;
                continue;
            };

            match self
                .materializer
                .materialize(schedule.id, observed, now, actor)
                .await
            {
                Ok(report) => {
                    summary.materialized += 1;
                    summary.orders_created += report.orders_created;
                    summary.resolution_failures += report.failures.len();
                }
                Err(err) if err.is_conflict() => {
                    // Another run advanced the schedule between our read and
                    // the commit. Not an error.
                    tracing::debug!(schedule_id = %schedule.id, "conflict, skipping");
                    summary.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(
                        schedule_id = %schedule.id,
                        error = %err,
                        "schedule materialization failed"
                    );
                    summary.failed += 1;
                    summary.errors.push(ScanError {
                        schedule_id: Some(schedule.id),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            materialized = summary.materialized,
            orders_created = summary.orders_created,
            skipped = summary.skipped,
            failed = summary.failed,
            "scan pass finished"
        );
        timer.finish();
        summary
    }
}
